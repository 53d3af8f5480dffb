use async_trait::async_trait;

use crate::request::ConnectionInfo;

#[derive(Debug, thiserror::Error)]
#[error("failed to build execution context: {message}")]
pub struct ContextBuildError {
    pub message: String,
}

impl ContextBuildError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Builds the per-request (HTTP) or per-connection (WebSocket) execution
/// context from transport-level facts. Failures are mapped by the core to
/// a transport error; they never abort the host process.
#[async_trait]
pub trait ContextBuilder<Ctx>: Send + Sync {
    async fn build(&self, info: &ConnectionInfo) -> Result<Ctx, ContextBuildError>;
}

/// The unit builder for engines that take no context.
#[async_trait]
impl ContextBuilder<()> for () {
    async fn build(&self, _info: &ConnectionInfo) -> Result<(), ContextBuildError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("connection rejected: {reason}")]
pub struct AdmissionError {
    pub reason: String,
}

impl AdmissionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Inspects a WebSocket handshake (upgrade request plus the
/// `connection_init` payload) and may veto admission. A rejected
/// connection is closed immediately; no further messages are processed.
#[async_trait]
pub trait ConnectionGuard: Send + Sync {
    async fn admit(
        &self,
        info: &ConnectionInfo,
        payload: Option<&sonic_rs::Value>,
    ) -> Result<(), AdmissionError>;
}

/// The open guard: admits every connection.
#[async_trait]
impl ConnectionGuard for () {
    async fn admit(
        &self,
        _info: &ConnectionInfo,
        _payload: Option<&sonic_rs::Value>,
    ) -> Result<(), AdmissionError> {
        Ok(())
    }
}
