use async_trait::async_trait;
use futures::stream::BoxStream;
use http::HeaderMap;

use crate::request::GraphQLRequest;
use crate::response::ExecutionResult;

/// A lazily produced sequence of execution results, one per emitted
/// subscription event. Dropping the stream must release the underlying
/// producer.
pub type ResultStream = BoxStream<'static, ExecutionResult>;

/// The result of one engine execution together with any response headers
/// the engine wants propagated (tracing identifiers and the like).
pub struct EngineOutput {
    pub result: ExecutionResult,
    pub headers: HeaderMap,
}

impl EngineOutput {
    pub fn new(result: ExecutionResult) -> Self {
        Self {
            result,
            headers: HeaderMap::new(),
        }
    }
}

pub enum EngineResponse {
    /// A single result, for queries and mutations.
    Single(EngineOutput),
    /// A long-lived stream of results, for subscriptions.
    Stream(ResultStream),
}

/// An internal engine fault. The message is logged server-side and never
/// serialized to a client; expected GraphQL failures (validation errors,
/// resolver errors) belong in `ExecutionResult::errors` instead.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The executable schema: an opaque collaborator supplied fully built and
/// immutable for the process lifetime. Implementations must be safe to
/// call concurrently for independent requests.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// The application-supplied capability bag built per request (or per
    /// connection for subscriptions). Opaque to the core.
    type Context: Send + Sync + 'static;

    async fn execute(
        &self,
        request: &GraphQLRequest,
        context: &Self::Context,
    ) -> Result<EngineResponse, EngineError>;
}
