/// Message and close-code vocabulary for the GraphQL over WebSocket
/// Transport Protocol, as per the spec:
/// https://github.com/enisdenjo/graphql-ws/blob/master/PROTOCOL.md
///
/// Everything here is transport-neutral: messages serialize to JSON text
/// and close intents are plain (code, reason) pairs. The glue layer owns
/// the actual WebSocket frames.
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::response::{ExecutionResult, GraphQLError};

/// The WebSocket subprotocol the session protocol speaks. Glue layers
/// should reject upgrades that do not offer it.
pub const WS_SUBPROTOCOL: &str = "graphql-transport-ws";

/// A connection-close intent: close code plus human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

pub enum CloseCode {
    ConnectionInitTimeout,
    TooManyInitialisationRequests,
    Unauthorized,
    Forbidden(String),
    BadRequest(&'static str),
    SubscriberAlreadyExists(String),
    InternalServerError,
}

impl From<CloseCode> for CloseFrame {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::ConnectionInitTimeout => CloseFrame {
                code: 4408,
                reason: "Connection initialisation timeout".to_string(),
            },
            CloseCode::TooManyInitialisationRequests => CloseFrame {
                code: 4429,
                reason: "Too many initialisation requests".to_string(),
            },
            CloseCode::Unauthorized => CloseFrame {
                code: 4401,
                reason: "Unauthorized".to_string(),
            },
            CloseCode::Forbidden(reason) => CloseFrame { code: 4403, reason },
            CloseCode::BadRequest(reason) => CloseFrame {
                code: 4400,
                reason: reason.to_string(),
            },
            CloseCode::SubscriberAlreadyExists(id) => CloseFrame {
                code: 4409,
                reason: format!("Subscriber for {id} already exists"),
            },
            CloseCode::InternalServerError => CloseFrame {
                code: 4500,
                reason: "Internal Server Error".to_string(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        payload: Option<sonic_rs::Value>,
    },
    Ping {},
    Pong {},
    Subscribe {
        id: String,
        /// Parsed lazily with the normalizer's rules so that a missing or
        /// malformed query is reportable per operation.
        payload: sonic_rs::Value,
    },
    Complete {
        id: String,
    },
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck {},
    Ping {},
    Pong {},
    Next {
        id: String,
        payload: ExecutionResult,
    },
    Error {
        id: String,
        payload: Vec<GraphQLError>,
    },
    Complete {
        id: String,
    },
}

impl ServerMessage {
    pub fn next(id: &str, payload: ExecutionResult) -> Self {
        ServerMessage::Next {
            id: id.to_string(),
            payload,
        }
    }

    pub fn error(id: &str, errors: Vec<GraphQLError>) -> Self {
        ServerMessage::Error {
            id: id.to_string(),
            payload: errors,
        }
    }

    pub fn complete(id: &str) -> Self {
        ServerMessage::Complete { id: id.to_string() }
    }

    /// Serializes the message to its wire text.
    pub fn to_text(&self) -> Result<String, sonic_rs::Error> {
        sonic_rs::to_string(self)
    }
}

/// One outbound unit queued towards the connection: either a protocol
/// message to deliver as a text frame, or a close intent. Once a close is
/// queued nothing further follows it.
#[derive(Debug)]
pub enum Outbound {
    Message(ServerMessage),
    Close(CloseFrame),
}

impl From<ServerMessage> for Outbound {
    fn from(message: ServerMessage) -> Self {
        Outbound::Message(message)
    }
}

impl From<CloseCode> for Outbound {
    fn from(code: CloseCode) -> Self {
        Outbound::Close(code.into())
    }
}
