//! Transport-neutral GraphQL request lifecycle core.
//!
//! The pipeline turns raw wire requests (`http::Request<Bytes>` parts)
//! into executed GraphQL responses, and the `ws` module runs the GraphQL
//! over WebSocket session protocol over raw text frames. No concrete web
//! framework type appears anywhere; glue layers adapt their own types via
//! [`wire::WireAdapter`] and feed the session from their socket loop.

pub use trailhead_config as config;

pub mod context;
pub mod engine;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod wire;
pub mod ws;

mod shared_state;

pub use crate::context::{AdmissionError, ConnectionGuard, ContextBuildError, ContextBuilder};
pub use crate::engine::{Engine, EngineError, EngineOutput, EngineResponse, ResultStream};
pub use crate::pipeline::{
    handle_request, normalize_request, process_request, validate_transport, PipelineError,
    PipelineErrorVariant, ResponseContentType,
};
pub use crate::request::{ConnectionInfo, GraphQLRequest, HttpGraphQLRequest, JsonMap, OperationType};
pub use crate::response::{ExecutionResult, GraphQLError, HttpGraphQLResponse};
pub use crate::shared_state::SharedState;
pub use crate::wire::WireAdapter;
pub use crate::ws::{Outbound, ServerMessage, Session};
