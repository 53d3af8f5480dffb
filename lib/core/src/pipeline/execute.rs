use tracing::error;

use crate::engine::{Engine, EngineOutput, EngineResponse};
use crate::pipeline::error::PipelineErrorVariant;
use crate::request::HttpGraphQLRequest;
use crate::shared_state::SharedState;

/// Runs a validated request against the engine. Expected GraphQL-level
/// failures come back inside the result's `errors`; only engine-internal
/// faults surface as pipeline errors.
#[inline]
pub async fn execute_request<E: Engine>(
    state: &SharedState<E>,
    request: &HttpGraphQLRequest,
    context: &E::Context,
) -> Result<EngineOutput, PipelineErrorVariant> {
    let response = state
        .engine
        .execute(&request.request, context)
        .await
        .map_err(|err| {
            error!("engine reported an internal failure: {}", err);
            PipelineErrorVariant::EngineInternal(err)
        })?;

    match response {
        EngineResponse::Single(output) => Ok(output),
        EngineResponse::Stream(_) => {
            // the transport validator already rejected subscriptions, so a
            // stream here is an engine contract violation
            error!(
                operation_type = request.operation_type.as_str(),
                "engine returned a stream for a non-streaming operation"
            );
            Err(PipelineErrorVariant::EngineInternal(
                crate::engine::EngineError::new("unexpected streaming response"),
            ))
        }
    }
}
