use bytes::Bytes;
use http::header::CONTENT_TYPE;
use tracing::error;

use crate::context::ContextBuilder;
use crate::engine::{Engine, EngineOutput};
use crate::request::{ConnectionInfo, HttpGraphQLRequest};
use crate::response::HttpGraphQLResponse;
use crate::shared_state::SharedState;

pub mod accept;
pub mod csrf;
pub mod error;
pub mod execute;
pub mod normalize;
pub mod parser;
pub mod respond;
pub mod validate;

pub use accept::{negotiate_response_type, ResponseContentType};
pub use error::{IssueClass, PipelineError, PipelineErrorVariant};
pub use normalize::{normalize_request, normalize_subscribe_payload};
pub use validate::validate_transport;

/// The full HTTP request lifecycle: accept negotiation, CSRF gate,
/// normalization, operation parsing, transport validation, context
/// construction, execution, and response mapping. Every failure is
/// resolved into an [`HttpGraphQLResponse`] here; nothing escapes to the
/// transport glue.
pub async fn process_request<E: Engine>(
    state: &SharedState<E>,
    request: http::Request<Bytes>,
    context_builder: &dyn ContextBuilder<E::Context>,
) -> HttpGraphQLResponse {
    let (parts, body) = request.into_parts();
    let accept = accept::negotiate_response_type(&parts.headers);
    let accept_ok = accept.prefers_ok_on_failure();

    let http_request = match prepare_request(state, &parts, &body).await {
        Ok(request) => request,
        Err(variant) => return variant.with_accept(accept_ok).into(),
    };

    let info = ConnectionInfo::from_parts(&parts);
    let context = match context_builder.build(&info).await {
        Ok(context) => context,
        Err(err) => {
            error!("failed to build the execution context: {}", err);
            return PipelineErrorVariant::ContextBuildFailed(err)
                .with_accept(accept_ok)
                .into();
        }
    };

    handle_request(state, &http_request, &context, accept).await
}

/// Builds the immutable [`HttpGraphQLRequest`] from raw wire parts:
/// CSRF gate, normalization, and operation parsing.
async fn prepare_request<E: Engine>(
    state: &SharedState<E>,
    parts: &http::request::Parts,
    body: &Bytes,
) -> Result<HttpGraphQLRequest, PipelineErrorVariant> {
    csrf::perform_csrf_prevention(&parts.headers, &state.config.csrf)?;

    let graphql_request =
        normalize::normalize_request(&parts.method, &parts.headers, parts.uri.query(), body)?;
    let parser_payload = parser::parse_operation_with_cache(state, &graphql_request).await?;

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    Ok(HttpGraphQLRequest {
        method: parts.method.clone(),
        content_type,
        request: graphql_request,
        operation_type: parser_payload.operation_type,
    })
}

/// Validates and executes an already-normalized request with a caller-built
/// context, mapping the outcome onto the transport.
pub async fn handle_request<E: Engine>(
    state: &SharedState<E>,
    request: &HttpGraphQLRequest,
    context: &E::Context,
    content_type: ResponseContentType,
) -> HttpGraphQLResponse {
    let accept_ok = content_type.prefers_ok_on_failure();
    match handle_inner(state, request, context).await {
        Ok(output) => respond::respond(output, content_type),
        Err(variant) => variant.with_accept(accept_ok).into(),
    }
}

async fn handle_inner<E: Engine>(
    state: &SharedState<E>,
    request: &HttpGraphQLRequest,
    context: &E::Context,
) -> Result<EngineOutput, PipelineErrorVariant> {
    validate::validate_transport(request)?;
    execute::execute_request(state, request, context).await
}
