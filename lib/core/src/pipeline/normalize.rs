use http::{header::CONTENT_TYPE, HeaderMap, Method};
use serde::Deserialize;
use tracing::{trace, warn};

use crate::pipeline::error::PipelineErrorVariant;
use crate::pipeline::validate;
use crate::request::{deserialize_null_default, GraphQLRequest, JsonMap};

/// The GET wire shape: JSON-valued parameters arrive URL-encoded as
/// strings and are parsed separately.
#[derive(Deserialize, Debug)]
struct GetQueryParams {
    query: Option<String>,
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
    variables: Option<String>,
    extensions: Option<String>,
}

/// The POST wire shape. `query` is optional here so that an absent query
/// is reported as `MissingQuery`, distinct from a malformed body.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawGraphQLRequest {
    query: Option<String>,
    operation_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    variables: JsonMap,
    extensions: Option<JsonMap>,
}

/// Normalizes a raw wire request into a canonical [`GraphQLRequest`].
///
/// Pure and side-effect-free: no schema access, no execution, and equal
/// inputs always produce equal outputs. The transport gate (method and
/// POST content-type checks) runs before any body parsing so that, for
/// example, a `text/plain` POST fails on its content type no matter what
/// the body contains.
pub fn normalize_request(
    method: &Method,
    headers: &HeaderMap,
    query_string: Option<&str>,
    body: &[u8],
) -> Result<GraphQLRequest, PipelineErrorVariant> {
    validate::validate_method(method)?;
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    validate::validate_content_type(method, content_type)?;

    match *method {
        Method::GET => {
            trace!("processing GET GraphQL request");
            let raw = query_string.unwrap_or("");
            let params: GetQueryParams = serde_urlencoded::from_str(raw).map_err(|err| {
                warn!("failed to parse query parameters: {}", err);
                PipelineErrorVariant::InvalidForm
            })?;
            trace!("parsed GET query params: {:?}", params);
            from_get_params(params)
        }
        Method::POST => {
            trace!("processing POST GraphQL request");
            let raw: RawGraphQLRequest = sonic_rs::from_slice(body).map_err(|err| {
                warn!("failed to parse request body: {}", err);
                PipelineErrorVariant::InvalidForm
            })?;
            finish(raw)
        }
        _ => Err(PipelineErrorVariant::InvalidMethod),
    }
}

/// Normalizes the payload of a `subscribe` message, which carries the same
/// shape as a POST body but framed inside the message envelope.
pub fn normalize_subscribe_payload(
    payload: &sonic_rs::Value,
) -> Result<GraphQLRequest, PipelineErrorVariant> {
    let raw: RawGraphQLRequest = sonic_rs::from_value(payload).map_err(|err| {
        warn!("failed to parse subscribe payload: {}", err);
        PipelineErrorVariant::InvalidForm
    })?;
    finish(raw)
}

fn from_get_params(params: GetQueryParams) -> Result<GraphQLRequest, PipelineErrorVariant> {
    // an absent query is reported first, whatever else the query string carries
    let query = match params.query {
        Some(query) if !query.is_empty() => query,
        _ => return Err(PipelineErrorVariant::MissingQuery),
    };

    let variables = match params.variables.as_deref() {
        Some(value) if !value.is_empty() => {
            sonic_rs::from_str(value).map_err(PipelineErrorVariant::InvalidVariables)?
        }
        _ => JsonMap::new(),
    };

    let extensions = match params.extensions.as_deref() {
        Some(value) if !value.is_empty() => {
            Some(sonic_rs::from_str(value).map_err(PipelineErrorVariant::InvalidExtensions)?)
        }
        _ => None,
    };

    Ok(GraphQLRequest {
        query,
        operation_name: params.operation_name,
        variables,
        extensions,
    })
}

fn finish(raw: RawGraphQLRequest) -> Result<GraphQLRequest, PipelineErrorVariant> {
    match raw.query {
        Some(query) if !query.is_empty() => Ok(GraphQLRequest {
            query,
            operation_name: raw.operation_name,
            variables: raw.variables,
            extensions: raw.extensions,
        }),
        _ => Err(PipelineErrorVariant::MissingQuery),
    }
}
