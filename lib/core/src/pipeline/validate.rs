use http::Method;
use mediatype::MediaType;
use tracing::{error, warn};

use crate::pipeline::error::PipelineErrorVariant;
use crate::request::{HttpGraphQLRequest, OperationType};

/// GraphQL over HTTP speaks GET and POST; everything else is rejected
/// before the body is even looked at.
pub fn validate_method(method: &Method) -> Result<(), PipelineErrorVariant> {
    match *method {
        Method::GET | Method::POST => Ok(()),
        _ => {
            warn!("unsupported HTTP method: {}", method);
            Err(PipelineErrorVariant::InvalidMethod)
        }
    }
}

/// POST requests must declare a JSON-compatible content type. GET requests
/// are exempt: their payload travels in the query string.
pub fn validate_content_type(
    method: &Method,
    content_type: Option<&str>,
) -> Result<(), PipelineErrorVariant> {
    if *method != Method::POST {
        return Ok(());
    }

    match content_type {
        Some(value) if is_json_compatible(value) => Ok(()),
        Some(value) => {
            warn!("invalid content type on a POST request: {}", value);
            Err(PipelineErrorVariant::InvalidContentType)
        }
        None => {
            warn!("POST request without a content-type header");
            Err(PipelineErrorVariant::InvalidContentType)
        }
    }
}

/// Operation-type/method compatibility: mutations only over POST, and
/// subscriptions never over plain HTTP (they belong to the WebSocket
/// session protocol).
pub fn validate_operation_type(
    method: &Method,
    operation_type: OperationType,
) -> Result<(), PipelineErrorVariant> {
    match operation_type {
        OperationType::Mutation if *method == Method::GET => {
            error!("mutation is not allowed over GET, stopping");
            Err(PipelineErrorVariant::InvalidMethod)
        }
        OperationType::Subscription => Err(PipelineErrorVariant::SubscriptionOverHttp),
        _ => Ok(()),
    }
}

/// Full transport validation of a normalized request: method check,
/// content-type check, operation-type compatibility, in that order,
/// short-circuiting on the first failure.
pub fn validate_transport(request: &HttpGraphQLRequest) -> Result<(), PipelineErrorVariant> {
    validate_method(&request.method)?;
    validate_content_type(&request.method, request.content_type.as_deref())?;
    validate_operation_type(&request.method, request.operation_type)
}

/// `application/json` and any `+json` suffixed media type (notably
/// `application/graphql-response+json`) count as JSON-compatible.
fn is_json_compatible(content_type: &str) -> bool {
    match MediaType::parse(content_type) {
        Ok(media_type) => {
            (media_type.ty == mediatype::names::APPLICATION
                && media_type.subty == mediatype::names::JSON)
                || media_type.suffix == Some(mediatype::names::JSON)
        }
        Err(_) => false,
    }
}
