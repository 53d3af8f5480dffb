use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use strum::IntoStaticStr;

use crate::context::ContextBuildError;
use crate::engine::EngineError;
use crate::pipeline::accept::ResponseContentType;
use crate::response::{json_body, FailedExecutionResult, GraphQLError, HttpGraphQLResponse};

/// A pipeline failure bound to the accept-negotiation outcome of the
/// request it occurred in. `accept_ok` is true when the client did not
/// negotiate `application/graphql-response+json`, in which case parsing
/// failures are reported at 200 so naive clients still get a parseable
/// body.
#[derive(Debug)]
pub struct PipelineError {
    pub accept_ok: bool,
    pub variant: PipelineErrorVariant,
}

/// Coarse classification of a pipeline failure, for glue layers that
/// branch on the failure class rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueClass {
    Parsing,
    Transport,
    Security,
    Execution,
}

#[derive(Debug, thiserror::Error, IntoStaticStr)]
pub enum PipelineErrorVariant {
    // Transport errors
    #[error("Invalid HTTP method for a GraphQL request")]
    #[strum(serialize = "METHOD_NOT_ALLOWED")]
    InvalidMethod,
    #[error("Invalid or missing content-type")]
    #[strum(serialize = "UNSUPPORTED_MEDIA_TYPE")]
    InvalidContentType,
    #[error("Subscriptions are not supported over plain HTTP")]
    #[strum(serialize = "SUBSCRIPTIONS_NOT_SUPPORTED")]
    SubscriptionOverHttp,

    // Request form errors
    #[error("Missing query parameter")]
    #[strum(serialize = "BAD_REQUEST")]
    MissingQuery,
    #[error("Invalid GraphQL request form")]
    #[strum(serialize = "BAD_REQUEST")]
    InvalidForm,
    #[error("Failed to parse GraphQL variables JSON")]
    #[strum(serialize = "BAD_REQUEST")]
    InvalidVariables(sonic_rs::Error),
    #[error("Failed to parse GraphQL extensions JSON")]
    #[strum(serialize = "BAD_REQUEST")]
    InvalidExtensions(sonic_rs::Error),

    // Operation document errors
    #[error("Failed to parse GraphQL operation")]
    #[strum(serialize = "GRAPHQL_PARSE_FAILED")]
    ParseFailed(graphql_parser::query::ParseError),
    #[error("Unknown operation named \"{0}\"")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    UnknownOperationName(String),
    #[error("The document contains no executable operations")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    OperationNotFound,

    // HTTP security errors
    #[error("Required CSRF header(s) not present")]
    #[strum(serialize = "CSRF_PREVENTION_FAILED")]
    CsrfPreventionFailed,

    // Execution failures
    #[error("Failed to build the execution context")]
    #[strum(serialize = "INTERNAL_SERVER_ERROR")]
    ContextBuildFailed(ContextBuildError),
    #[error("Engine failure: {0}")]
    #[strum(serialize = "INTERNAL_SERVER_ERROR")]
    EngineInternal(EngineError),
}

impl PipelineErrorVariant {
    pub fn error_code(&self) -> &'static str {
        self.into()
    }

    pub fn class(&self) -> IssueClass {
        match self {
            Self::InvalidMethod | Self::InvalidContentType | Self::SubscriptionOverHttp => {
                IssueClass::Transport
            }
            Self::MissingQuery
            | Self::InvalidForm
            | Self::InvalidVariables(_)
            | Self::InvalidExtensions(_)
            | Self::ParseFailed(_)
            | Self::UnknownOperationName(_)
            | Self::OperationNotFound => IssueClass::Parsing,
            Self::CsrfPreventionFailed => IssueClass::Security,
            Self::ContextBuildFailed(_) | Self::EngineInternal(_) => IssueClass::Execution,
        }
    }

    /// The message serialized to the client. Internal failures collapse to
    /// a generic message; their details only reach the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::ContextBuildFailed(_) | Self::EngineInternal(_) => "Unexpected error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn status_code(&self, accept_ok: bool) -> StatusCode {
        match self.class() {
            IssueClass::Transport => StatusCode::BAD_REQUEST,
            IssueClass::Security => StatusCode::FORBIDDEN,
            IssueClass::Execution => StatusCode::INTERNAL_SERVER_ERROR,
            IssueClass::Parsing if accept_ok => StatusCode::OK,
            IssueClass::Parsing => StatusCode::BAD_REQUEST,
        }
    }

    pub fn with_accept(self, accept_ok: bool) -> PipelineError {
        PipelineError {
            accept_ok,
            variant: self,
        }
    }
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        self.variant.status_code(self.accept_ok)
    }

    pub fn to_graphql_error(&self) -> GraphQLError {
        GraphQLError::from_message_and_code(
            self.variant.public_message(),
            self.variant.error_code(),
        )
    }
}

impl From<PipelineErrorVariant> for GraphQLError {
    fn from(variant: PipelineErrorVariant) -> Self {
        GraphQLError::from_message_and_code(variant.public_message(), variant.error_code())
    }
}

impl From<PipelineError> for HttpGraphQLResponse {
    fn from(val: PipelineError) -> Self {
        let status = val.status();
        let content_type = if val.accept_ok {
            ResponseContentType::Json
        } else {
            ResponseContentType::GraphQLResponseJson
        };

        let result = FailedExecutionResult {
            errors: Some(vec![val.to_graphql_error()]),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));

        HttpGraphQLResponse {
            status,
            headers,
            body: json_body(&result),
        }
    }
}
