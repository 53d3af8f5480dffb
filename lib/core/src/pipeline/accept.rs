use headers_accept::Accept;
use http::{header::ACCEPT, HeaderMap};
use mediatype::MediaType;
use std::str::FromStr;
use tracing::warn;

const JSON_MEDIA_TYPE: MediaType =
    MediaType::new(mediatype::names::APPLICATION, mediatype::names::JSON);

const GRAPHQL_RESPONSE_JSON_MEDIA_TYPE: MediaType = MediaType::from_parts(
    mediatype::names::APPLICATION,
    mediatype::Name::new_unchecked("graphql-response"),
    Some(mediatype::names::JSON),
    &[],
);

const SUPPORTED_MEDIA_TYPES: &[MediaType] =
    &[JSON_MEDIA_TYPE, GRAPHQL_RESPONSE_JSON_MEDIA_TYPE];

/// The content type a GraphQL response is serialized under, decided by
/// Accept-header negotiation.
#[derive(PartialEq, Eq, Default, Debug, Clone, Copy)]
pub enum ResponseContentType {
    /// GraphQL over HTTP spec (`application/graphql-response+json`)
    ///
    /// Read more: https://graphql.github.io/graphql-over-http
    GraphQLResponseJson,
    /// Legacy GraphQL over HTTP (`application/json`)
    ///
    /// Default when the client negotiated nothing more specific.
    #[default]
    Json,
}

impl ResponseContentType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResponseContentType::GraphQLResponseJson => "application/graphql-response+json",
            ResponseContentType::Json => "application/json",
        }
    }

    /// Legacy clients that did not negotiate the GraphQL response media
    /// type only check the body shape, so failures before execution are
    /// reported at 200 for them.
    pub const fn prefers_ok_on_failure(&self) -> bool {
        matches!(self, ResponseContentType::Json)
    }
}

/// Negotiates the response content type from the request's Accept header,
/// respecting q-weights. An absent, empty, or unmatchable Accept header
/// falls back to legacy `application/json` so that naive clients always
/// receive a parseable body.
pub fn negotiate_response_type(headers: &HeaderMap) -> ResponseContentType {
    let accept_header = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if accept_header.is_empty() {
        return ResponseContentType::default();
    }

    let accept = match Accept::from_str(accept_header) {
        Ok(accept) => accept,
        Err(_) => {
            warn!("failed to parse Accept header: {}", accept_header);
            return ResponseContentType::default();
        }
    };

    match accept.negotiate(SUPPORTED_MEDIA_TYPES) {
        Some(media_type) if *media_type == GRAPHQL_RESPONSE_JSON_MEDIA_TYPE => {
            ResponseContentType::GraphQLResponseJson
        }
        _ => ResponseContentType::Json,
    }
}
