use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};

use crate::engine::EngineOutput;
use crate::pipeline::accept::ResponseContentType;
use crate::response::{json_body, HttpGraphQLResponse};

/// Maps a finished execution onto the transport. Executed operations are
/// always 200: partial data with field-level errors is a valid GraphQL
/// response. Engine headers are merged with replace-or-add semantics per
/// header name, never wholesale.
pub fn respond(output: EngineOutput, content_type: ResponseContentType) -> HttpGraphQLResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));

    for (name, value) in output.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    HttpGraphQLResponse {
        status: StatusCode::OK,
        headers,
        body: json_body(&output.result),
    }
}
