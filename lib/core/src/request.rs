use http::{HeaderMap, Method, Uri};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// An ordered string-keyed JSON object, as used for variables and
/// extensions. Insertion order is preserved so that values round-trip
/// through the pipeline unchanged.
pub type JsonMap = IndexMap<String, sonic_rs::Value>;

/// A canonical GraphQL request, independent of the wire encoding it
/// arrived in. `query` is guaranteed non-empty: an absent or empty query
/// is a normalization failure, never an empty string here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    pub operation_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub variables: JsonMap,
    pub extensions: Option<JsonMap>,
}

pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// The executable operation type of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }
}

/// A normalized GraphQL request together with the transport metadata the
/// validator needs. Built once per incoming request, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpGraphQLRequest {
    pub method: Method,
    pub content_type: Option<String>,
    pub request: GraphQLRequest,
    pub operation_type: OperationType,
}

/// A snapshot of the transport-level facts about an incoming HTTP request
/// or WebSocket upgrade, handed to context builders and connection guards.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl ConnectionInfo {
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}
