use bytes::Bytes;

use crate::response::HttpGraphQLResponse;

/// Converts one web framework's native request/response types to and from
/// the neutral types the core speaks. Implemented once per target
/// framework; the core itself never references a concrete framework type.
pub trait WireAdapter {
    type Request;
    type Response;
    type Error;

    /// Collects the framework request into neutral `http` parts plus the
    /// full body bytes. May fail for transport-level reasons (unreadable
    /// body, oversized payload); such failures are the adapter's to map.
    fn to_graphql_request(&self, request: Self::Request) -> Result<http::Request<Bytes>, Self::Error>;

    /// Renders a finished response triple back into the framework's
    /// response type. The body is already serialized.
    fn from_graphql_response(&self, response: HttpGraphQLResponse) -> Self::Response;
}
