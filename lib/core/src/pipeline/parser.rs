use graphql_parser::query::{parse_query, Definition, Document, OperationDefinition};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{error, trace};
use xxhash_rust::xxh3::Xxh3;

use crate::engine::Engine;
use crate::pipeline::error::PipelineErrorVariant;
use crate::request::{GraphQLRequest, OperationType};
use crate::shared_state::SharedState;

/// The parsed document plus the operation resolved against the request's
/// `operationName`.
#[derive(Debug, Clone)]
pub struct ParserPayload {
    pub document: Arc<Document<'static, String>>,
    pub operation_type: OperationType,
    pub operation_name: Option<String>,
}

/// Parses the request's query document, going through the shared parse
/// cache keyed by an xxh3 digest of the raw query text. Operation
/// resolution happens per request: the cache entry is shared between
/// requests that name different operations of the same document.
#[inline]
pub async fn parse_operation_with_cache<E: Engine>(
    state: &SharedState<E>,
    request: &GraphQLRequest,
) -> Result<ParserPayload, PipelineErrorVariant> {
    let cache_key = {
        let mut hasher = Xxh3::new();
        request.query.hash(&mut hasher);
        hasher.finish()
    };

    let document = if let Some(cached) = state.parse_cache.get(&cache_key).await {
        trace!("found cached parsed operation for query");
        cached
    } else {
        let parsed = parse_query::<String>(&request.query)
            .map_err(|err| {
                error!("failed to parse GraphQL operation: {}", err);
                PipelineErrorVariant::ParseFailed(err)
            })?
            .into_static();
        let parsed_arc = Arc::new(parsed);
        state.parse_cache.insert(cache_key, parsed_arc.clone()).await;
        parsed_arc
    };

    let (operation_type, operation_name) =
        resolve_operation(&document, request.operation_name.as_deref())?;

    Ok(ParserPayload {
        document,
        operation_type,
        operation_name,
    })
}

/// Picks the executable operation: the one matching the requested name, or
/// the first operation of the document when no name was given.
fn resolve_operation(
    document: &Document<'static, String>,
    wanted: Option<&str>,
) -> Result<(OperationType, Option<String>), PipelineErrorVariant> {
    let mut operations = document.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    let resolved = match wanted {
        Some(name) => operations
            .find(|op| operation_name(op) == Some(name))
            .ok_or_else(|| PipelineErrorVariant::UnknownOperationName(name.to_string()))?,
        None => operations.next().ok_or(PipelineErrorVariant::OperationNotFound)?,
    };

    Ok((
        operation_type(resolved),
        operation_name(resolved).map(str::to_string),
    ))
}

fn operation_type(operation: &OperationDefinition<'static, String>) -> OperationType {
    match operation {
        OperationDefinition::Query(_) | OperationDefinition::SelectionSet(_) => {
            OperationType::Query
        }
        OperationDefinition::Mutation(_) => OperationType::Mutation,
        OperationDefinition::Subscription(_) => OperationType::Subscription,
    }
}

fn operation_name<'a>(operation: &'a OperationDefinition<'static, String>) -> Option<&'a str> {
    match operation {
        OperationDefinition::Query(def) => def.name.as_deref(),
        OperationDefinition::Mutation(def) => def.name.as_deref(),
        OperationDefinition::Subscription(def) => def.name.as_deref(),
        OperationDefinition::SelectionSet(_) => None,
    }
}
