#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use http::{HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use trailhead_core::{
    Engine, EngineError, EngineOutput, EngineResponse, ExecutionResult, GraphQLError,
    GraphQLRequest,
};

/// A scriptable engine: the query text selects the behavior, and every
/// request it sees is recorded for assertions.
pub struct MockEngine {
    pub seen: Arc<Mutex<Vec<GraphQLRequest>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    type Context = ();

    async fn execute(
        &self,
        request: &GraphQLRequest,
        _context: &(),
    ) -> Result<EngineResponse, EngineError> {
        self.seen.lock().push(request.clone());

        if request.query.contains("boom") {
            return Err(EngineError::new("connection pool exhausted"));
        }

        if request.query.contains("fieldError") {
            return Ok(EngineResponse::Single(EngineOutput::new(ExecutionResult {
                data: Some(sonic_rs::json!({ "user": null })),
                errors: vec![GraphQLError::from("resolver failed".to_string())],
                extensions: None,
            })));
        }

        if request.query.contains("traced") {
            let mut output = EngineOutput::new(ExecutionResult::from_data(
                sonic_rs::json!({ "traced": true }),
            ));
            output.headers.insert(
                HeaderName::from_static("x-trace-id"),
                HeaderValue::from_static("trace-1"),
            );
            return Ok(EngineResponse::Single(output));
        }

        if request.query.contains("echo") {
            let variables = sonic_rs::to_value(&request.variables).unwrap();
            return Ok(EngineResponse::Single(EngineOutput::new(
                ExecutionResult::from_data(variables),
            )));
        }

        if request.query.contains("count") {
            let stream = futures::stream::iter(
                (0..3).map(|n| ExecutionResult::from_data(sonic_rs::json!({ "count": n }))),
            )
            .boxed();
            return Ok(EngineResponse::Stream(stream));
        }

        if request.query.contains("ticks") {
            let stream = futures::stream::unfold(0u64, |n| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some((
                    ExecutionResult::from_data(sonic_rs::json!({ "tick": n })),
                    n + 1,
                ))
            })
            .boxed();
            return Ok(EngineResponse::Stream(stream));
        }

        Ok(EngineResponse::Single(EngineOutput::new(
            ExecutionResult::from_data(sonic_rs::json!({ "hello": "world" })),
        )))
    }
}
