use graphql_parser::query::Document;
use moka::future::Cache;
use std::sync::Arc;
use trailhead_config::TrailheadConfig;

use crate::engine::Engine;

/// Process-wide state shared by every request and connection: the engine,
/// the configuration, and the parse cache. Everything here is immutable
/// after startup and safe to share behind an `Arc`.
pub struct SharedState<E: Engine> {
    pub engine: Arc<E>,
    pub config: Arc<TrailheadConfig>,
    pub(crate) parse_cache: Cache<u64, Arc<Document<'static, String>>>,
}

impl<E: Engine> SharedState<E> {
    pub fn new(engine: E, config: TrailheadConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            parse_cache: Cache::new(config.parser.cache_size),
            config: Arc::new(config),
        }
    }
}
