use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    /// Maximum number of parsed operation documents kept in the in-memory
    /// parse cache. The cache is keyed by a hash of the raw query text, so
    /// repeated operations skip GraphQL parsing entirely.
    #[serde(default = "parser_cache_size_default")]
    pub cache_size: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            cache_size: parser_cache_size_default(),
        }
    }
}

fn parser_cache_size_default() -> u64 {
    1000
}
