pub mod csrf;
pub mod parser;
pub mod websocket;

use config::{Config, File};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{csrf::CsrfPreventionConfig, parser::ParserConfig, websocket::WebSocketConfig};

/// File names probed (with any supported extension) when no explicit
/// configuration path is given.
const DEFAULT_FILE_NAMES: &[&str] = &["trailhead.config"];

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TrailheadConfig {
    /// CSRF prevention for the HTTP pipeline.
    ///
    /// Disabled by default. When enabled, requests carrying a "simple"
    /// content type must present at least one of the configured headers.
    #[serde(default)]
    pub csrf: CsrfPreventionConfig,

    /// Client operation parsing and parse-cache tuning.
    #[serde(default)]
    pub parser: ParserConfig,

    /// WebSocket session timeouts and keepalive behavior.
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Loads the configuration from the given file path, or probes the default
/// file names in the working directory. Every section is optional; absent
/// files yield the default configuration.
pub fn load_config(override_config_path: Option<String>) -> Result<TrailheadConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = override_config_path {
        builder = builder.add_source(File::with_name(&path).required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    let raw = builder.build()?;
    Ok(raw.try_deserialize::<TrailheadConfig>()?)
}
