use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts for the GraphQL over WebSocket session protocol.
///
/// All durations accept humantime values, e.g. `5s` or `1500ms`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WebSocketConfig {
    /// How long a freshly opened connection may wait before sending its
    /// `connection_init` message. On timeout the connection is closed with
    /// close code 4408.
    #[serde(
        default = "default_connection_init_timeout",
        deserialize_with = "humantime_serde::deserialize",
        serialize_with = "humantime_serde::serialize"
    )]
    #[schemars(with = "String")]
    pub connection_init_timeout: Duration,

    /// The interval at which protocol-level ping messages are sent to the
    /// peer.
    #[serde(
        default = "default_keepalive_interval",
        deserialize_with = "humantime_serde::deserialize",
        serialize_with = "humantime_serde::serialize"
    )]
    #[schemars(with = "String")]
    pub keepalive_interval: Duration,

    /// How long the peer may stay silent (no ping/pong traffic) before the
    /// connection is considered dead and closed.
    #[serde(
        default = "default_keepalive_timeout",
        deserialize_with = "humantime_serde::deserialize",
        serialize_with = "humantime_serde::serialize"
    )]
    #[schemars(with = "String")]
    pub keepalive_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            connection_init_timeout: default_connection_init_timeout(),
            keepalive_interval: default_keepalive_interval(),
            keepalive_timeout: default_keepalive_timeout(),
        }
    }
}

fn default_connection_init_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_keepalive_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_keepalive_timeout() -> Duration {
    Duration::from_secs(10)
}
