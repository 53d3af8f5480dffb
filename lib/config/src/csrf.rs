use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration for CSRF prevention.
///
/// Browsers only preflight requests that carry a non-"simple" content type
/// or custom headers. When CSRF prevention is enabled, requests that would
/// not have triggered a preflight must present at least one of the
/// `required_headers`, otherwise they are rejected with `403 Forbidden`.
///
/// Header names are case-insensitive, so `X-CSRF-Token` and `x-csrf-token`
/// are treated the same.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct CsrfPreventionConfig {
    /// Enables/disables the CSRF prevention check. Disabled by default.
    #[serde(default)]
    pub enabled: bool,

    /// A list of required header names for CSRF protection.
    #[serde(default)]
    pub required_headers: Vec<String>,
}
