use std::time::Duration;

use duration_str::deserialize_option_duration;
use serde::Deserialize;

/// Static security headers appended to every response.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityHeadersConfig {
    /// Whether the headers are added at all.
    pub enabled: bool,
    /// `Strict-Transport-Security` max-age. The header is omitted when unset.
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub hsts_max_age: Option<Duration>,
    /// Value of the `Content-Security-Policy` header.
    pub content_security_policy: String,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hsts_max_age: None,
            content_security_policy: "default-src 'none'; frame-ancestors 'none'".to_string(),
        }
    }
}
