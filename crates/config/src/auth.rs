//! Bearer token verification settings.

use std::{fmt, time::Duration};

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;

/// Settings for verifying already-issued bearer tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// The shared HMAC secret tokens are signed with.
    pub secret: SecretString,
    /// The only signing algorithm accepted. Tokens declaring any other algorithm are rejected.
    #[serde(default)]
    pub algorithm: JwtAlgorithm,
    /// Clock skew tolerated when checking expiry.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub leeway: Duration,
}

/// HMAC signing algorithms accepted for bearer tokens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC with SHA-384.
    #[serde(rename = "HS384")]
    Hs384,
    /// HMAC with SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
}

impl JwtAlgorithm {
    /// The `alg` header value identifying this algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            JwtAlgorithm::Hs256 => "HS256",
            JwtAlgorithm::Hs384 => "HS384",
            JwtAlgorithm::Hs512 => "HS512",
        }
    }

    /// Smallest secret length in bytes that matches the hash output size.
    pub fn recommended_secret_len(self) -> usize {
        match self {
            JwtAlgorithm::Hs256 => 32,
            JwtAlgorithm::Hs384 => 48,
            JwtAlgorithm::Hs512 => 64,
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
