use super::claims::Claims;

/// Checks a bearer token and returns its claims.
///
/// The authentication gate only sees this trait, so tests can swap in
/// verifiers that accept or reject without real signatures.
pub trait TokenVerifier: Send + Sync {
    /// Verifies `token`, the part of the header after `Bearer `.
    fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// Why a token was rejected. The client only ever sees a generic 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Not a structurally valid compact JWT.
    #[error("malformed token")]
    Malformed,
    /// The token declares an algorithm other than the configured one.
    #[error("algorithm not allowed")]
    AlgorithmMismatch,
    /// The signature does not match the configured key.
    #[error("invalid signature")]
    InvalidSignature,
    /// The token is past its expiry.
    #[error("token expired")]
    Expired,
    /// The payload lacks a claim or has one of the wrong type.
    #[error("malformed claims")]
    MalformedClaims,
}
