use std::sync::Arc;

use chrono::TimeDelta;
use clock::Clock;
use config::{AuthConfig, JwtAlgorithm};
use jwt_compact::{
    AlgorithmExt, TimeOptions, Token, UntrustedToken, ValidationError,
    alg::{Hs256, Hs256Key, Hs384, Hs384Key, Hs512, Hs512Key},
};
use secrecy::ExposeSecret;

use super::{
    claims::{Claims, TokenClaims},
    verifier::{TokenVerifier, VerifyError},
};

enum VerifyingKey {
    Hs256(Hs256Key),
    Hs384(Hs384Key),
    Hs512(Hs512Key),
}

/// Verifies HMAC-signed JWTs against one shared secret and one allowed algorithm.
pub struct JwtVerifier {
    algorithm: JwtAlgorithm,
    key: VerifyingKey,
    leeway: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl JwtVerifier {
    /// Builds a verifier from the `[server.auth]` settings, reading time from `clock`.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let key = match config.algorithm {
            JwtAlgorithm::Hs256 => VerifyingKey::Hs256(Hs256Key::new(secret)),
            JwtAlgorithm::Hs384 => VerifyingKey::Hs384(Hs384Key::new(secret)),
            JwtAlgorithm::Hs512 => VerifyingKey::Hs512(Hs512Key::new(secret)),
        };

        Self {
            algorithm: config.algorithm,
            key,
            leeway: TimeDelta::from_std(config.leeway).unwrap_or_default(),
            clock,
        }
    }

    fn validate(&self, token: &UntrustedToken<'_>) -> Result<Token<TokenClaims>, ValidationError> {
        match &self.key {
            VerifyingKey::Hs256(key) => Hs256.validator::<TokenClaims>(key).validate(token),
            VerifyingKey::Hs384(key) => Hs384.validator::<TokenClaims>(key).validate(token),
            VerifyingKey::Hs512(key) => Hs512.validator::<TokenClaims>(key).validate(token),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let untrusted = UntrustedToken::new(token).map_err(|_| VerifyError::Malformed)?;

        // Checked before touching the key, so an `alg` of "none" or an asymmetric
        // algorithm never reaches signature verification.
        if untrusted.algorithm() != self.algorithm.as_str() {
            log::debug!(
                "Token rejected: algorithm {} is not the allowed {}",
                untrusted.algorithm(),
                self.algorithm
            );

            return Err(VerifyError::AlgorithmMismatch);
        }

        // Signature is verified before the payload is deserialized.
        let token = self.validate(&untrusted).map_err(classify)?;
        let claims = token.claims();

        let time_options = TimeOptions::new(self.leeway, || self.clock.now());
        claims.validate_expiration(&time_options).map_err(classify)?;

        let expires_at = claims.expiration.ok_or(VerifyError::MalformedClaims)?;

        Ok(Claims {
            subject: claims.custom.sub.clone(),
            role: claims.custom.role,
            expires_at,
        })
    }
}

fn classify(error: ValidationError) -> VerifyError {
    log::debug!("Token rejected: {error}");

    match error {
        ValidationError::AlgorithmMismatch { .. } => VerifyError::AlgorithmMismatch,
        ValidationError::Expired => VerifyError::Expired,
        ValidationError::MalformedClaims(_) | ValidationError::NoClaim(_) => VerifyError::MalformedClaims,
        _ => VerifyError::InvalidSignature,
    }
}
