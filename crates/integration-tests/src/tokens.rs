//! Minting bearer tokens the way the login service would.

use chrono::{TimeDelta, Utc};
use config::JwtAlgorithm;
use jwt_compact::{
    AlgorithmExt, Claims, Header,
    alg::{Hs256, Hs256Key, Hs384, Hs384Key, Hs512, Hs512Key},
};
use serde_json::{Value, json};

/// The secret test servers verify tokens with, unless configured otherwise.
pub const TEST_SECRET: &str = "hrgate-integration-tests-secret-0123456789";

/// A valid token for `subject` with `role`, expiring in an hour.
pub fn token(subject: &str, role: &str) -> String {
    TokenBuilder::new(json!({ "sub": subject, "role": role })).build()
}

/// Builds tokens with arbitrary payloads, keys and algorithms.
pub struct TokenBuilder {
    payload: Value,
    expires_in: Option<TimeDelta>,
    secret: String,
    algorithm: JwtAlgorithm,
}

impl TokenBuilder {
    /// `payload` must be a JSON object. `exp` is added from [`Self::expires_in`].
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            expires_in: Some(TimeDelta::hours(1)),
            secret: TEST_SECRET.to_string(),
            algorithm: JwtAlgorithm::Hs256,
        }
    }

    /// Expiry relative to now. Negative values mint an already expired token.
    pub fn expires_in(mut self, ttl: TimeDelta) -> Self {
        self.expires_in = Some(ttl);
        self
    }

    /// Leave out the `exp` claim
    pub fn without_expiry(mut self) -> Self {
        self.expires_in = None;
        self
    }

    /// Sign with another secret
    pub fn secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Sign with another algorithm
    pub fn algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sign the token
    pub fn build(self) -> String {
        let mut claims = Claims::new(self.payload);
        claims.expiration = self.expires_in.map(|ttl| Utc::now() + ttl);

        let header = Header::empty();
        let secret = self.secret.as_bytes();

        let token = match self.algorithm {
            JwtAlgorithm::Hs256 => Hs256.token(&header, &claims, &Hs256Key::new(secret)),
            JwtAlgorithm::Hs384 => Hs384.token(&header, &claims, &Hs384Key::new(secret)),
            JwtAlgorithm::Hs512 => Hs512.token(&header, &claims, &Hs512Key::new(secret)),
        };

        token.unwrap()
    }
}
