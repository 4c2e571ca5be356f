use std::{fmt, str::FromStr};

use axum::extract::FromRequestParts;
use chrono::{DateTime, Utc};
use http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::AdmissionError;

/// The role a token grants. Roles are flat: no role implies another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// HR administrators.
    Admin,
    /// Team managers approving leave and expenses.
    Manager,
    /// Regular employees.
    Employee,
}

impl Role {
    /// The name used in tokens.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// The custom part of a token payload, next to the registered `exp` claim.
///
/// Deserialization is strict: a `role` that is not one of the known role names,
/// or a `sub` that is not a string, rejects the whole token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier, usually the employee id.
    pub sub: String,
    /// Granted role.
    pub role: Role,
}

/// Claims of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject identifier.
    pub subject: String,
    /// Granted role.
    pub role: Role,
    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller of the current request.
///
/// Present in the request extensions only after the token passed every check.
/// Handlers behind the authentication gate take it as an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject identifier.
    pub subject: String,
    /// Granted role.
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.subject,
            role: claims.role,
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AdmissionError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(identity) => Ok(identity.clone()),
            None => {
                log::error!(
                    "Handler for {} {} requires an identity but the route is not behind the authentication gate",
                    parts.method,
                    parts.uri.path()
                );

                Err(AdmissionError::Internal)
            }
        }
    }
}
