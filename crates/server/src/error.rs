//! Failure classes of the admission pipeline and their HTTP responses.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE};
use serde::Serialize;

/// Why a request was not admitted.
///
/// Every gate resolves its own failure into one of these and answers immediately.
/// Responses only carry the generic message, never the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Missing, malformed, expired or wrongly signed credentials.
    #[error("unauthorized")]
    Unauthenticated,
    /// Authenticated, but the role is not permitted on this route.
    #[error("forbidden")]
    Forbidden,
    /// The client's token bucket is empty.
    #[error("rate limit exceeded")]
    RateLimited,
    /// A fault inside the server. Details are logged, never returned.
    #[error("internal server error")]
    Internal,
}

impl AdmissionError {
    /// The HTTP status for this failure.
    pub fn status(self) -> StatusCode {
        match self {
            AdmissionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AdmissionError::Forbidden => StatusCode::FORBIDDEN,
            AdmissionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse { error: self.to_string() });
        let mut response = (self.status(), body).into_response();

        if self == AdmissionError::Unauthenticated {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
