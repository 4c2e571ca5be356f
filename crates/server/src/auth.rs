pub(crate) mod claims;
mod jwt;
mod verifier;

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use http::{Request, Response, header::AUTHORIZATION, request::Parts};
use tower::Layer;

pub use claims::{Claims, Identity, Role, TokenClaims};
pub use jwt::JwtVerifier;
pub use verifier::{TokenVerifier, VerifyError};

use crate::AdmissionError;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("token must be prefixed with Bearer")]
    InvalidScheme,
    #[error("more than one Authorization header")]
    DuplicateHeader,
    #[error(transparent)]
    Rejected(#[from] VerifyError),
}

/// Authenticates the request and attaches its [`Identity`].
fn authenticate(verifier: &dyn TokenVerifier, parts: &Parts) -> Result<Identity, AuthError> {
    let mut headers = parts.headers.get_all(AUTHORIZATION).iter();
    let header = headers.next().ok_or(AuthError::MissingToken)?;

    if headers.next().is_some() {
        return Err(AuthError::DuplicateHeader);
    }

    let header = header.to_str().map_err(|_| AuthError::InvalidScheme)?;
    let token = header.strip_prefix(BEARER_PREFIX).ok_or(AuthError::InvalidScheme)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let claims = verifier.verify(token)?;

    Ok(Identity::from(claims))
}

/// The authentication gate.
#[derive(Clone)]
pub struct AuthLayer(Arc<dyn TokenVerifier>);

impl AuthLayer {
    /// Authenticates requests with `verifier`.
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self(verifier)
    }
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            verifier: self.0.clone(),
        }
    }
}

/// Service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthService<Service> {
    next: Service,
    verifier: Arc<dyn TokenVerifier>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let verifier = self.verifier.clone();

        let (mut parts, body) = req.into_parts();

        Box::pin(async move {
            match authenticate(verifier.as_ref(), &parts) {
                Ok(identity) => {
                    log::debug!(
                        "Authenticated {} as {} for {} {}",
                        identity.subject,
                        identity.role,
                        parts.method,
                        parts.uri.path()
                    );

                    parts.extensions.insert(identity);
                    next.call(Request::from_parts(parts, body)).await
                }
                Err(error) => {
                    log::debug!(method = parts.method.as_str(), path = parts.uri.path(); "Authentication failed: {error}");
                    Ok(AdmissionError::Unauthenticated.into_response())
                }
            }
        })
    }
}
