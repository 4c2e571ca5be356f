use std::{
    collections::BTreeSet,
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use http::{Request, Response};
use tower::Layer;

use crate::{AdmissionError, Identity, Role};

/// Admits only identities whose role is in a fixed set.
///
/// Must sit behind the authentication gate.
#[derive(Clone)]
pub struct RoleLayer(Arc<BTreeSet<Role>>);

impl RoleLayer {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(Arc::new(roles.into_iter().collect()))
    }
}

impl<Service> Layer<Service> for RoleLayer
where
    Service: Send + Clone,
{
    type Service = RoleService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RoleService {
            next,
            permitted: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RoleService<Service> {
    next: Service,
    permitted: Arc<BTreeSet<Role>>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RoleService<Service>
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
        let permitted = self.permitted.clone();

        Box::pin(async move {
            let Some(identity) = req.extensions().get::<Identity>() else {
                log::error!(
                    "Role check on {} {} ran without an authenticated identity, the authentication gate must come first",
                    req.method(),
                    req.uri().path()
                );

                return Ok(AdmissionError::Forbidden.into_response());
            };

            if !permitted.contains(&identity.role) {
                log::debug!(
                    "Role {} of {} is not permitted on {} {}",
                    identity.role,
                    identity.subject,
                    req.method(),
                    req.uri().path()
                );

                return Ok(AdmissionError::Forbidden.into_response());
            }

            next.call(req).await
        })
    }
}
