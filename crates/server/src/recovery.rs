use std::{
    any::Any,
    fmt::Display,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use futures::FutureExt;
use http::{Request, Response};
use tower::Layer;

use crate::AdmissionError;

/// Turns a panic anywhere below into a 500 response.
#[derive(Clone, Default)]
pub struct RecoveryLayer;

impl<Service> Layer<Service> for RecoveryLayer
where
    Service: Send + Clone,
{
    type Service = RecoveryService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RecoveryService { next }
    }
}

#[derive(Clone)]
pub struct RecoveryService<Service> {
    next: Service,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RecoveryService<Service>
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

        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        Box::pin(async move {
            // Calling inside the future catches panics raised by `call` itself too.
            let result = AssertUnwindSafe(async move { next.call(req).await })
                .catch_unwind()
                .await;

            match result {
                Ok(response) => response,
                Err(payload) => {
                    log::error!("Recovered from a panic while handling {method} {path}: {}", describe(&*payload));
                    Ok(AdmissionError::Internal.into_response())
                }
            }
        })
    }
}

fn describe(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
