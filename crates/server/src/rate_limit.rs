//! Per-client rate limiting middleware.

use std::{
    fmt::Display,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, extract::ConnectInfo, response::IntoResponse};
use http::{Request, Response};
use rate_limit::{RateLimitError, RateLimitRegistry};
use tower::Layer;

use crate::AdmissionError;

/// Key shared by every request without a derivable address.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct RateLimitLayer {
    registry: Arc<RateLimitRegistry>,
    trust_forwarded_headers: bool,
}

impl RateLimitLayer {
    pub fn new(registry: Arc<RateLimitRegistry>, trust_forwarded_headers: bool) -> Self {
        Self {
            registry,
            trust_forwarded_headers,
        }
    }
}

impl<Service> Layer<Service> for RateLimitLayer
where
    Service: Send + Clone,
{
    type Service = RateLimitService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RateLimitService {
            next,
            registry: self.registry.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<Service> {
    next: Service,
    registry: Arc<RateLimitRegistry>,
    trust_forwarded_headers: bool,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RateLimitService<Service>
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

        let client = client_key(&req, self.trust_forwarded_headers);
        let admission = self.registry.admit(&client);

        Box::pin(async move {
            let err = match admission {
                Ok(()) => return next.call(req).await,
                Err(err) => err,
            };

            // No Retry-After header, the delay is only logged.
            let error = match err {
                RateLimitError::Exceeded { .. } => AdmissionError::RateLimited,
                RateLimitError::InvalidQuota(ref reason) => {
                    log::error!("Rate limiter misconfigured: {reason}");
                    AdmissionError::Internal
                }
            };

            let retry_after_ms = err
                .retry_after()
                .map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
            log::debug!(retry_after_ms; "Request rejected due to rate limit: {err}");

            Ok(error.into_response())
        })
    }
}

/// Derives the rate limiting key of a request.
///
/// Forwarding headers are only consulted when the deployment sits behind a proxy that sets them.
fn client_key<B>(req: &Request<B>, trust_forwarded_headers: bool) -> String {
    let forwarded = if trust_forwarded_headers {
        forwarded_ip(req)
    } else {
        None
    };

    let peer = || {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0.ip())
    };

    match forwarded.or_else(peer) {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        // Take the first IP in the chain
        let first = forwarded_for.to_str().ok()?.split(',').next()?;

        if let Ok(ip) = first.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    let real_ip = req.headers().get("x-real-ip")?.to_str().ok()?;

    real_ip.trim().parse::<IpAddr>().ok()
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc};

    use axum::{Router, body::Body, extract::ConnectInfo, routing::get};
    use clock::ManualClock;
    use config::RateLimitConfig;
    use http::{Request, StatusCode};
    use rate_limit::RateLimitRegistry;
    use tower::ServiceExt;

    use super::{RateLimitLayer, client_key};

    fn request() -> http::request::Builder {
        Request::builder().uri("/leave")
    }

    fn with_peer(builder: http::request::Builder, peer: &str) -> Request<Body> {
        let addr: SocketAddr = peer.parse().unwrap();
        builder.extension(ConnectInfo(addr)).body(Body::empty()).unwrap()
    }

    #[test]
    fn peer_address_by_default() {
        let req = with_peer(request().header("x-forwarded-for", "203.0.113.9"), "10.1.2.3:5555");

        assert_eq!(client_key(&req, false), "10.1.2.3");
    }

    #[test]
    fn forwarded_for_when_trusted() {
        let req = with_peer(
            request().header("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            "10.1.2.3:5555",
        );

        assert_eq!(client_key(&req, true), "203.0.113.9");
    }

    #[test]
    fn real_ip_when_forwarded_for_is_missing() {
        let req = with_peer(request().header("x-real-ip", "2001:db8::7"), "10.1.2.3:5555");

        assert_eq!(client_key(&req, true), "2001:db8::7");
    }

    #[test]
    fn garbage_forwarded_for_falls_back() {
        let req = with_peer(
            request()
                .header("x-forwarded-for", "not-an-ip")
                .header("x-real-ip", "198.51.100.4"),
            "10.1.2.3:5555",
        );

        assert_eq!(client_key(&req, true), "198.51.100.4");

        let req = with_peer(request().header("x-forwarded-for", "not-an-ip"), "10.1.2.3:5555");

        assert_eq!(client_key(&req, true), "10.1.2.3");
    }

    #[test]
    fn unknown_without_any_address() {
        let req = request().body(Body::empty()).unwrap();

        assert_eq!(client_key(&req, false), "unknown");
        assert_eq!(client_key(&req, true), "unknown");
    }

    #[tokio::test]
    async fn rejects_when_bucket_is_empty() {
        let config = RateLimitConfig {
            rate: 0.0,
            burst: 3,
            ..Default::default()
        };

        let clock = ManualClock::at_unix(1_700_000_000);
        let registry = Arc::new(RateLimitRegistry::new(&config, Arc::new(clock)).unwrap());

        let app = Router::new()
            .route("/leave", get(|| async { "ok" }))
            .layer(RateLimitLayer::new(registry.clone(), false));

        for _ in 0..3 {
            let response = app.clone().oneshot(with_peer(request(), "10.0.0.1:1000")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(with_peer(request(), "10.0.0.1:1001")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        insta::assert_snapshot!(String::from_utf8(body.to_vec()).unwrap(), @r#"{"error":"rate limit exceeded"}"#);

        let response = app.oneshot(with_peer(request(), "10.0.0.2:1000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(registry.len(), 2);
    }
}
