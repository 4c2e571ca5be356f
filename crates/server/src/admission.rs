//! Orders the gates around the caller's route groups.

use std::{collections::BTreeSet, sync::Arc};

use anyhow::bail;
use axum::Router;
use clock::Clock;
use config::{HealthConfig, ServerConfig};
use http::HeaderValue;
use rate_limit::RateLimitRegistry;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer};

use crate::{
    AuthLayer, JwtVerifier, Role, TokenVerifier, cors, health, rate_limit::RateLimitLayer, recovery::RecoveryLayer,
    role::RoleLayer, security_headers,
};

/// Route groups by the gates they need.
///
/// The route table itself belongs to the business modules, which hand their routers here.
#[derive(Default)]
pub struct Routes {
    public: Router,
    authenticated: Router,
    restricted: Vec<(BTreeSet<Role>, Router)>,
    needs_verifier: bool,
}

impl Routes {
    /// An empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes open to any client that is within its rate limit.
    pub fn public(mut self, router: Router) -> Self {
        self.public = self.public.merge(router);
        self
    }

    /// Routes requiring a valid bearer token, whatever its role.
    pub fn authenticated(mut self, router: Router) -> Self {
        self.authenticated = self.authenticated.merge(router);
        self.needs_verifier = true;
        self
    }

    /// Routes requiring a valid bearer token with one of `roles`.
    pub fn restricted(mut self, roles: impl IntoIterator<Item = Role>, router: Router) -> Self {
        self.restricted.push((roles.into_iter().collect(), router));
        self.needs_verifier = true;
        self
    }
}

/// The admission pipeline, built once at startup.
pub struct Admission {
    verifier: Option<Arc<dyn TokenVerifier>>,
    rate_limits: Option<Arc<RateLimitRegistry>>,
    trust_forwarded_headers: bool,
    cors: Option<CorsLayer>,
    security_headers: Vec<SetResponseHeaderLayer<HeaderValue>>,
    health: Option<HealthConfig>,
}

impl Admission {
    /// Builds every gate from the server settings.
    pub fn from_config(config: &ServerConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let verifier = config.auth.as_ref().map(|auth| {
            log::debug!("Verifying bearer tokens with {}", auth.algorithm);
            Arc::new(JwtVerifier::new(auth, clock.clone())) as Arc<dyn TokenVerifier>
        });

        let rate_limits = if config.rate_limits.enabled {
            log::debug!(
                "Rate limiting clients to {} requests per second with a burst of {}",
                config.rate_limits.rate,
                config.rate_limits.burst
            );

            Some(Arc::new(RateLimitRegistry::new(&config.rate_limits, clock)?))
        } else {
            log::debug!("Rate limiting disabled");
            None
        };

        let cors = config.cors.as_ref().map(cors::generate).transpose()?;

        // A health endpoint on its own listener is served by `serve`, not composed here.
        let health = (config.health.enabled && config.health.listen.is_none()).then(|| config.health.clone());

        Ok(Self {
            verifier,
            rate_limits,
            trust_forwarded_headers: config.rate_limits.trust_forwarded_headers,
            cors,
            security_headers: security_headers::layers(&config.security_headers)?,
            health,
        })
    }

    /// Replaces the token verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// The rate limiter registry, if rate limiting is enabled.
    pub fn rate_limits(&self) -> Option<&Arc<RateLimitRegistry>> {
        self.rate_limits.as_ref()
    }

    /// Wraps the route groups in the gates, outermost first:
    /// recovery, CORS, security headers, rate limiting, then authentication and
    /// role checks for the groups that need them.
    ///
    /// The health endpoint joins after rate limiting, so probes are never throttled.
    pub fn compose(&self, routes: Routes) -> anyhow::Result<Router> {
        let Routes {
            public,
            authenticated,
            restricted,
            needs_verifier,
        } = routes;

        let mut app = public;

        match &self.verifier {
            Some(verifier) => {
                let auth = AuthLayer::new(verifier.clone());

                // Route layers only, so the gates never reach the fallback of unmatched paths.
                if authenticated.has_routes() {
                    app = app.merge(authenticated.route_layer(auth.clone()));
                }

                for (roles, router) in restricted.into_iter().filter(|(_, router)| router.has_routes()) {
                    app = app.merge(router.route_layer(RoleLayer::new(roles)).route_layer(auth.clone()));
                }
            }
            None if needs_verifier => {
                bail!("Authenticated routes were registered but no token verification is configured in [server.auth]")
            }
            None => (),
        }

        if let Some(registry) = &self.rate_limits {
            app = app.layer(RateLimitLayer::new(registry.clone(), self.trust_forwarded_headers));
        }

        if let Some(health) = &self.health {
            app = app.merge(health::router(health));
        }

        for layer in &self.security_headers {
            app = app.layer(layer.clone());
        }

        if let Some(cors) = &self.cors {
            app = app.layer(cors.clone());
        }

        Ok(app.layer(RecoveryLayer))
    }
}
