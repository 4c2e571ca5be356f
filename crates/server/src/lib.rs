//! hrgate server library.
//!
//! Puts every inbound request through the admission pipeline (panic recovery,
//! CORS, security headers, per-client rate limiting, bearer token
//! authentication and role checks) before it reaches the business handlers.
//! Serves either for the binary or for the integration tests.

#![deny(missing_docs)]

mod admission;
mod auth;
mod cors;
mod error;
mod health;
mod rate_limit;
mod recovery;
mod role;
mod security_headers;

use std::{net::SocketAddr, sync::Arc};

use anyhow::anyhow;
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clock::SystemClock;
use config::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use admission::{Admission, Routes};
pub use auth::{AuthLayer, Claims, Identity, JwtVerifier, Role, TokenClaims, TokenVerifier, VerifyError};
pub use error::AdmissionError;

/// Configuration for serving hrgate.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to.
    pub listen_address: SocketAddr,
    /// The deserialized hrgate TOML configuration.
    pub config: Config,
    /// The business routes, grouped by the gates they need.
    pub routes: Routes,
    /// Stops the server gracefully, together with the rate limit sweeper and the
    /// separate health listener, once cancelled.
    pub shutdown: CancellationToken,
}

/// Starts and runs the hrgate server until `shutdown` is cancelled.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        routes,
        shutdown,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let admission = Admission::from_config(&config.server, Arc::new(SystemClock))?;
    let app = admission.compose(routes)?;

    // Cancelled on every return path, early errors included.
    let background = shutdown.child_token();
    let _background_guard = background.clone().drop_guard();

    let sweeper = admission
        .rate_limits()
        .map(|registry| registry.spawn_sweeper(background.clone()));

    let health = &config.server.health;

    if health.enabled
        && let Some(listen) = health.listen
    {
        let tls = config.server.tls.clone();
        let health = health.clone();
        let shutdown = background.clone();

        tokio::spawn(async move {
            if let Err(e) = health::bind_health_endpoint(listen, tls, health, shutdown).await {
                log::error!("{e}");
            }
        });
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    let result = match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            let handle = Handle::new();

            tokio::spawn({
                let handle = handle.clone();
                let shutdown = shutdown.clone();

                async move {
                    shutdown.cancelled().await;
                    handle.graceful_shutdown(None);
                }
            });

            log::info!("hrgate listening on https://{listen_address}");

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .handle(handle)
                .serve(make_service)
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))
        }
        None => {
            log::info!("hrgate listening on http://{listen_address}");

            axum::serve(listener, make_service)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))
        }
    };

    background.cancel();

    if let Some(sweeper) = sweeper
        && let Err(e) = sweeper.await
    {
        log::error!("Rate limit sweeper failed: {e}");
    }

    log::info!("hrgate stopped");

    result
}
