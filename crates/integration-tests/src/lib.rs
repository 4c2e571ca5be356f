//! Harness for driving a real hrgate server over HTTP.

#![allow(clippy::panic)]

pub mod routes;
pub mod tokens;

use std::{net::SocketAddr, time::Duration};

use config::Config;
use server::{Routes, ServeConfig};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

pub use tokens::{TEST_SECRET, TokenBuilder, token};

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path).send().await.unwrap()
    }

    /// Send a GET request with `Authorization: Bearer <token>`
    pub async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path)
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Start building a request to the given path
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }
}

/// Builder for a [`TestServer`]
pub struct TestServerBuilder {
    routes: Routes,
}

impl TestServerBuilder {
    /// Serve these routes instead of [`routes::test_routes`]
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Start the server with the given TOML configuration.
    ///
    /// Unless the configuration has its own `[server.auth]` section, tokens are
    /// verified with [`TEST_SECRET`] and HS256.
    pub async fn build(self, config_toml: &str) -> TestServer {
        let config_toml = if config_toml.contains("[server.auth]") {
            config_toml.to_string()
        } else {
            format!("[server.auth]\nsecret = \"{TEST_SECRET}\"\n\n{config_toml}")
        };

        let config: Config = toml::from_str(&config_toml).unwrap();
        config.validate().unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            routes: self.routes,
            shutdown: shutdown.clone(),
        };

        // Drop the listener so the server can bind to the address
        drop(listener);

        let handle = tokio::spawn(server::serve(serve_config));

        // Wait until the server accepts connections. Probing over HTTP would spend rate limit tokens.
        let mut retries = 50;

        while tokio::net::TcpStream::connect(address).await.is_err() {
            if handle.is_finished() {
                let result = handle.await.unwrap();
                panic!("Server failed to start: {result:?}");
            }

            retries -= 1;
            assert!(retries > 0, "Server did not start listening on {address}");

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            shutdown,
            handle,
        }
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// A server with the default [`routes::test_routes`]
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder {
            routes: routes::test_routes(),
        }
    }

    /// Cancel the server and wait for it to stop
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.handle.await?
    }
}
