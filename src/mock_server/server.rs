//! Mock Klocwork API server.
//!
//! Provides an axum-based HTTP server that simulates the `/review/api`
//! endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers;
use super::state::MockState;
use crate::Credentials;

/// Token handed out when the state does not require a specific one.
const DEFAULT_TOKEN: &str = "mock-token";

/// A mock Klocwork server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a stateful implementation of the review API.
pub struct MockServer {
    /// Socket address the server is listening on.
    address: SocketAddr,
    /// Token clients must present.
    token: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_scenario()).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    ///
    /// A state without a required token is given [`DEFAULT_TOKEN`].
    pub async fn with_state(mut state: MockState) -> Self {
        let token = state
            .required_token
            .get_or_insert_with(|| DEFAULT_TOKEN.to_string())
            .clone();
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let address = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            address,
            token,
            handle,
            state: shared_state,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL of the mock server, without the API path.
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Credentials that log `user` in to this server.
    pub fn credentials(&self, user: &str) -> Credentials {
        Credentials {
            host: self.address.ip().to_string(),
            port: self.address.port().to_string(),
            user: user.to_string(),
            token: self.token.clone(),
        }
    }

    /// A token store line for `user`, in `host;port;user;token` form.
    pub fn ltoken_line(&self, user: &str) -> String {
        format!(
            "{};{};{};{}",
            self.address.ip(),
            self.address.port(),
            user,
            self.token
        )
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            .route("/review/api", post(handlers::api))
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
