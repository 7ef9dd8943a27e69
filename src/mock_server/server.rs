//! Mock helpdesk API server.
//!
//! Provides an axum-based HTTP server that exposes a [`MockEngine`] over
//! REST routes shaped like the real API's.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::handlers::{self, AppState};
use crate::config::EngineConfig;
use crate::engine::MockEngine;
use crate::error::{MockError, Result};
use crate::fixtures::Fixtures;

/// A mock helpdesk API server for testing.
///
/// The server runs in the background; its engine's base URL is rewritten to
/// the bound address so record `url`s and `next_page` links are reachable.
pub struct MockServer {
    /// API base URL, e.g. `http://127.0.0.1:4123/api/v2/`.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    engine: Arc<MockEngine>,
}

impl MockServer {
    /// Start a new mock server with the default fixture scenario.
    ///
    /// The server listens on a random available port and returns immediately.
    ///
    /// # Errors
    ///
    /// Fails if no port can be bound.
    pub async fn start() -> Result<Self> {
        let server = Self::start_empty().await?;
        Fixtures::default_scenario(server.engine())?;
        Ok(server)
    }

    /// Start a mock server holding only the current user.
    ///
    /// # Errors
    ///
    /// Fails if no port can be bound.
    pub async fn start_empty() -> Result<Self> {
        Self::bind(0, EngineConfig::default()).await
    }

    /// Start a mock server on `port` (0 for any) with the given configuration.
    ///
    /// Only the path of `config`'s base URL is kept; scheme and host become
    /// the bound address.
    ///
    /// # Errors
    ///
    /// Fails if the port cannot be bound.
    pub async fn bind(port: u16, config: EngineConfig) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| MockError::ConfigInvalid(format!("cannot bind port {port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MockError::ConfigInvalid(format!("no local address: {e}")))?;

        let base_path = config.api_url()?.path().to_string();
        let url = format!("http://{addr}{base_path}");
        let engine = Arc::new(MockEngine::new(config.with_base_url(&url)?)?);
        let app = Self::create_router(engine.clone(), base_path);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        tracing::info!(%url, "mock server listening");
        Ok(Self {
            url,
            handle,
            engine,
        })
    }

    /// Get the API base URL of the mock server.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The engine behind the server, for seeding and inspection.
    pub fn engine(&self) -> &MockEngine {
        &self.engine
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the axum router: a health check plus one catch-all API handler.
    pub fn create_router(engine: Arc<MockEngine>, base_path: String) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            .fallback(handlers::dispatch)
            .with_state(AppState { engine, base_path })
    }
}
