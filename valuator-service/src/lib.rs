//! Valuator Service Library
//!
//! Estimates the fair-value range of a private company from a handful of
//! financial inputs and serves the results over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 valuator (Rust Service)                  │
//! │                          :5000                           │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
//! │  │  Valuation   │  │  Narrative   │  │  Record      │    │
//! │  │  Engine      │  │  (Azure LLM) │  │  Store       │    │
//! │  └──────────────┘  └──────────────┘  └──────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is pure and synchronous. The narrative call is optional: when
//! it is unconfigured or fails, results carry a fixed fallback text.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod narrative;
pub mod request;
pub mod routes;
pub mod store;
pub mod valuation;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use valuator_common::{Config, ServerConfig};

pub use error::ServiceError;
pub use narrative::{AzureOpenAiNarrator, NarrativeGenerator, FALLBACK_ANALYSIS};
pub use request::ValuationRequest;
pub use routes::{build_router, AppState};
pub use store::{ValuationRecord, ValuationStore, ValuationUpdate};
pub use valuation::{ValuationEngine, ValuationError, ValuationResult};

/// Router with the server-level layers: permissive CORS, body size limit,
/// and request timeout.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    build_router(state)
        .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors)
}

/// Main valuation service
pub struct ValuatorService {
    config: Config,
    state: AppState,
}

impl ValuatorService {
    /// Create a new service from configuration
    pub fn new(config: Config) -> Self {
        let state = AppState::from_config(&config);
        Self { config, state }
    }

    /// Bind and serve until the process receives Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server
            .bind_address()
            .parse()
            .with_context(|| format!("Invalid bind address {}", self.config.server.bind_address()))?;

        if !self.state.narrator.is_configured() {
            tracing::warn!(
                "Narrative generator not configured; valuations will use the fallback analysis"
            );
        }

        let app = app(self.state, &self.config.server);

        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
