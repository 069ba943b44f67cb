//! Router configuration for the offroad tile server.
//!
//! This module defines the HTTP routes and applies middleware for CORS,
//! request timeouts and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                         - Health check
//! /offroad/{z}/{x}/{y}.png        - Composited tile
//! ```
//!
//! # Example
//!
//! ```ignore
//! use offroad_tiles::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(pipeline, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, offroad_tile_handler, AppState, DEFAULT_CACHE_MAX_AGE};
use crate::geometry::GeometryRenderer;
use crate::io::TileFetcher;
use crate::tile::{Codec, TilePipeline};

/// Default time allowed for a single request, including a cold build.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Requests running longer than this are answered with 408
    pub request_timeout: Duration,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is one day
    /// - Tracing is enabled
    /// - Requests time out after 60 seconds
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - The health check and tile routes
/// - CORS configuration
/// - A per-request timeout
/// - Request tracing (optional)
pub fn create_router<F, R, C>(pipeline: TilePipeline<F, R, C>, config: RouterConfig) -> Router
where
    F: TileFetcher + 'static,
    R: GeometryRenderer + 'static,
    C: Codec + 'static,
{
    let app_state = AppState::new(pipeline).with_cache_max_age(config.cache_max_age);
    let cors = build_cors_layer(&config);

    // {filename} captures "{y}.png"; the handler parses it.
    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/offroad/{z}/{x}/{filename}",
            get(offroad_tile_handler::<F, R, C>),
        )
        .with_state(app_state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
