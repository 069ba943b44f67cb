//! HTTP request handlers for the offroad tile API.
//!
//! # Endpoints
//!
//! - `GET /offroad/{z}/{x}/{y}.png` - Serve a composited tile
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{CacheError, TileError};
use crate::geometry::GeometryRenderer;
use crate::io::TileFetcher;
use crate::tile::{Codec, PngCodec, TileAddress, TilePipeline};

/// Default Cache-Control max-age in seconds (one day).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86400;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile pipeline.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F, R, C = PngCodec> {
    /// The pipeline producing offroad tiles
    pub pipeline: Arc<TilePipeline<F, R, C>>,

    /// Cache-Control max-age in seconds for served tiles
    pub cache_max_age: u32,
}

impl<F, R, C> AppState<F, R, C> {
    /// Create a new application state with the given pipeline.
    pub fn new(pipeline: TilePipeline<F, R, C>) -> Self {
        Self::with_shared_pipeline(Arc::new(pipeline))
    }

    /// Create a new application state around an already shared pipeline.
    pub fn with_shared_pipeline(pipeline: Arc<TilePipeline<F, R, C>>) -> Self {
        Self {
            pipeline,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }
}

impl<F, R, C> Clone for AppState<F, R, C> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/offroad/{z}/{x}/{filename}` where filename is `{y}.png`.
/// Segments are kept as strings so that any malformed path maps to a 404
/// instead of the extractor's default 400.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub z: String,
    pub x: String,
    pub filename: String,
}

impl TilePathParams {
    /// Parse and validate the tile address.
    pub fn tile(&self) -> Result<TileAddress, HandlerError> {
        let invalid = || HandlerError::InvalidPath(format!("{}/{}/{}", self.z, self.x, self.filename));

        let y = self.filename.strip_suffix(".png").ok_or_else(invalid)?;
        let z: u8 = self.z.parse().map_err(|_| invalid())?;
        let x: u32 = self.x.parse().map_err(|_| invalid())?;
        let y: u32 = y.parse().map_err(|_| invalid())?;

        Ok(TileAddress::new(z, x, y)?)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "upstream_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// - Out-of-range tiles are 404 (logged at DEBUG)
/// - Upstream fetch failures are 502
/// - Everything else is 500 (logged at ERROR)
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::OutOfRange { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::Cache(CacheError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            TileError::FetchFailed { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            TileError::Cache(CacheError::Io { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "cache_error")
            }
            TileError::Decode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            TileError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            TileError::Render { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
            TileError::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            TileError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

/// Errors a handler can return.
#[derive(Debug)]
pub enum HandlerError {
    /// The request path does not name a tile
    InvalidPath(String),

    /// The pipeline failed
    Tile(TileError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::InvalidPath(path) => error_response(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Not a tile path: {}", path),
            ),
            HandlerError::Tile(err) => err.into_response(),
        }
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError::Tile(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle offroad tile requests.
///
/// # Endpoint
///
/// `GET /offroad/{z}/{x}/{y}.png`
///
/// # Response
///
/// - `200 OK`: PNG tile with `Content-Type: image/png`
/// - `404 Not Found`: Malformed path or tile outside `0 <= x, y < 2^z`
/// - `502 Bad Gateway`: An upstream input could not be fetched
/// - `500 Internal Server Error`: Processing or cache error
///
/// # Headers
///
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit: true|false`
pub async fn offroad_tile_handler<F, R, C>(
    State(state): State<AppState<F, R, C>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, HandlerError>
where
    F: TileFetcher + 'static,
    R: GeometryRenderer + 'static,
    C: Codec + 'static,
{
    let tile = params.tile()?;
    let response = state.pipeline.get_or_build(&tile).await?;

    let http_response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .header("X-Tile-Cache-Hit", response.cache_hit.to_string())
        .body(Body::from(response.data))
        .unwrap();

    Ok(http_response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
