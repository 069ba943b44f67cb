//! HTTP server layer for the offroad tile server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │              GET /offroad/{z}/{x}/{y}.png                       │
//! │                                                                 │
//! │  ┌───────────────────────────┐  ┌───────────────────────────┐   │
//! │  │         handlers          │  │          routes           │   │
//! │  │ (requests, error mapping) │  │ (CORS, timeout, tracing)  │   │
//! │  └───────────────────────────┘  └───────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, offroad_tile_handler, AppState, ErrorResponse, HandlerError, HealthResponse,
    TilePathParams, DEFAULT_CACHE_MAX_AGE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_REQUEST_TIMEOUT};
