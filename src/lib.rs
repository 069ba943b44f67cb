//! # Offroad Tiles
//!
//! A slippy-map tile server that serves a raster heatmap with every pixel
//! covered by a road made transparent, leaving only off-road activity.
//!
//! For each requested `z/x/y` tile the server fetches the heatmap tile and the
//! road geometry covering the same area, renders the roads, inverts their
//! coverage into a mask and multiplies the heatmap's alpha channel by it.
//! Raw inputs and finished tiles are cached on disk, write-once.
//!
//! ## Features
//!
//! - **Write-once disk cache**: atomic first-writer-wins storage, safe under
//!   concurrent requests for the same tile
//! - **Pluggable collaborators**: fetcher, geometry renderer and codec are traits
//! - **Cache seeding**: pre-build tiles over a lon/lat box and zoom range
//!
//! ## Architecture
//!
//! - [`tile`] - Tile addressing, masks, compositing and the tile pipeline
//! - [`geometry`] - GeoJSON parsing and road rasterization
//! - [`io`] - Disk cache and upstream fetcher
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use offroad_tiles::{
//!     create_router, DiskCache, HttpTileFetcher, InputAcquirer, LineRenderer, RouterConfig,
//!     TilePipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inputs = InputAcquirer::new(
//!         DiskCache::new("./tiles"),
//!         HttpTileFetcher::new()?,
//!         "https://heatmap.example.com/{z}/{x}/{y}.png",
//!         "https://roads.example.com/{z}/{x}/{y}.json",
//!     );
//!     let pipeline = TilePipeline::new(inputs, LineRenderer::new());
//!
//!     let router = create_router(pipeline, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, SeedConfig, ServeConfig, SourceArgs};
pub use error::{CacheError, FetchError, RenderError, TileError};
pub use geometry::{GeometryRenderer, LineRenderer};
pub use io::{DiskCache, HttpTileFetcher, TileFetcher, WriteOutcome};
pub use server::{
    create_router, health_handler, offroad_tile_handler, AppState, ErrorResponse, HealthResponse,
    RouterConfig, TilePathParams,
};
pub use tile::{
    Codec, GeoBounds, InputAcquirer, Mask, MaskBuilder, MissingInputPolicy, PngCodec,
    RasterBuffer, SeedMode, SeedReport, Seeder, TileAddress, TileInputs, TilePipeline,
    TileResponse, TILE_SIZE,
};
