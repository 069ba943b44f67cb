//! Tile layer.
//!
//! This module turns a slippy-map tile address into a composited offroad
//! tile: a heatmap raster with every pixel covered by a road made
//! transparent.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TilePipeline               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ InputAcquirer│  │   MaskBuilder   │  │
//! │  │ (heatmap +   │  │ (roads → mask)  │  │
//! │  │  geometry)   │  ├─────────────────┤  │
//! │  │              │  │   Compositor    │  │
//! │  │              │  │ (alpha × mask)  │  │
//! │  └──────┬───────┘  └─────────────────┘  │
//! └─────────┼───────────────────────────────┘
//!           │
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │     DiskCache  +  TileFetcher           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileAddress`]: validated `z/x/y` coordinate with geographic bounds
//! - [`InputAcquirer`]: fetch-once access to the raw heatmap and geometry
//! - [`MaskBuilder`]: renders roads and inverts their alpha into a [`Mask`]
//! - [`compositor::apply`]: multiplies heatmap alpha by the mask
//! - [`PngCodec`]: decodes inputs and encodes output tiles
//! - [`TilePipeline`]: the whole get-or-build flow, memoized on disk
//! - [`Seeder`]: pre-populates the cache over an area
//!
//! # Example
//!
//! ```
//! use offroad_tiles::tile::{CacheKind, TileAddress};
//!
//! let tile = TileAddress::new(12, 655, 1466).unwrap();
//! let bounds = tile.bounds();
//! assert!(bounds.west < bounds.east && bounds.south < bounds.north);
//!
//! assert_eq!(tile.url("https://tiles.example.com/{z}/{x}/{y}.png"),
//!            "https://tiles.example.com/12/655/1466.png");
//! assert_eq!(CacheKind::Offroad.dir_name(), "offroad");
//! ```

mod address;
mod codec;
pub mod compositor;
mod inputs;
mod mask;
mod pipeline;
mod raster;
mod seed;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{
    cache_path, count_tiles_in_bounds, lon_lat_to_mercator, tiles_in_bounds, CacheKind, Extent,
    GeoBounds, TileAddress, EARTH_RADIUS, MAX_LATITUDE, MAX_ZOOM,
};
pub use codec::{Codec, PngCodec};
pub use inputs::{InputAcquirer, TileInputs};
pub use mask::{mask_from_alpha, MaskBuilder};
pub use pipeline::{MissingInputPolicy, TilePipeline, TileResponse};
pub use raster::{Mask, RasterBuffer, ALPHA, CHANNELS, TILE_SIZE};
pub use seed::{SeedMode, SeedReport, Seeder, DEFAULT_SEED_CONCURRENCY};
