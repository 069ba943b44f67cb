use std::path::PathBuf;

use thiserror::Error;

use crate::tile::CacheKind;

/// Errors returned by a [`TileFetcher`](crate::io::TileFetcher).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Upstream answered 2xx with no body
    #[error("empty body from {url}")]
    EmptyBody { url: String },
}

/// Errors raised by the on-disk tile cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The entry does not exist
    #[error("cache entry not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The cache medium could not be read or written
    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while turning geometry data into a raster.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The geometry payload could not be parsed
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The rendering extent or output size is unusable
    #[error("invalid render target: {0}")]
    InvalidTarget(String),
}

/// Errors that can occur while producing an offroad tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// Tile coordinates outside `0 <= x, y < 2^z`
    #[error("tile {z}/{x}/{y} is out of range")]
    OutOfRange { z: u8, x: u32, y: u32 },

    /// A raw input could not be fetched from its upstream source
    #[error("failed to fetch {kind} input from {url}: {reason}")]
    FetchFailed {
        kind: CacheKind,
        url: String,
        reason: FetchError,
    },

    /// Disk cache failure
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The heatmap bytes are not a decodable image
    #[error("failed to decode tile: {message}")]
    Decode { message: String },

    /// The composited raster could not be encoded
    #[error("failed to encode tile: {message}")]
    Encode { message: String },

    /// Geometry rendering failed or produced an unusable raster
    #[error("failed to render mask: {message}")]
    Render { message: String },

    /// Heatmap raster and mask are not the same size
    #[error(
        "dimension mismatch: raster is {}x{}, mask is {}x{}",
        raster.0, raster.1, mask.0, mask.1
    )]
    DimensionMismatch {
        raster: (u32, u32),
        mask: (u32, u32),
    },

    /// A blocking build task panicked or was cancelled
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<RenderError> for TileError {
    fn from(err: RenderError) -> Self {
        TileError::Render {
            message: err.to_string(),
        }
    }
}
