//! Tile pipeline: cache lookup, input acquisition and compositing.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          TilePipeline                             │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                     get_or_build()                          │  │
//! │  │  1. Output cache hit? → return       4. Build mask          │  │
//! │  │  2. Ensure raw inputs                5. Composite           │  │
//! │  │  3. Decode heatmap                   6. Encode, store       │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! │         │                      │                       │          │
//! │         ▼                      ▼                       ▼          │
//! │  ┌──────────────┐     ┌─────────────────┐     ┌───────────────┐   │
//! │  │ InputAcquirer│     │   MaskBuilder   │     │     Codec     │   │
//! │  │ (DiskCache + │     │ (GeometryRender │     │    (PNG)      │   │
//! │  │  TileFetcher)│     │   er)           │     │               │   │
//! │  └──────────────┘     └─────────────────┘     └───────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 3 to 6 are CPU-bound and run on the blocking thread pool. A failure
//! at any step aborts the build before anything is written under the output
//! kind.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{CacheError, TileError};
use crate::geometry::GeometryRenderer;
use crate::io::{DiskCache, TileFetcher, WriteOutcome};

use super::address::{CacheKind, TileAddress};
use super::codec::{Codec, PngCodec};
use super::compositor;
use super::inputs::InputAcquirer;
use super::mask::MaskBuilder;
use super::raster::{RasterBuffer, TILE_SIZE};

// =============================================================================
// Missing Input Policy
// =============================================================================

/// What to do when the heatmap for a tile cannot be fetched.
///
/// Geometry failures are always hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingInputPolicy {
    /// Fail the request
    #[default]
    Fail,

    /// Treat the heatmap as fully transparent and serve a blank tile.
    /// Blank tiles are not written to the output cache.
    BlankHeatmap,
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile pipeline.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded PNG tile
    pub data: Bytes,

    /// Whether the tile was served from the output cache
    pub cache_hit: bool,
}

/// A freshly composited tile.
///
/// Tiles built from a blank stand-in heatmap are served but never stored,
/// so the real heatmap is fetched again on the next request.
struct BuiltTile {
    data: Bytes,
    blank_heatmap: bool,
}

// =============================================================================
// Tile Pipeline
// =============================================================================

/// Produces composited offroad tiles, memoized on disk.
///
/// # Type Parameters
///
/// * `F` - Upstream fetcher for raw inputs
/// * `R` - Geometry renderer used for masks
/// * `C` - Raster codec, PNG by default
///
/// # Example
///
/// ```ignore
/// use offroad_tiles::geometry::LineRenderer;
/// use offroad_tiles::io::{DiskCache, HttpTileFetcher};
/// use offroad_tiles::tile::{InputAcquirer, TileAddress, TilePipeline};
///
/// let inputs = InputAcquirer::new(
///     DiskCache::new("./tiles"),
///     HttpTileFetcher::new()?,
///     "https://heatmap.example.com/{z}/{x}/{y}.png",
///     "https://roads.example.com/{z}/{x}/{y}.json",
/// );
/// let pipeline = TilePipeline::new(inputs, LineRenderer::new());
///
/// let tile = TileAddress::new(12, 655, 1466)?;
/// let response = pipeline.get_or_build(&tile).await?;
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct TilePipeline<F, R, C = PngCodec> {
    inputs: InputAcquirer<F>,
    masks: Arc<MaskBuilder<R>>,
    codec: Arc<C>,
    policy: MissingInputPolicy,
}

impl<F, R> TilePipeline<F, R, PngCodec>
where
    F: TileFetcher,
    R: GeometryRenderer + 'static,
{
    /// Create a pipeline producing PNG tiles.
    pub fn new(inputs: InputAcquirer<F>, renderer: R) -> Self {
        Self::with_codec(inputs, renderer, PngCodec::new())
    }
}

impl<F, R, C> TilePipeline<F, R, C>
where
    F: TileFetcher,
    R: GeometryRenderer + 'static,
    C: Codec + 'static,
{
    /// Create a pipeline with a custom codec.
    pub fn with_codec(inputs: InputAcquirer<F>, renderer: R, codec: C) -> Self {
        Self {
            inputs,
            masks: Arc::new(MaskBuilder::new(renderer)),
            codec: Arc::new(codec),
            policy: MissingInputPolicy::default(),
        }
    }

    /// Set the policy applied when the heatmap cannot be fetched.
    pub fn with_policy(mut self, policy: MissingInputPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MissingInputPolicy {
        self.policy
    }

    pub fn inputs(&self) -> &InputAcquirer<F> {
        &self.inputs
    }

    pub fn cache(&self) -> &DiskCache {
        self.inputs.cache()
    }

    /// Return the composited tile, building and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A raw input cannot be fetched ([`TileError::FetchFailed`])
    /// - The heatmap cannot be decoded or the output encoded
    /// - The geometry cannot be rendered
    /// - The heatmap and mask sizes differ
    /// - The cache cannot be read or written
    pub async fn get_or_build(&self, tile: &TileAddress) -> Result<TileResponse, TileError> {
        let path = self.cache().path_for(CacheKind::Offroad, tile);

        if self.cache().exists(&path).await {
            match self.cache().read(&path).await {
                Ok(data) => {
                    debug!(tile = %tile, bytes = data.len(), "output cache hit");
                    return Ok(TileResponse {
                        data,
                        cache_hit: true,
                    });
                }
                // Removed between the check and the read; rebuild.
                Err(CacheError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let built = self.compose(tile).await?;
        let data = built.data;

        if built.blank_heatmap {
            debug!(tile = %tile, "blank tile served, not stored");
        } else {
            match self.cache().write(&path, &data).await? {
                WriteOutcome::Written => info!(tile = %tile, bytes = data.len(), "tile built"),
                WriteOutcome::AlreadyPresent => {
                    debug!(tile = %tile, "tile built concurrently, keeping stored copy")
                }
            }
        }

        Ok(TileResponse {
            data,
            cache_hit: false,
        })
    }

    /// Build the composited tile without touching the output cache.
    pub async fn build(&self, tile: &TileAddress) -> Result<Bytes, TileError> {
        self.compose(tile).await.map(|built| built.data)
    }

    async fn compose(&self, tile: &TileAddress) -> Result<BuiltTile, TileError> {
        let (heatmap, geometry) = self.acquire(tile).await?;
        let blank_heatmap = heatmap.is_none();

        let masks = Arc::clone(&self.masks);
        let codec = Arc::clone(&self.codec);
        let bounds = tile.bounds();

        let data = tokio::task::spawn_blocking(move || {
            let raster = match heatmap {
                Some(data) => codec.decode(&data)?,
                None => RasterBuffer::new(TILE_SIZE, TILE_SIZE),
            };
            let mask = masks.build(&geometry, &bounds)?;
            let composited = compositor::apply(raster, &mask)?;
            codec.encode(&composited)
        })
        .await
        .map_err(|e| TileError::Internal {
            message: format!("tile build task failed: {}", e),
        })??;

        Ok(BuiltTile {
            data,
            blank_heatmap,
        })
    }

    /// Acquire the raw inputs according to the missing input policy.
    ///
    /// A `None` heatmap stands for a fully transparent one.
    async fn acquire(&self, tile: &TileAddress) -> Result<(Option<Bytes>, Bytes), TileError> {
        match self.policy {
            MissingInputPolicy::Fail => {
                let inputs = self.inputs.ensure(tile).await?;
                Ok((Some(inputs.heatmap), inputs.geometry))
            }
            MissingInputPolicy::BlankHeatmap => {
                let (heatmap, geometry) = tokio::join!(
                    self.inputs.ensure_kind(CacheKind::Heatmap, tile),
                    self.inputs.ensure_kind(CacheKind::Geometry, tile),
                );
                let geometry = geometry?;
                let heatmap = match heatmap {
                    Ok(data) => Some(data),
                    Err(TileError::FetchFailed { url, reason, .. }) => {
                        warn!(tile = %tile, url = %url, error = %reason, "heatmap missing, serving blank tile");
                        None
                    }
                    Err(e) => return Err(e),
                };
                Ok((heatmap, geometry))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
