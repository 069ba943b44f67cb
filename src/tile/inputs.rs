//! Raw input acquisition: heatmap raster and road geometry.
//!
//! Each raw kind is looked up in the disk cache first and only fetched from
//! its upstream source on a miss. Fetched bodies are written once and then
//! served from disk forever. Failures are never cached, so the next request
//! for the same tile fetches again.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{FetchError, TileError};
use crate::io::{DiskCache, TileFetcher, WriteOutcome};

use super::address::{CacheKind, TileAddress};

/// The raw bytes needed to build one output tile.
#[derive(Debug, Clone)]
pub struct TileInputs {
    /// Encoded heatmap raster
    pub heatmap: Bytes,

    /// GeoJSON road geometry
    pub geometry: Bytes,
}

/// Ensures both raw inputs of a tile are present in the cache.
pub struct InputAcquirer<F> {
    cache: DiskCache,
    fetcher: F,
    heatmap_template: String,
    geometry_template: String,
}

impl<F: TileFetcher> InputAcquirer<F> {
    /// Create an acquirer.
    ///
    /// Templates contain `{z}`, `{x}` and `{y}` placeholders.
    pub fn new(
        cache: DiskCache,
        fetcher: F,
        heatmap_template: impl Into<String>,
        geometry_template: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            heatmap_template: heatmap_template.into(),
            geometry_template: geometry_template.into(),
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Make sure both raw inputs are cached and return their bytes.
    ///
    /// The heatmap and the geometry are acquired concurrently; the first
    /// failure wins.
    pub async fn ensure(&self, tile: &TileAddress) -> Result<TileInputs, TileError> {
        let (heatmap, geometry) = tokio::try_join!(
            self.ensure_kind(CacheKind::Heatmap, tile),
            self.ensure_kind(CacheKind::Geometry, tile),
        )?;

        Ok(TileInputs { heatmap, geometry })
    }

    /// Make sure one raw input is cached and return its bytes.
    pub async fn ensure_kind(
        &self,
        kind: CacheKind,
        tile: &TileAddress,
    ) -> Result<Bytes, TileError> {
        let template = match kind {
            CacheKind::Heatmap => &self.heatmap_template,
            CacheKind::Geometry => &self.geometry_template,
            CacheKind::Offroad => {
                return Err(TileError::Internal {
                    message: "composited tiles have no upstream source".to_string(),
                })
            }
        };

        let path = self.cache.path_for(kind, tile);
        if self.cache.exists(&path).await {
            debug!(tile = %tile, kind = %kind, "input cache hit");
            return Ok(self.cache.read(&path).await?);
        }

        let url = tile.url(template);
        let data = self
            .fetcher
            .fetch(&url)
            .await
            .and_then(|data| {
                if data.is_empty() {
                    Err(FetchError::EmptyBody { url: url.clone() })
                } else {
                    Ok(data)
                }
            })
            .map_err(|reason| {
                warn!(tile = %tile, kind = %kind, url = %url, error = %reason, "input fetch failed");
                TileError::FetchFailed {
                    kind,
                    url: url.clone(),
                    reason,
                }
            })?;

        match self.cache.write(&path, &data).await? {
            WriteOutcome::Written => {
                debug!(tile = %tile, kind = %kind, bytes = data.len(), "input cached")
            }
            WriteOutcome::AlreadyPresent => {
                debug!(tile = %tile, kind = %kind, "input cached concurrently")
            }
        }

        Ok(data)
    }
}
