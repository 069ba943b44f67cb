//! Occlusion mask derived from rendered road geometry.
//!
//! The rendered raster has opaque pixels where a road is drawn. The mask is
//! the inverted, normalised alpha channel of that raster:
//!
//! ```text
//! mask = 1.0 - alpha / 255.0
//!
//! alpha 255 (road)    → 0.0   heatmap removed
//! alpha   0 (no road) → 1.0   heatmap untouched
//! ```

use tracing::trace;

use crate::error::TileError;
use crate::geometry::GeometryRenderer;

use super::address::GeoBounds;
use super::raster::{Mask, RasterBuffer, TILE_SIZE};

/// Builds per-tile masks with an injected [`GeometryRenderer`].
#[derive(Debug, Clone)]
pub struct MaskBuilder<R> {
    renderer: R,
    size: u32,
}

impl<R: GeometryRenderer> MaskBuilder<R> {
    /// Create a builder producing [`TILE_SIZE`]×[`TILE_SIZE`] masks.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            size: TILE_SIZE,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Render `geometry` over `bounds` and invert its alpha into a mask.
    ///
    /// Fails with [`TileError::Render`] if the renderer fails or returns a
    /// raster of the wrong size.
    pub fn build(&self, geometry: &[u8], bounds: &GeoBounds) -> Result<Mask, TileError> {
        let extent = bounds.to_extent();
        trace!(?extent, "rendering road geometry");

        let raster = self
            .renderer
            .render(geometry, &extent, self.size, self.size)?;

        if raster.dimensions() != (self.size, self.size) {
            return Err(TileError::Render {
                message: format!(
                    "renderer returned {}x{}, expected {}x{}",
                    raster.width(),
                    raster.height(),
                    self.size,
                    self.size
                ),
            });
        }

        Ok(mask_from_alpha(&raster))
    }
}

/// Invert a raster's normalised alpha channel.
pub fn mask_from_alpha(raster: &RasterBuffer) -> Mask {
    let weights = raster
        .alpha()
        .map(|a| 1.0 - f32::from(a) / 255.0)
        .collect();

    Mask::from_normalized(raster.width(), raster.height(), weights)
}
