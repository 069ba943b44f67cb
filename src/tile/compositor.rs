//! Alpha-only compositing of a heatmap raster with an occlusion mask.

use crate::error::TileError;

use super::raster::{Mask, RasterBuffer, ALPHA};

/// Multiply the heatmap alpha channel by `mask`, pixel for pixel.
///
/// `out.alpha = round(in.alpha * mask)`; red, green and blue are left as they
/// are. Fails with [`TileError::DimensionMismatch`] if the sizes differ.
pub fn apply(mut heatmap: RasterBuffer, mask: &Mask) -> Result<RasterBuffer, TileError> {
    if heatmap.dimensions() != mask.dimensions() {
        return Err(TileError::DimensionMismatch {
            raster: heatmap.dimensions(),
            mask: mask.dimensions(),
        });
    }

    for (pixel, &weight) in heatmap.pixels_mut().zip(mask.weights()) {
        let alpha = (f32::from(pixel[ALPHA]) * weight).round();
        pixel[ALPHA] = alpha.clamp(0.0, 255.0) as u8;
    }

    Ok(heatmap)
}
