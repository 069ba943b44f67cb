//! Raster image codec.
//!
//! Heatmap tiles arrive as encoded images and composited tiles leave as PNG.
//! Whatever the upstream colour type (palette, grey, RGB), decoded rasters
//! are always expanded to RGBA8 so the compositor only deals with one layout.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader};

use crate::error::TileError;

use super::raster::RasterBuffer;

/// Decodes input tiles and encodes output tiles.
pub trait Codec: Send + Sync {
    /// Decode image bytes into an RGBA raster.
    fn decode(&self, data: &[u8]) -> Result<RasterBuffer, TileError>;

    /// Encode an RGBA raster, preserving the alpha channel.
    fn encode(&self, raster: &RasterBuffer) -> Result<Bytes, TileError>;
}

// =============================================================================
// PNG Codec
// =============================================================================

/// PNG output codec. Decoding sniffs the input format from its magic bytes.
#[derive(Debug, Clone, Default)]
pub struct PngCodec;

impl PngCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for PngCodec {
    fn decode(&self, data: &[u8]) -> Result<RasterBuffer, TileError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TileError::Decode {
                message: e.to_string(),
            })?;

        let img = reader.decode().map_err(|e| TileError::Decode {
            message: e.to_string(),
        })?;

        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        RasterBuffer::from_raw(width, height, rgba.into_raw()).ok_or_else(|| TileError::Decode {
            message: format!("decoded buffer does not match {}x{}", width, height),
        })
    }

    fn encode(&self, raster: &RasterBuffer) -> Result<Bytes, TileError> {
        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(
                raster.as_raw(),
                raster.width(),
                raster.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| TileError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}
