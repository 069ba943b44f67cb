//! In-memory pixel buffers shared by the mask and compositing stages.

/// Width and height of every tile handled by the pipeline.
pub const TILE_SIZE: u32 = 256;

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Index of the alpha channel within a pixel.
pub const ALPHA: usize = 3;

// =============================================================================
// Raster Buffer
// =============================================================================

/// A row-major RGBA8 raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Create a fully transparent black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Create a raster with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let p = &self.pixels[i..i + CHANNELS];
        Some([p[0], p[1], p[2], p[3]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Iterate over the alpha channel in pixel order.
    pub fn alpha(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels.chunks_exact(CHANNELS).map(|p| p[ALPHA])
    }

    pub(crate) fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.pixels.chunks_exact_mut(CHANNELS)
    }
}

// =============================================================================
// Mask
// =============================================================================

/// Per-pixel occlusion weights in `[0, 1]`, aligned with a [`RasterBuffer`].
///
/// `0.0` removes the heatmap at that pixel, `1.0` keeps it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl Mask {
    /// A mask that keeps every pixel.
    pub fn open(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            weights: vec![1.0; width as usize * height as usize],
        }
    }

    /// Build a mask from raw weights. Returns `None` if the length does not
    /// match or a weight falls outside `[0, 1]`.
    pub fn from_weights(width: u32, height: u32, weights: Vec<f32>) -> Option<Self> {
        if weights.len() != width as usize * height as usize {
            return None;
        }
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return None;
        }
        Some(Self {
            width,
            height,
            weights,
        })
    }

    /// Weights already known to be in range and of the right length.
    pub(crate) fn from_normalized(width: u32, height: u32, weights: Vec<f32>) -> Self {
        debug_assert_eq!(weights.len(), width as usize * height as usize);
        Self {
            width,
            height,
            weights,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight at `(x, y)`, or `None` outside the mask.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.weights[y as usize * self.width as usize + x as usize])
    }
}
