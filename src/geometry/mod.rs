//! Road geometry rendering.
//!
//! The mask stage only needs "draw these roads into a raster covering this
//! extent". That capability is the [`GeometryRenderer`] trait so the tile
//! pipeline can be driven by in-memory fakes in tests, and so no rendering
//! state is shared between concurrent requests: a renderer is a plain value,
//! built once from configuration and called with everything it needs.
//!
//! ```text
//! GeoJSON bytes ──► parse_paths ──► lon/lat ──► EPSG:3857 ──► pixel space ──► strokes
//! ```

mod geojson;
mod renderer;

pub use geojson::{parse_paths, Path};
pub use renderer::{LineRenderer, DEFAULT_LINE_WIDTH, ROAD_COLOR};

use crate::error::RenderError;
use crate::tile::{Extent, RasterBuffer};

/// Renders vector geometry to an RGBA raster.
///
/// Geometry must be painted opaque; everything else must have alpha 0.
pub trait GeometryRenderer: Send + Sync {
    /// Render `geometry` so that `extent` exactly covers a `width`×`height`
    /// raster.
    fn render(
        &self,
        geometry: &[u8],
        extent: &Extent,
        width: u32,
        height: u32,
    ) -> Result<RasterBuffer, RenderError>;
}
