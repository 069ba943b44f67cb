//! Road stroke rasterizer.
//!
//! [`LineRenderer`] draws every path of a GeoJSON document as an opaque
//! stroke on a transparent canvas. Strokes are built from one quad per
//! segment plus a disc at every vertex, which gives round joins and caps.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use crate::error::RenderError;
use crate::tile::{lon_lat_to_mercator, Extent, RasterBuffer};

use super::geojson::parse_paths;
use super::GeometryRenderer;

/// Default stroke width in pixels.
pub const DEFAULT_LINE_WIDTH: f32 = 4.0;

/// Opaque black, the colour roads are painted with.
pub const ROAD_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Segments are clipped to the canvas grown by this many pixels on each side
/// before drawing, so strokes ending just outside still cover the border.
const CLIP_MARGIN: f64 = 16.0;

/// Renders GeoJSON line work (EPSG:4326) into an RGBA raster.
#[derive(Debug, Clone)]
pub struct LineRenderer {
    line_width: f32,
    color: [u8; 4],
}

impl LineRenderer {
    /// Create a renderer with the default 4px black stroke.
    pub fn new() -> Self {
        Self::with_line_width(DEFAULT_LINE_WIDTH)
    }

    /// Create a renderer with a custom stroke width.
    pub fn with_line_width(line_width: f32) -> Self {
        Self {
            line_width,
            color: ROAD_COLOR,
        }
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    fn stroke(&self, canvas: &mut RgbaImage, a: (f64, f64), b: (f64, f64)) {
        let color = Rgba(self.color);
        let half = f64::from(self.line_width) / 2.0;
        let radius = half.round() as i32;

        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt();

        if len > f64::EPSILON {
            let (nx, ny) = (-dy / len * half, dx / len * half);
            let quad = [
                Point::new((a.0 + nx).round() as i32, (a.1 + ny).round() as i32),
                Point::new((b.0 + nx).round() as i32, (b.1 + ny).round() as i32),
                Point::new((b.0 - nx).round() as i32, (b.1 - ny).round() as i32),
                Point::new((a.0 - nx).round() as i32, (a.1 - ny).round() as i32),
            ];

            if quad[0] != quad[3] && quad[0] != quad[1] {
                draw_polygon_mut(canvas, &quad, color);
            } else {
                draw_line_segment_mut(
                    canvas,
                    (a.0 as f32, a.1 as f32),
                    (b.0 as f32, b.1 as f32),
                    color,
                );
            }
        }

        if radius >= 1 {
            for p in [a, b] {
                draw_filled_circle_mut(canvas, (p.0.round() as i32, p.1.round() as i32), radius, color);
            }
        } else if len <= f64::EPSILON {
            let (x, y) = (a.0.round(), a.1.round());
            if x >= 0.0 && y >= 0.0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

impl Default for LineRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryRenderer for LineRenderer {
    fn render(
        &self,
        geometry: &[u8],
        extent: &Extent,
        width: u32,
        height: u32,
    ) -> Result<RasterBuffer, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTarget(format!(
                "output size {}x{} is empty",
                width, height
            )));
        }
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(RenderError::InvalidTarget(format!(
                "degenerate extent {:?}",
                extent
            )));
        }

        let paths = parse_paths(geometry)?;
        let mut canvas = RgbaImage::new(width, height);

        let scale_x = f64::from(width) / extent.width();
        let scale_y = f64::from(height) / extent.height();
        let to_pixel = |(lon, lat): (f64, f64)| {
            let (mx, my) = lon_lat_to_mercator(lon, lat);
            ((mx - extent.llx) * scale_x, (extent.ury - my) * scale_y)
        };

        let clip = ClipBox {
            min_x: -CLIP_MARGIN,
            min_y: -CLIP_MARGIN,
            max_x: f64::from(width) + CLIP_MARGIN,
            max_y: f64::from(height) + CLIP_MARGIN,
        };

        for path in &paths {
            let points: Vec<(f64, f64)> = path.iter().copied().map(to_pixel).collect();
            if let [single] = points.as_slice() {
                if clip.contains(*single) {
                    self.stroke(&mut canvas, *single, *single);
                }
                continue;
            }
            for segment in points.windows(2) {
                if let Some((a, b)) = clip.clip(segment[0], segment[1]) {
                    self.stroke(&mut canvas, a, b);
                }
            }
        }

        RasterBuffer::from_raw(width, height, canvas.into_raw())
            .ok_or_else(|| RenderError::InvalidTarget("canvas size mismatch".to_string()))
    }
}

/// Axis-aligned clipping rectangle in pixel space.
struct ClipBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl ClipBox {
    fn contains(&self, p: (f64, f64)) -> bool {
        p.0 >= self.min_x && p.0 <= self.max_x && p.1 >= self.min_y && p.1 <= self.max_y
    }

    /// Liang-Barsky segment clipping.
    fn clip(&self, a: (f64, f64), b: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;

        for (p, q) in [
            (-dx, a.0 - self.min_x),
            (dx, self.max_x - a.0),
            (-dy, a.1 - self.min_y),
            (dy, self.max_y - a.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    }
                    t0 = t0.max(r);
                } else {
                    if r < t0 {
                        return None;
                    }
                    t1 = t1.min(r);
                }
            }
        }

        Some((
            (a.0 + t0 * dx, a.1 + t0 * dy),
            (a.0 + t1 * dx, a.1 + t1 * dy),
        ))
    }
}
