//! Slippy-map tile addressing.
//!
//! A [`TileAddress`] names one 256×256 tile in the standard web-mercator
//! `z/x/y` scheme. Everything derived from it (geographic bounds, planar
//! extent, upstream URLs, cache paths) is a pure function of the triple.

use std::f64::consts::PI;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::error::TileError;

/// Highest zoom level accepted (so that `2^z` always fits in a `u32`).
pub const MAX_ZOOM: u8 = 30;

/// Latitude limit of the web-mercator projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Equatorial radius used by EPSG:3857, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Nudges east/south edges inward so a box ending exactly on a tile
/// boundary does not pull in the next row or column.
const EDGE_EPSILON: f64 = 1e-11;

// =============================================================================
// Tile Address
// =============================================================================

/// A validated `(z, x, y)` tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    z: u8,
    x: u32,
    y: u32,
}

impl TileAddress {
    /// Create a tile address, rejecting coordinates outside `0 <= x, y < 2^z`.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, TileError> {
        if z > MAX_ZOOM {
            return Err(TileError::OutOfRange { z, x, y });
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(TileError::OutOfRange { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Geographic bounds of this tile in degrees.
    pub fn bounds(&self) -> GeoBounds {
        let n = 2.0_f64.powi(self.z as i32);
        GeoBounds {
            west: tile_x_to_lon(self.x as f64, n),
            south: tile_y_to_lat((self.y + 1) as f64, n),
            east: tile_x_to_lon((self.x + 1) as f64, n),
            north: tile_y_to_lat(self.y as f64, n),
        }
    }

    /// Substitute `{z}`, `{x}` and `{y}` in a URL template.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn tile_x_to_lon(x: f64, n: f64) -> f64 {
    x / n * 360.0 - 180.0
}

fn tile_y_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

// =============================================================================
// Bounds and Extent
// =============================================================================

/// A lon/lat bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Project the lower-left and upper-right corners to spherical mercator.
    pub fn to_extent(&self) -> Extent {
        let (llx, lly) = lon_lat_to_mercator(self.west, self.south);
        let (urx, ury) = lon_lat_to_mercator(self.east, self.north);
        Extent { llx, lly, urx, ury }
    }
}

/// A planar rendering extent in EPSG:3857 metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// Spherical mercator forward projection.
///
/// Latitudes are clamped to the projection limit so the poles stay finite.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

// =============================================================================
// Tile Enumeration
// =============================================================================

/// Iterate over every tile intersecting `bounds` at each of the given zoom
/// levels, zoom by zoom, without materializing the list.
///
/// Zoom levels above [`MAX_ZOOM`] are skipped.
pub fn tiles_in_bounds(bounds: &GeoBounds, zooms: &[u8]) -> impl Iterator<Item = TileAddress> {
    tile_ranges(bounds, zooms)
        .into_iter()
        .flat_map(|(z, xs, ys)| {
            xs.flat_map(move |x| ys.clone().map(move |y| TileAddress { z, x, y }))
        })
}

/// Number of tiles [`tiles_in_bounds`] yields for the same arguments.
pub fn count_tiles_in_bounds(bounds: &GeoBounds, zooms: &[u8]) -> u64 {
    tile_ranges(bounds, zooms)
        .iter()
        .map(|(_, xs, ys)| {
            let width = u64::from(xs.end() - xs.start()) + 1;
            let height = u64::from(ys.end() - ys.start()) + 1;
            width * height
        })
        .sum()
}

type TileRange = (u8, RangeInclusive<u32>, RangeInclusive<u32>);

fn tile_ranges(bounds: &GeoBounds, zooms: &[u8]) -> Vec<TileRange> {
    zooms
        .iter()
        .copied()
        .filter(|&z| z <= MAX_ZOOM)
        .map(|z| {
            let (min_x, min_y) = lon_lat_to_tile(bounds.west, bounds.north, z);
            let (max_x, max_y) =
                lon_lat_to_tile(bounds.east - EDGE_EPSILON, bounds.south + EDGE_EPSILON, z);
            (z, min_x..=max_x, min_y..=max_y)
        })
        .collect()
}

fn lon_lat_to_tile(lon: f64, lat: f64, z: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(z as i32);
    let max_index = n - 1.0;

    let lon = lon.clamp(-180.0, 180.0);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index);

    (x as u32, y as u32)
}

// =============================================================================
// Cache Layout
// =============================================================================

/// The three kinds of blobs kept in the tile cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Raw heatmap raster as fetched upstream
    Heatmap,
    /// Raw road geometry as fetched upstream
    Geometry,
    /// Composited output tile
    Offroad,
}

impl CacheKind {
    /// Directory under the cache root holding this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CacheKind::Heatmap => "strava",
            CacheKind::Geometry => "osm",
            CacheKind::Offroad => "offroad",
        }
    }

    /// File extension for entries of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            CacheKind::Heatmap => "png",
            CacheKind::Geometry => "json",
            CacheKind::Offroad => "png",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheKind::Heatmap => "heatmap-raw",
            CacheKind::Geometry => "geometry-raw",
            CacheKind::Offroad => "composited-output",
        };
        f.write_str(name)
    }
}

/// Path of a cache entry: `{base}/{kind}/{z}/{x}/{y}.{ext}`.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use offroad_tiles::tile::{cache_path, CacheKind, TileAddress};
///
/// let tile = TileAddress::new(12, 655, 1466).unwrap();
/// assert_eq!(
///     cache_path(Path::new("/tiles"), CacheKind::Geometry, &tile),
///     PathBuf::from("/tiles/osm/12/655/1466.json")
/// );
/// ```
pub fn cache_path(base: &Path, kind: CacheKind, tile: &TileAddress) -> PathBuf {
    base.join(kind.dir_name())
        .join(tile.z.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.{}", tile.y, kind.extension()))
}

// =============================================================================
// Tests
// =============================================================================
