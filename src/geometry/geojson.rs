//! Minimal GeoJSON reader that extracts strokeable paths.
//!
//! Only what the road layer needs is modelled: every geometry is reduced to
//! a list of lon/lat polylines. Polygons contribute their rings (outlines
//! only) and points contribute nothing.

use serde::Deserialize;

use crate::error::RenderError;

/// A polyline of `(lon, lat)` positions in degrees.
pub type Path = Vec<(f64, f64)>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Collection(FeatureCollection),
    Geometry(Geometry),
    Feature(Feature),
}

#[derive(Debug, Deserialize)]
enum CollectionTag {
    FeatureCollection,
}

#[derive(Debug, Deserialize)]
enum FeatureTag {
    Feature,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    _tag: CollectionTag,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    _tag: FeatureTag,
    geometry: Option<Geometry>,
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point {
        #[serde(rename = "coordinates")]
        _coordinates: Position,
    },
    MultiPoint {
        #[serde(rename = "coordinates")]
        _coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

/// Parse a GeoJSON document and return every path it contains.
///
/// Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
pub fn parse_paths(data: &[u8]) -> Result<Vec<Path>, RenderError> {
    let document: Document = serde_json::from_slice(data)
        .map_err(|e| RenderError::InvalidGeometry(format!("not a GeoJSON document: {}", e)))?;

    let mut paths = Vec::new();
    match document {
        Document::Collection(collection) => {
            for feature in collection.features {
                if let Some(geometry) = feature.geometry {
                    collect_paths(geometry, &mut paths)?;
                }
            }
        }
        Document::Feature(feature) => {
            if let Some(geometry) = feature.geometry {
                collect_paths(geometry, &mut paths)?;
            }
        }
        Document::Geometry(geometry) => collect_paths(geometry, &mut paths)?,
    }

    Ok(paths)
}

fn collect_paths(geometry: Geometry, out: &mut Vec<Path>) -> Result<(), RenderError> {
    match geometry {
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => {}
        Geometry::LineString { coordinates } => out.push(to_path(coordinates)?),
        Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
            for line in coordinates {
                out.push(to_path(line)?);
            }
        }
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                for ring in polygon {
                    out.push(to_path(ring)?);
                }
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for geometry in geometries {
                collect_paths(geometry, out)?;
            }
        }
    }
    Ok(())
}

fn to_path(positions: Vec<Position>) -> Result<Path, RenderError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok((*lon, *lat)),
            _ => Err(RenderError::InvalidGeometry(format!(
                "invalid position {:?}",
                p
            ))),
        })
        .collect()
}
