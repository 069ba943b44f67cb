//! Fakes shared by the tile unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::io::TileFetcher;

use super::address::TileAddress;
use super::codec::{Codec, PngCodec};
use super::raster::{RasterBuffer, TILE_SIZE};

pub const HEATMAP_TEMPLATE: &str = "http://heatmap.test/{z}/{x}/{y}.png";
pub const GEOMETRY_TEMPLATE: &str = "http://geometry.test/{z}/{x}/{y}.json";

pub const EMPTY_COLLECTION: &[u8] = br#"{"type": "FeatureCollection", "features": []}"#;

/// Fetcher that answers from canned per-kind responses and counts calls.
pub struct MockFetcher {
    heatmap: Mutex<Result<Bytes, FetchError>>,
    geometry: Mutex<Result<Bytes, FetchError>>,
    heatmap_calls: AtomicUsize,
    geometry_calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(heatmap: Bytes, geometry: impl Into<Bytes>) -> Self {
        Self {
            heatmap: Mutex::new(Ok(heatmap)),
            geometry: Mutex::new(Ok(geometry.into())),
            heatmap_calls: AtomicUsize::new(0),
            geometry_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_heatmap(&self, response: Result<Bytes, FetchError>) {
        *self.heatmap.lock().unwrap() = response;
    }

    pub fn set_geometry(&self, response: Result<Bytes, FetchError>) {
        *self.geometry.lock().unwrap() = response;
    }

    pub fn heatmap_calls(&self) -> usize {
        self.heatmap_calls.load(Ordering::SeqCst)
    }

    pub fn geometry_calls(&self) -> usize {
        self.geometry_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.heatmap_calls() + self.geometry_calls()
    }
}

#[async_trait]
impl TileFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if url.starts_with("http://heatmap.test/") {
            self.heatmap_calls.fetch_add(1, Ordering::SeqCst);
            self.heatmap.lock().unwrap().clone()
        } else if url.starts_with("http://geometry.test/") {
            self.geometry_calls.fetch_add(1, Ordering::SeqCst);
            self.geometry.lock().unwrap().clone()
        } else {
            Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }
}

pub fn not_found(url: &str) -> FetchError {
    FetchError::Status {
        status: 404,
        url: url.to_string(),
    }
}

/// A PNG of the given size with every pixel set to `rgba`.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Bytes {
    PngCodec::new()
        .encode(&RasterBuffer::filled(width, height, rgba))
        .unwrap()
}

/// A full-size solid red heatmap tile with alpha 200.
pub fn red_heatmap() -> Bytes {
    solid_png(TILE_SIZE, TILE_SIZE, [255, 0, 0, 200])
}

/// A road running from the north-west corner of `tile` to its south-east
/// corner, which lands on the pixel diagonal.
pub fn diagonal_road(tile: &TileAddress) -> Bytes {
    let b = tile.bounds();
    Bytes::from(format!(
        r#"{{"type": "FeatureCollection", "features": [
            {{"type": "Feature", "properties": {{"highway": "track"}}, "geometry":
                {{"type": "LineString", "coordinates": [[{}, {}], [{}, {}]]}}}}
        ]}}"#,
        b.west, b.north, b.east, b.south
    ))
}

/// Count regular files below `dir`, recursively.
pub fn count_files(dir: &std::path::Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .map(|path| if path.is_dir() { count_files(&path) } else { 1 })
        .sum()
}
