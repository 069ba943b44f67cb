//! Test utilities for integration tests.
//!
//! This module provides a local upstream server standing in for the heatmap
//! and road geometry sources, plus helpers for building the router under
//! test against it.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use offroad_tiles::tile::{Codec, MissingInputPolicy, PngCodec, RasterBuffer, TileAddress};
use offroad_tiles::{
    create_router, DiskCache, HttpTileFetcher, InputAcquirer, LineRenderer, RouterConfig,
    TilePipeline,
};

// =============================================================================
// Fake Upstream
// =============================================================================

/// What the fake heatmap source answers with.
#[derive(Clone)]
pub enum HeatmapReply {
    Png(Bytes),
    Status(StatusCode),
    Empty,
}

#[derive(Clone)]
struct UpstreamState {
    heatmap: Arc<Mutex<HeatmapReply>>,
    roads: Arc<Mutex<bool>>,
    heatmap_hits: Arc<AtomicUsize>,
    geometry_hits: Arc<AtomicUsize>,
}

/// A local HTTP server serving heatmap PNGs and GeoJSON road tiles.
///
/// - `/heatmap/{z}/{x}/{y}.png`
/// - `/roads/{z}/{x}/{y}.json` - a road along the tile's diagonal
/// - `/empty`, `/missing`, `/slow` - fixed replies for fetcher tests
pub struct Upstream {
    pub base_url: String,
    state: UpstreamState,
}

impl Upstream {
    /// Start a server answering every heatmap request with a solid red
    /// 256x256 tile of alpha 200 and every geometry request with a diagonal
    /// road.
    pub async fn start() -> Self {
        Self::start_with(HeatmapReply::Png(red_heatmap(256))).await
    }

    pub async fn start_with(heatmap: HeatmapReply) -> Self {
        let state = UpstreamState {
            heatmap: Arc::new(Mutex::new(heatmap)),
            roads: Arc::new(Mutex::new(true)),
            heatmap_hits: Arc::new(AtomicUsize::new(0)),
            geometry_hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/heatmap/{z}/{x}/{filename}", get(heatmap_handler))
            .route("/roads/{z}/{x}/{filename}", get(roads_handler))
            .route("/empty", get(|| async { StatusCode::OK }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn heatmap_template(&self) -> String {
        format!("{}/heatmap/{{z}}/{{x}}/{{y}}.png", self.base_url)
    }

    pub fn geometry_template(&self) -> String {
        format!("{}/roads/{{z}}/{{x}}/{{y}}.json", self.base_url)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn set_heatmap(&self, reply: HeatmapReply) {
        *self.state.heatmap.lock().unwrap() = reply;
    }

    /// Serve empty feature collections instead of diagonal roads.
    pub fn without_roads(&self) {
        *self.state.roads.lock().unwrap() = false;
    }

    pub fn heatmap_hits(&self) -> usize {
        self.state.heatmap_hits.load(Ordering::SeqCst)
    }

    pub fn geometry_hits(&self) -> usize {
        self.state.geometry_hits.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.heatmap_hits() + self.geometry_hits()
    }
}

async fn heatmap_handler(
    State(state): State<UpstreamState>,
    UrlPath((_z, _x, _filename)): UrlPath<(u8, u32, String)>,
) -> Response {
    state.heatmap_hits.fetch_add(1, Ordering::SeqCst);
    let reply = state.heatmap.lock().unwrap().clone();
    match reply {
        HeatmapReply::Png(data) => ([("content-type", "image/png")], data).into_response(),
        HeatmapReply::Status(status) => status.into_response(),
        HeatmapReply::Empty => StatusCode::OK.into_response(),
    }
}

async fn roads_handler(
    State(state): State<UpstreamState>,
    UrlPath((z, x, filename)): UrlPath<(u8, u32, String)>,
) -> Response {
    state.geometry_hits.fetch_add(1, Ordering::SeqCst);

    let roads = *state.roads.lock().unwrap();
    let tile = filename
        .strip_suffix(".json")
        .and_then(|y| y.parse().ok())
        .and_then(|y| TileAddress::new(z, x, y).ok());

    match tile {
        Some(tile) if roads => diagonal_road(&tile).into_response(),
        Some(_) => EMPTY_COLLECTION.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub const EMPTY_COLLECTION: &str = r#"{"type": "FeatureCollection", "features": []}"#;

/// A square solid red PNG with alpha 200.
pub fn red_heatmap(size: u32) -> Bytes {
    PngCodec::new()
        .encode(&RasterBuffer::filled(size, size, [255, 0, 0, 200]))
        .unwrap()
}

/// GeoJSON with one road from the tile's north-west to its south-east corner.
pub fn diagonal_road(tile: &TileAddress) -> String {
    let b = tile.bounds();
    format!(
        r#"{{"type": "FeatureCollection", "features": [
            {{"type": "Feature", "properties": {{}}, "geometry":
                {{"type": "LineString", "coordinates": [[{}, {}], [{}, {}]]}}}}
        ]}}"#,
        b.west, b.north, b.east, b.south
    )
}

pub fn decode_png(data: &[u8]) -> RasterBuffer {
    PngCodec::new().decode(data).unwrap()
}

// =============================================================================
// Router Construction
// =============================================================================

pub fn build_pipeline(
    cache_dir: &Path,
    upstream: &Upstream,
) -> TilePipeline<HttpTileFetcher, LineRenderer> {
    let inputs = InputAcquirer::new(
        DiskCache::new(cache_dir),
        HttpTileFetcher::with_timeout(Duration::from_secs(5)).unwrap(),
        upstream.heatmap_template(),
        upstream.geometry_template(),
    );
    TilePipeline::new(inputs, LineRenderer::new())
}

/// Router with tracing off and the default missing-input policy.
pub fn build_router(cache_dir: &Path, upstream: &Upstream) -> Router {
    build_router_with_policy(cache_dir, upstream, MissingInputPolicy::Fail)
}

pub fn build_router_with_policy(
    cache_dir: &Path,
    upstream: &Upstream,
    policy: MissingInputPolicy,
) -> Router {
    let pipeline = build_pipeline(cache_dir, upstream).with_policy(policy);
    create_router(pipeline, RouterConfig::new().with_tracing(false))
}

/// Count regular files below `dir`, recursively.
pub fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .map(|path| if path.is_dir() { count_files(&path) } else { 1 })
        .sum()
}
