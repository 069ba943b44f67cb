//! API integration tests for tile serving and error handling.
//!
//! Tests verify:
//! - End-to-end tile composition against a live upstream
//! - HTTP response codes, headers and JSON error bodies
//! - What ends up in the cache directory for each outcome

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use offroad_tiles::tile::{MissingInputPolicy, TileAddress, TILE_SIZE};
use offroad_tiles::{GeometryRenderer, LineRenderer};

use super::test_utils::{
    build_router, build_router_with_policy, count_files, decode_png, diagonal_road, red_heatmap,
    HeatmapReply, Upstream,
};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_has_road_cut_out() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=86400"
    );
    assert_eq!(
        response.headers().get("x-tile-cache-hit").unwrap(),
        "false"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tile = decode_png(&body);
    assert_eq!(tile.dimensions(), (TILE_SIZE, TILE_SIZE));

    // The road runs along the pixel diagonal.
    for i in [8, 100, 128, 250] {
        assert_eq!(tile.pixel(i, i).unwrap(), [255, 0, 0, 0]);
    }
    for (x, y) in [(0, 255), (255, 0), (200, 20), (20, 200)] {
        assert_eq!(tile.pixel(x, y).unwrap(), [255, 0, 0, 200]);
    }

    // Alpha is 0 exactly on the rendered road and 200 everywhere else.
    let address = TileAddress::new(12, 655, 1466).unwrap();
    let road = LineRenderer::new()
        .render(
            diagonal_road(&address).as_bytes(),
            &address.bounds().to_extent(),
            TILE_SIZE,
            TILE_SIZE,
        )
        .unwrap();
    let expected: Vec<u8> = road
        .alpha()
        .map(|a| match a {
            255 => 0,
            0 => 200,
            other => panic!("road raster has partial alpha {}", other),
        })
        .collect();
    let actual: Vec<u8> = tile.alpha().collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_tile_is_cached_on_disk() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();

    assert!(dir.path().join("strava/12/655/1466.png").is_file());
    assert!(dir.path().join("osm/12/655/1466.json").is_file());
    let stored = std::fs::read(dir.path().join("offroad/12/655/1466.png")).unwrap();
    assert_eq!(stored, body.to_vec());
}

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let first = router
        .clone()
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = first.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(upstream.hits(), 2);

    let second = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-tile-cache-hit").unwrap(), "true");

    let second_body = second.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(first_body, second_body);
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_no_roads_keeps_heatmap() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    upstream.without_roads();
    let router = build_router(dir.path(), &upstream);

    let response = router.oneshot(get("/offroad/3/1/2.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tile = decode_png(&body);
    assert!(tile.alpha().all(|a| a == 200));
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_out_of_range_tile_is_not_found() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let response = router.oneshot(get("/offroad/1/2/0.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = json_body(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);

    assert_eq!(upstream.hits(), 0);
    assert_eq!(count_files(dir.path()), 0);
}

#[tokio::test]
async fn test_malformed_paths_are_not_found() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    for uri in [
        "/offroad/12/655/1466",
        "/offroad/12/655/1466.jpg",
        "/offroad/twelve/655/1466.png",
        "/offroad/12/655/abc.png",
        "/offroad/999/0/0.png",
        "/offroad/12/655",
    ] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start_with(HeatmapReply::Status(StatusCode::SERVICE_UNAVAILABLE)).await;
    let router = build_router(dir.path(), &upstream);

    let response = router
        .clone()
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = json_body(response).await;
    assert_eq!(json["error"], "upstream_error");
    assert!(json["message"].as_str().unwrap().contains("503"));

    assert!(!dir.path().join("strava/12/655/1466.png").exists());
    assert!(!dir.path().join("offroad/12/655/1466.png").exists());

    // Failures are not cached: once upstream recovers the tile is built.
    upstream.set_heatmap(HeatmapReply::Png(red_heatmap(256)));
    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.heatmap_hits(), 2);
}

#[tokio::test]
async fn test_empty_upstream_body_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start_with(HeatmapReply::Empty).await;
    let router = build_router(dir.path(), &upstream);

    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(!dir.path().join("strava/12/655/1466.png").exists());
}

#[tokio::test]
async fn test_dimension_mismatch_is_server_error() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start_with(HeatmapReply::Png(red_heatmap(128))).await;
    let router = build_router(dir.path(), &upstream);

    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = json_body(response).await;
    assert_eq!(json["error"], "dimension_mismatch");
    assert!(!dir.path().join("offroad/12/655/1466.png").exists());
}

#[tokio::test]
async fn test_blank_policy_serves_transparent_tile() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start_with(HeatmapReply::Status(StatusCode::NOT_FOUND)).await;
    let router =
        build_router_with_policy(dir.path(), &upstream, MissingInputPolicy::BlankHeatmap);

    let response = router
        .clone()
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tile = decode_png(&body);
    assert_eq!(tile.dimensions(), (TILE_SIZE, TILE_SIZE));
    assert!(tile.alpha().all(|a| a == 0));
    assert!(!dir.path().join("offroad/12/655/1466.png").exists());

    // Once the heatmap is back the real tile is built and stored.
    upstream.set_heatmap(HeatmapReply::Png(red_heatmap(256)));
    let response = router
        .oneshot(get("/offroad/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "false");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decode_png(&body).pixel(200, 20).unwrap()[3], 200);
    assert_eq!(upstream.heatmap_hits(), 2);
    assert!(dir.path().join("offroad/12/655/1466.png").is_file());
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = TempDir::new().unwrap();
    let upstream = Upstream::start().await;
    let router = build_router(dir.path(), &upstream);

    let response = router.oneshot(get("/tiles/1/0/0.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
