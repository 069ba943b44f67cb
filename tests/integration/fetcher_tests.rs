//! HTTP fetcher integration tests against a local upstream.

use std::time::Duration;

use offroad_tiles::error::FetchError;
use offroad_tiles::{HttpTileFetcher, TileFetcher};

use super::test_utils::{red_heatmap, Upstream};

#[tokio::test]
async fn test_fetch_success() {
    let upstream = Upstream::start().await;
    let fetcher = HttpTileFetcher::new().unwrap();

    let body = fetcher
        .fetch(&upstream.url("/heatmap/12/655/1466.png"))
        .await
        .unwrap();
    assert_eq!(body, red_heatmap(256));
    assert_eq!(upstream.heatmap_hits(), 1);
}

#[tokio::test]
async fn test_fetch_error_status() {
    let upstream = Upstream::start().await;
    let fetcher = HttpTileFetcher::new().unwrap();
    let url = upstream.url("/missing");

    match fetcher.fetch(&url).await {
        Err(FetchError::Status { status, url: failed }) => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_empty_body() {
    let upstream = Upstream::start().await;
    let fetcher = HttpTileFetcher::new().unwrap();

    let result = fetcher.fetch(&upstream.url("/empty")).await;
    assert!(matches!(result, Err(FetchError::EmptyBody { .. })));
}

#[tokio::test]
async fn test_fetch_timeout() {
    let upstream = Upstream::start().await;
    let fetcher = HttpTileFetcher::with_timeout(Duration::from_millis(200)).unwrap();

    let result = fetcher.fetch(&upstream.url("/slow")).await;
    assert!(matches!(result, Err(FetchError::Request { .. })));
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    // Bind and drop a listener to get a port nobody is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpTileFetcher::new().unwrap();
    let result = fetcher.fetch(&format!("http://{}/tile.png", addr)).await;
    assert!(matches!(result, Err(FetchError::Request { .. })));
}
