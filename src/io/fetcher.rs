use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::error::FetchError;

/// Default timeout for upstream tile requests.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("offroad-tiles/", env!("CARGO_PKG_VERSION"));

/// Trait for fetching raw tiles from an upstream source.
///
/// Implementations must treat a non-success status or an empty body as a
/// failure so that nothing empty ever reaches the cache.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the full body at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP implementation of [`TileFetcher`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpTileFetcher {
    client: reqwest::Client,
}

impl HttpTileFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> reqwest::Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url = url, "upstream GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(
                url = url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "upstream request failed"
            );
            FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "upstream error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if body.is_empty() {
            warn!(url = url, "upstream returned an empty body");
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!(url = url, bytes = body.len(), "upstream tile fetched");
        Ok(body)
    }
}
