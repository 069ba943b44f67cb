mod disk_cache;
mod fetcher;

pub use disk_cache::{DiskCache, WriteOutcome};
pub use fetcher::{HttpTileFetcher, TileFetcher, DEFAULT_FETCH_TIMEOUT};
