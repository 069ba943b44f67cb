//! Bulk cache seeding over a geographic area.
//!
//! Seeding walks every tile covering a lon/lat box at the requested zoom
//! levels and either caches the raw inputs or builds the final tiles. A tile
//! that fails is logged and counted; it never stops the run.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::error::TileError;
use crate::geometry::GeometryRenderer;
use crate::io::TileFetcher;

use super::address::{count_tiles_in_bounds, tiles_in_bounds, GeoBounds, TileAddress};
use super::codec::Codec;
use super::pipeline::TilePipeline;

/// Default number of tiles processed at once.
pub const DEFAULT_SEED_CONCURRENCY: usize = 8;

/// Log a progress line every this many finished tiles.
const PROGRESS_INTERVAL: usize = 100;

/// What a seeding run stores for each tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// Cache the raw heatmap and geometry only
    Inputs,

    /// Build and cache the composited tile
    Outputs,
}

/// Outcome counts of a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Seeds the cache of a shared [`TilePipeline`].
pub struct Seeder<F, R, C> {
    pipeline: Arc<TilePipeline<F, R, C>>,
    concurrency: usize,
}

impl<F, R, C> Seeder<F, R, C>
where
    F: TileFetcher + 'static,
    R: GeometryRenderer + 'static,
    C: Codec + 'static,
{
    pub fn new(pipeline: Arc<TilePipeline<F, R, C>>) -> Self {
        Self {
            pipeline,
            concurrency: DEFAULT_SEED_CONCURRENCY,
        }
    }

    /// Limit the number of tiles in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Seed every tile covering `bounds` at each of `zooms`.
    ///
    /// Tiles are enumerated lazily and finished tasks are reaped while new
    /// ones are spawned, so memory stays bounded by the concurrency limit.
    pub async fn seed(&self, bounds: &GeoBounds, zooms: &[u8], mode: SeedMode) -> SeedReport {
        let total = count_tiles_in_bounds(bounds, zooms);
        let mut report = SeedReport {
            total: usize::try_from(total).unwrap_or(usize::MAX),
            ..SeedReport::default()
        };

        info!(
            tiles = total,
            ?zooms,
            ?mode,
            concurrency = self.concurrency,
            "seeding started"
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for tile in tiles_in_bounds(bounds, zooms) {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            while let Some(joined) = tasks.try_join_next() {
                report.record(joined);
            }

            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let _permit = permit;
                let result = seed_tile(&pipeline, &tile, mode).await;
                (tile, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            report.record(joined);
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "seeding finished"
        );
        report
    }
}

impl SeedReport {
    fn record(&mut self, joined: Result<(TileAddress, Result<(), TileError>), JoinError>) {
        match joined {
            Ok((_, Ok(()))) => self.succeeded += 1,
            Ok((tile, Err(e))) => {
                warn!(tile = %tile, error = %e, "seeding tile failed");
                self.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "seeding task aborted");
                self.failed += 1;
            }
        }

        let done = self.succeeded + self.failed;
        if done % PROGRESS_INTERVAL == 0 {
            info!(done, total = self.total, failed = self.failed, "seeding progress");
        }
    }
}

async fn seed_tile<F, R, C>(
    pipeline: &TilePipeline<F, R, C>,
    tile: &TileAddress,
    mode: SeedMode,
) -> Result<(), TileError>
where
    F: TileFetcher,
    R: GeometryRenderer + 'static,
    C: Codec + 'static,
{
    match mode {
        SeedMode::Inputs => pipeline.inputs().ensure(tile).await.map(|_| ()),
        SeedMode::Outputs => pipeline.get_or_build(tile).await.map(|_| ()),
    }
}
