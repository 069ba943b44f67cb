//! Offroad Tiles - heatmap tiles with the roads cut out.
//!
//! This binary starts the HTTP server or seeds the tile cache.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offroad_tiles::{
    config::{Cli, Command, SeedConfig, ServeConfig, SourceArgs},
    geometry::LineRenderer,
    io::{DiskCache, HttpTileFetcher},
    server::{create_router, RouterConfig},
    tile::{InputAcquirer, SeedMode, Seeder, TilePipeline},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Seed(config) => run_seed(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("offroad-tiles v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    log_sources(&config.source);
    info!("  Missing heatmap: {:?}", config.missing_heatmap);
    info!("  Request timeout: {}s", config.request_timeout_secs);
    info!("  Cache max-age: {}s", config.cache_max_age);

    let pipeline = match build_pipeline(&config.source) {
        Ok(pipeline) => pipeline.with_policy(config.missing_input_policy()),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(pipeline, build_router_config(&config));
    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);
    info!("  curl -o tile.png http://{}/offroad/12/655/1466.png", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_request_timeout(config.request_timeout())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Seed Command
// =============================================================================

async fn run_seed(config: SeedConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    log_sources(&config.source);
    info!("  Bounds: {:?}", config.bounds);
    info!("  Zooms: {:?}", config.zooms);

    let pipeline = match build_pipeline(&config.source) {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mode = if config.inputs_only {
        SeedMode::Inputs
    } else {
        SeedMode::Outputs
    };

    let report = Seeder::new(pipeline)
        .with_concurrency(config.concurrency)
        .seed(&config.bounds, &config.zooms, mode)
        .await;

    println!(
        "{} tiles: {} succeeded, {} failed",
        report.total, report.succeeded, report.failed
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Shared Setup
// =============================================================================

fn build_pipeline(
    source: &SourceArgs,
) -> Result<TilePipeline<HttpTileFetcher, LineRenderer>, reqwest::Error> {
    let fetcher = HttpTileFetcher::with_timeout(source.fetch_timeout())?;
    let inputs = InputAcquirer::new(
        DiskCache::new(&source.cache_dir),
        fetcher,
        &source.heatmap_url,
        &source.geometry_url,
    );
    Ok(TilePipeline::new(
        inputs,
        LineRenderer::with_line_width(source.line_width),
    ))
}

fn log_sources(source: &SourceArgs) {
    info!("  Cache dir: {}", source.cache_dir.display());
    info!("  Heatmap: {}", source.heatmap_url);
    info!("  Geometry: {}", source.geometry_url);
    info!("  Line width: {}px", source.line_width);
    info!("  Fetch timeout: {}s", source.fetch_timeout_secs);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "offroad_tiles=debug,tower_http=debug"
    } else {
        "offroad_tiles=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
