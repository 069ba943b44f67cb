//! Configuration management for the offroad tile server.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap, with `serve` and `seed` subcommands
//! - Environment variables with `OFFROAD_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `OFFROAD_HOST` - Server bind address (default: 0.0.0.0)
//! - `OFFROAD_PORT` - Server port (default: 3000)
//! - `OFFROAD_CACHE_DIR` - Tile cache directory (default: ./tiles)
//! - `OFFROAD_HEATMAP_URL` - Heatmap URL template (required)
//! - `OFFROAD_GEOMETRY_URL` - Road geometry URL template (required)
//! - `OFFROAD_LINE_WIDTH` - Road stroke width in pixels (default: 4)
//! - `OFFROAD_FETCH_TIMEOUT` - Upstream timeout in seconds (default: 30)
//! - `OFFROAD_REQUEST_TIMEOUT` - HTTP request timeout in seconds (default: 60)
//! - `OFFROAD_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 86400)
//! - `OFFROAD_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `OFFROAD_MISSING_HEATMAP` - `fail` or `blank` (default: fail)
//! - `OFFROAD_SEED_CONCURRENCY` - Tiles seeded at once (default: 8)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::geometry::DEFAULT_LINE_WIDTH;
use crate::server::DEFAULT_CACHE_MAX_AGE;
use crate::tile::{GeoBounds, MissingInputPolicy, MAX_ZOOM, DEFAULT_SEED_CONCURRENCY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "./tiles";

/// Default upstream fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Offroad Tiles - heatmap tiles with the roads cut out.
#[derive(Parser, Debug, Clone)]
#[command(name = "offroad-tiles")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP tile server.
    Serve(ServeConfig),

    /// Pre-populate the tile cache over an area.
    Seed(SeedConfig),
}

/// What to serve when the heatmap for a tile cannot be fetched.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingHeatmap {
    /// Answer with an error
    #[default]
    Fail,
    /// Serve a fully transparent tile
    Blank,
}

impl From<MissingHeatmap> for MissingInputPolicy {
    fn from(value: MissingHeatmap) -> Self {
        match value {
            MissingHeatmap::Fail => MissingInputPolicy::Fail,
            MissingHeatmap::Blank => MissingInputPolicy::BlankHeatmap,
        }
    }
}

/// Options shared by every command that builds tiles.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Root directory of the tile cache.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "OFFROAD_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Heatmap tile URL template with {z}, {x} and {y} placeholders.
    #[arg(long, env = "OFFROAD_HEATMAP_URL")]
    pub heatmap_url: String,

    /// Road geometry (GeoJSON) URL template with {z}, {x} and {y} placeholders.
    #[arg(long, env = "OFFROAD_GEOMETRY_URL")]
    pub geometry_url: String,

    /// Road stroke width in pixels.
    #[arg(long, default_value_t = DEFAULT_LINE_WIDTH, env = "OFFROAD_LINE_WIDTH")]
    pub line_width: f32,

    /// Upstream fetch timeout in seconds.
    #[arg(
        long = "fetch-timeout",
        default_value_t = DEFAULT_FETCH_TIMEOUT_SECS,
        env = "OFFROAD_FETCH_TIMEOUT"
    )]
    pub fetch_timeout_secs: u64,
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        validate_template("heatmap-url", &self.heatmap_url)?;
        validate_template("geometry-url", &self.geometry_url)?;

        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err("line_width must be greater than 0".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "OFFROAD_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "OFFROAD_PORT")]
    pub port: u16,

    /// HTTP request timeout in seconds.
    #[arg(
        long = "request-timeout",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        env = "OFFROAD_REQUEST_TIMEOUT"
    )]
    pub request_timeout_secs: u64,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "OFFROAD_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "OFFROAD_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Tile Sources
    // =========================================================================
    #[command(flatten)]
    pub source: SourceArgs,

    /// What to serve when a heatmap tile cannot be fetched.
    #[arg(long, value_enum, default_value_t = MissingHeatmap::Fail, env = "OFFROAD_MISSING_HEATMAP")]
    pub missing_heatmap: MissingHeatmap,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.request_timeout_secs == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn missing_input_policy(&self) -> MissingInputPolicy {
        self.missing_heatmap.into()
    }
}

/// Configuration for the `seed` command.
#[derive(Args, Debug, Clone)]
pub struct SeedConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Area to seed as west,south,east,north in degrees.
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    pub bounds: GeoBounds,

    /// Zoom levels to seed (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub zooms: Vec<u8>,

    /// Only cache the raw heatmap and geometry, do not build output tiles.
    #[arg(long, default_value_t = false)]
    pub inputs_only: bool,

    /// Number of tiles processed at once.
    #[arg(long, default_value_t = DEFAULT_SEED_CONCURRENCY, env = "OFFROAD_SEED_CONCURRENCY")]
    pub concurrency: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SeedConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        validate_bounds(&self.bounds)?;

        if self.zooms.is_empty() {
            return Err("at least one zoom level is required".to_string());
        }
        if let Some(z) = self.zooms.iter().find(|&&z| z > MAX_ZOOM) {
            return Err(format!("zoom {} exceeds the maximum of {}", z, MAX_ZOOM));
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Parsing and Validation
// =============================================================================

/// Parse `west,south,east,north`.
pub fn parse_bounds(s: &str) -> Result<GeoBounds, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid bounds '{}': {}", s, e))?;

    match values.as_slice() {
        &[west, south, east, north] => Ok(GeoBounds {
            west,
            south,
            east,
            north,
        }),
        _ => Err(format!(
            "invalid bounds '{}': expected west,south,east,north",
            s
        )),
    }
}

fn validate_bounds(b: &GeoBounds) -> Result<(), String> {
    let finite = [b.west, b.south, b.east, b.north]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err("bounds must be finite numbers".to_string());
    }
    if !(-180.0..=180.0).contains(&b.west) || !(-180.0..=180.0).contains(&b.east) {
        return Err("bounds longitudes must be within -180..180".to_string());
    }
    if !(-90.0..=90.0).contains(&b.south) || !(-90.0..=90.0).contains(&b.north) {
        return Err("bounds latitudes must be within -90..90".to_string());
    }
    if b.west >= b.east || b.south >= b.north {
        return Err("bounds must satisfy west < east and south < north".to_string());
    }
    Ok(())
}

/// Check a tile URL template: all placeholders present and a valid
/// http(s) URL once they are filled in.
fn validate_template(name: &str, template: &str) -> Result<(), String> {
    for placeholder in ["{z}", "{x}", "{y}"] {
        if !template.contains(placeholder) {
            return Err(format!("{} is missing the {} placeholder", name, placeholder));
        }
    }

    let sample = template
        .replace("{z}", "0")
        .replace("{x}", "0")
        .replace("{y}", "0");
    let url = url::Url::parse(&sample).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("{} must use http or https, not {}", name, scheme)),
    }
}

// =============================================================================
// Tests
// =============================================================================
