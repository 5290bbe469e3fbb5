//! Surfwatch Service - Buoy observation CLI and HTTP endpoint
//!
//! Fetches NDBC realtime buoy feeds for the configured surf regions and:
//! 1. Lists recent observations per location
//! 2. Compares every location on one chart and names the top spot
//! 3. Forecasts wave height by linear trend
//!
//! Usage:
//!   surfwatch serve --port 8080
//!   surfwatch history --region central
//!   surfwatch compare
//!   surfwatch forecast --region south
//!
//! Environment:
//!   RUST_LOG                     - log filter (default: info)
//!   SURFWATCH_NDBC_URL           - override the realtime feed base URL
//!   SURFWATCH_FETCH_TIMEOUT_SECS - override the per-station timeout
//!   SURFWATCH_REGIONS            - override the region registry path

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use surfwatch_service::config::{load_config, DEFAULT_CONFIG_PATH};
use surfwatch_service::endpoint::{self, DEFAULT_REGION};
use surfwatch_service::logging;
use surfwatch_service::service::SurfService;

#[derive(Parser)]
#[command(
    name = "surfwatch",
    version,
    about = "Buoy observations, comparisons and wave forecasts for Florida surf regions"
)]
struct Cli {
    /// Path to the service configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Print recent observations for every location of a region
    History {
        #[arg(short, long, default_value = DEFAULT_REGION)]
        region: String,
    },

    /// Compare all locations across all regions
    Compare,

    /// Forecast wave height for the locations of a region
    Forecast {
        #[arg(short, long)]
        region: String,
    },

    /// List the configured regions and their locations
    Regions,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logger(LevelFilter::Info, true);
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .and_then(|c| c.apply_env_overrides())
        .with_context(|| format!("loading configuration from {}", cli.config))?;
    let service = SurfService::from_config(config).context("initializing service")?;

    log::info!(
        "Loaded {} regions ({} stations)",
        service.registry().regions().len(),
        service.registry().station_ids().len()
    );

    match cli.command {
        Command::Serve { port } => {
            endpoint::start_endpoint_server(port, service).map_err(anyhow::Error::msg)
        }
        Command::History { region } => print_json(&service.history(&region)?),
        Command::Compare => print_json(&service.compare()?),
        Command::Forecast { region } => print_json(&service.forecast(&region)?),
        Command::Regions => print_json(&service.registry().regions()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{}", body);
    Ok(())
}
