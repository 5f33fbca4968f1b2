#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the traffic violence bot.

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use traffic_watch_cli::config::Config;
use traffic_watch_cli::{CliError, RunContext, run};
use traffic_watch_geography::DistrictIndex;
use traffic_watch_publish::LogPublisher;
use traffic_watch_report::RunOutcome;
use traffic_watch_source::CitizenSource;
use traffic_watch_state::StateStore;

#[derive(Parser)]
#[command(name = "traffic_watch", about = "Traffic violence incident bot")]
struct Cli {
    /// Location id from the config file (e.g. "dc")
    #[arg(long)]
    location: String,

    /// Days of lookback to cover
    #[arg(long, default_value = "1")]
    days: u32,

    /// Path to the locations config file
    #[arg(long, default_value = "locations.toml")]
    config: PathBuf,

    /// Directory holding the month-partitioned incident archive
    #[arg(long, default_value = "archive")]
    state_dir: PathBuf,

    /// Map incidents to council districts and include representative
    /// call-outs (requires `geojson_path` in the location config)
    #[arg(long)]
    with_districts: bool,
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(RunOutcome::Report) => log::info!("run complete, incidents published"),
        Ok(RunOutcome::NothingToReport) => log::info!("run complete, nothing to report"),
        Ok(RunOutcome::FeedUnavailable) => log::warn!("run complete, feed unavailable"),
        Err(err) => {
            log::error!("run failed: {err}");
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<RunOutcome, CliError> {
    let config = Config::load(&cli.config)?;
    let location = config.location(&cli.location)?;

    let districts = if cli.with_districts {
        let path = location
            .geojson_path
            .as_ref()
            .ok_or_else(|| CliError::Config {
                message: format!(
                    "--with-districts requires geojson_path for location {}",
                    cli.location
                ),
            })?;
        let raw = std::fs::read_to_string(path)?;
        Some(DistrictIndex::from_geojson_str(&raw)?)
    } else {
        None
    };

    let store = StateStore::new(
        cli.state_dir.clone(),
        &cli.location,
        location.offset()?,
        location.grace_days,
    );
    let source = CitizenSource::new();
    let publisher = LogPublisher;
    let ctx = RunContext::new(Utc::now(), cli.days);

    run(
        &ctx,
        &cli.location,
        location,
        &source,
        &publisher,
        &store,
        districts.as_ref(),
    )
    .await
}
