//! # Xirin Marine Entry Point
//!
//! Resolves weather, sea state and tides for a point and prints either a
//! text report or the catch snapshot as JSON.
//!
//! ```text
//! xirin-marine 42.24 -8.72 --at 2025-11-29T13:06:00+01:00
//! xirin-marine 43.66 -70.25 --date 2025-11-29 --json
//! xirin-marine --status
//! ```

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use xirin_marine_lib::conditions::ConditionsService;
use xirin_marine_lib::config::Config;
use xirin_marine_lib::{report, DateRange, GeoPoint, MAX_FORECAST_DAYS};

#[derive(Debug, Parser)]
#[command(about = "Marine conditions for a fishing spot.", allow_negative_numbers = true)]
struct Cli {
    /// Latitude in decimal degrees
    #[arg(required_unless_present = "status")]
    lat: Option<f64>,
    /// Longitude in decimal degrees
    #[arg(required_unless_present = "status")]
    lng: Option<f64>,
    /// First day to fetch (UTC); defaults to the day of --at
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Number of days to fetch (1-16); defaults to [network] forecast_days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_FORECAST_DAYS)))]
    days: Option<u32>,
    /// Instant to report conditions for (RFC 3339); defaults to now, or noon UTC of --date
    #[arg(long)]
    at: Option<DateTime<FixedOffset>>,
    /// Configuration file
    #[arg(long, env = "XIRIN_CONFIG")]
    config: Option<PathBuf>,
    /// Print the catch snapshot as JSON instead of the text report
    #[arg(long)]
    json: bool,
    /// Print which providers are usable and exit
    #[arg(long)]
    status: bool,
}

fn load_config(path: Option<&PathBuf>) -> Config {
    match path {
        Some(path) => {
            Config::load_from_path(path).with_env_credentials(|key| std::env::var(key).ok())
        }
        None => Config::load(),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();
    let config = load_config(args.config.as_ref());

    for status in config.provider_status() {
        info!("{}: {}", status.provider, status.note);
    }
    if args.status {
        for status in config.provider_status() {
            let mark = if status.configured { "ok" } else { "--" };
            println!("{mark}  {:<12} {}", status.provider.name(), status.note);
        }
        return Ok(());
    }

    let (Some(lat), Some(lng)) = (args.lat, args.lng) else {
        anyhow::bail!("latitude and longitude are required");
    };
    let point = GeoPoint::new(lat, lng).context("invalid coordinates")?;

    let at = match (args.at, args.date) {
        (Some(at), _) => at,
        (None, Some(date)) => date
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN))
            .and_utc()
            .fixed_offset(),
        (None, None) => Utc::now().fixed_offset(),
    };
    let start = args.date.unwrap_or_else(|| at.with_timezone(&Utc).date_naive());
    let range = DateRange::new(start, args.days.unwrap_or(config.network.forecast_days));

    let service = ConditionsService::new(&config).context("building HTTP client")?;
    let rt = tokio::runtime::Runtime::new()?;
    let day = rt.block_on(service.fetch_day(point, range, &config));

    if args.json {
        let snapshot = day.snapshot(at);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", report::render(&day, at, config.display.units));
    }
    Ok(())
}
