//! # Tide Predictor Application Entry Point
//!
//! This binary reads station harmonics from tide-config.toml, predicts tide,
//! current, sun and moon events for every selected station, and prints them
//! either as local-time text or as JSON for companion devices.
//!
//! Stations are predicted concurrently on the tokio blocking pool, sharing one
//! [`Predictor`] and therefore one node-factor cache.
//!
//! ```text
//! tide-predict --start 2024-06-01 --days 2 --kinds high_tide,low_tide,sunrise
//! RUST_LOG=debug tide-predict --json
//! ```

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tide_predict_lib::config::{Config, StationConfig};
use tide_predict_lib::presentation::{event_lines, watch_events, WatchEvent};
use tide_predict_lib::{EventFilter, EventKind, EventSequence, HarmonicModel, Predictor};

/// Predict tides, currents and sun/moon events from harmonic constants
#[derive(Parser, Debug)]
#[command(name = "tide-predict", version, about)]
struct Args {
    /// Config file (defaults to ./tide-config.toml, then built-in Portland, ME)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start of the window: RFC 3339 instant or YYYY-MM-DD (UTC midnight).
    /// Defaults to now.
    #[arg(short, long, value_parser = parse_start)]
    start: Option<DateTime<Utc>>,

    /// Days to predict (overrides the config)
    #[arg(short, long)]
    days: Option<u32>,

    /// Only predict for this station (case-insensitive name)
    #[arg(long)]
    station: Option<String>,

    /// Comma-separated event kinds, e.g. high_tide,low_tide,full_moon
    #[arg(short, long, value_delimiter = ',')]
    kinds: Vec<EventKind>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

/// One station's results as emitted with `--json`
#[derive(Serialize)]
struct StationReport {
    station: String,
    events: Vec<WatchEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {s:?}"))
}

/// Stations to run, honouring `--station`.
fn select_stations<'a>(config: &'a Config, wanted: Option<&str>) -> anyhow::Result<Vec<&'a StationConfig>> {
    match wanted {
        Some(name) => match config.station(name) {
            Some(station) => Ok(vec![station]),
            None => bail!("no station named {name:?} in the configuration"),
        },
        None if config.stations.is_empty() => bail!("the configuration lists no stations"),
        None => Ok(config.stations.iter().collect()),
    }
}

/// Event kinds for one station: `--kinds`, else the config, else the default.
fn filter_for(args: &Args, config: &Config, model: &HarmonicModel) -> EventFilter {
    if args.kinds.is_empty() {
        config.prediction.filter_for(model.station_type())
    } else {
        args.kinds.iter().copied().collect()
    }
}

fn print_text(model: &HarmonicModel, events: &EventSequence) {
    println!("{}", model.name());
    for (key, value) in model.metadata().iter().skip(1) {
        println!("  {key}: {value}");
    }
    println!();
    for line in event_lines(events, model) {
        println!("  {line}");
    }
    for warning in events.warnings() {
        eprintln!("Warning: {warning}");
    }
    println!();
}

/// `[start, start + days)`, with at least one day.
fn prediction_window(start: DateTime<Utc>, days: u32) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let days = days.max(1);
    let end = start
        .checked_add_signed(Duration::days(i64::from(days)))
        .with_context(|| format!("{days} days after {start} is out of range"))?;
    Ok((start, end))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::try_load_from_path(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => Config::load(),
    };

    let start = args.start.unwrap_or_else(Utc::now);
    let (start, end) = prediction_window(start, args.days.unwrap_or(config.prediction.days))?;

    let mut jobs = Vec::new();
    for station in select_stations(&config, args.station.as_deref())? {
        let model = station
            .to_model()
            .with_context(|| format!("station {}", station.name))?;
        let filter = filter_for(&args, &config, &model);
        jobs.push((Arc::new(model), filter));
    }

    let predictor = Arc::new(Predictor::with_options(config.prediction.options()));
    let rt = tokio::runtime::Runtime::new()?;

    let results = rt.block_on(async {
        let handles: Vec<_> = jobs
            .iter()
            .map(|(model, filter)| {
                let predictor = Arc::clone(&predictor);
                let model = Arc::clone(model);
                let filter = *filter;
                tokio::task::spawn_blocking(move || {
                    predictor.predict_events(&model, start, end, &filter)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await);
        }
        results
    });

    let mut reports = Vec::new();
    for ((model, _), result) in jobs.iter().zip(results) {
        let events = result
            .context("prediction task panicked")?
            .with_context(|| format!("predicting for {}", model.name()))?;

        if args.json {
            reports.push(StationReport {
                station: model.name().to_string(),
                events: watch_events(&events, model),
                warnings: events.warnings().iter().map(ToString::to_string).collect(),
            });
        } else {
            print_text(model, &events);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}
