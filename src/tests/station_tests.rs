//! # End-to-End Station Tests
//!
//! These tests drive the same path as the binary: a TOML config on disk is
//! loaded, stations are validated into models, and predictions are rendered
//! as text and JSON.

use std::fs;
use tempfile::NamedTempFile;
use tide_predict_lib::config::Config;
use tide_predict_lib::presentation::{event_lines, watch_events};
use tide_predict_lib::{EventFilter, EventKind, Predictor, StationType};

use crate::{parse_start, prediction_window, select_stations};

const TWO_STATIONS: &str = r#"
[prediction]
days = 2
kinds = ["high_tide", "low_tide", "max_current", "min_current", "slack_rising", "slack_falling", "sunrise", "sunset"]

[[stations]]
name = "Portland, ME"
time_zone = "America/New_York"
latitude = 43.6567
longitude = -70.2467
station_type = "height"
units = "feet"
datum = 4.9
constituents = [
    { name = "M2", amplitude = 4.51, phase = 103.6 },
    { name = "N2", amplitude = 1.03, phase = 74.6 },
    { name = "S2", amplitude = 0.68, phase = 139.4 },
    { name = "K1", amplitude = 0.46, phase = 203.0 },
    { name = "O1", amplitude = 0.36, phase = 189.6 },
]

[[stations]]
name = "Harbor Entrance"
time_zone = "America/New_York"
station_type = "current"
units = "knots"
constituents = [
    { name = "M2", amplitude = 1.8, phase = 12.0 },
    { name = "S2", amplitude = 0.3, phase = 40.0 },
]
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), contents).unwrap();
    file
}

/// A config file on disk is loaded and every station yields a valid model.
#[test]
fn config_file_loads_both_stations() {
    let file = write_config(TWO_STATIONS);
    let config = Config::load_from_path(file.path());

    assert_eq!(config.stations.len(), 2);
    assert_eq!(config.prediction.days, 2);
    let current = config.stations[1].to_model().unwrap();
    assert_eq!(current.station_type(), StationType::Current);
    assert!(current.coordinates().is_none());
}

/// A malformed file falls back to the built-in station rather than failing.
#[test]
fn malformed_config_falls_back_to_default() {
    let file = write_config("stations = \"not a list\"");
    let config = Config::load_from_path(file.path());
    assert_eq!(config, Config::default());
    assert!(Config::try_load_from_path(file.path()).is_err());
}

/// Saving and reloading preserves every field.
#[test]
fn config_survives_save_and_reload() {
    let file = write_config(TWO_STATIONS);
    let config = Config::load_from_path(file.path());

    let copy = NamedTempFile::new().unwrap();
    config.save_to_path(copy.path()).unwrap();
    assert_eq!(Config::try_load_from_path(copy.path()).unwrap(), config);
}

/// Both station types predict from the same config with one shared predictor.
#[test]
fn stations_predict_with_configured_kinds() {
    let file = write_config(TWO_STATIONS);
    let config = Config::load_from_path(file.path());
    let predictor = Predictor::with_options(config.prediction.options());
    let start = parse_start("2024-08-01").unwrap();
    let end = start + chrono::Duration::days(i64::from(config.prediction.days));

    let height = config.stations[0].to_model().unwrap();
    let filter = config.prediction.filter_for(height.station_type());
    let tides = predictor.predict_events(&height, start, end, &filter).unwrap();
    assert!(tides.iter().any(|e| e.kind == EventKind::HighTide));
    assert_eq!(tides.iter().filter(|e| e.kind == EventKind::Sunrise).count(), 2);
    assert!(tides.iter().all(|e| e.kind != EventKind::MaxCurrent));

    let current = config.stations[1].to_model().unwrap();
    let filter = config.prediction.filter_for(current.station_type());
    let flows = predictor.predict_events(&current, start, end, &filter).unwrap();
    assert!(flows.iter().any(|e| e.kind == EventKind::SlackRising));
    // No coordinates, so no sun events for the current station
    assert!(flows.iter().all(|e| !e.kind.is_astronomical()));

    // Year 2024 plus its two neighbours, computed once for both stations
    assert_eq!(predictor.cache().len(), 3);
}

/// Text lines and the JSON list describe the same events.
#[test]
fn text_and_json_outputs_agree() {
    let config = Config::default();
    let model = config.stations[0].to_model().unwrap();
    let start = parse_start("2024-03-10T00:00:00Z").unwrap();
    let events = Predictor::new()
        .predict_events(&model, start, start + chrono::Duration::days(1), &EventFilter::tides())
        .unwrap();

    let lines = event_lines(&events, &model);
    let list = watch_events(&events, &model);
    assert_eq!(lines.len(), list.len());
    for (line, item) in lines.iter().zip(&list) {
        assert!(line.contains(&item.label), "{line}");
        assert!(line.ends_with(" ft"), "{line}");
    }
    assert!(serde_json::to_string(&list).unwrap().contains("high_tide"));
}

/// `--start` takes a bare date (midnight UTC) or an RFC 3339 instant.
#[test]
fn start_accepts_dates_and_instants() {
    let date = parse_start("2024-06-01").unwrap();
    assert_eq!(date.to_rfc3339(), "2024-06-01T00:00:00+00:00");

    let instant = parse_start("2024-06-01T08:30:00-04:00").unwrap();
    assert_eq!(instant.to_rfc3339(), "2024-06-01T12:30:00+00:00");

    assert!(parse_start("June 1st").is_err());
}

/// `--station` matches names ignoring case and rejects unknown stations.
#[test]
fn station_selection_is_case_insensitive() {
    let file = write_config(TWO_STATIONS);
    let config = Config::load_from_path(file.path());

    assert_eq!(select_stations(&config, None).unwrap().len(), 2);
    let picked = select_stations(&config, Some("harbor entrance")).unwrap();
    assert_eq!(picked[0].name, "Harbor Entrance");
    assert!(select_stations(&config, Some("Atlantis")).is_err());
}

/// The window spans whole days, at least one, and an unrepresentable end is an error.
#[test]
fn prediction_window_is_bounded() {
    let start = parse_start("2024-06-01").unwrap();

    let (from, to) = prediction_window(start, 2).unwrap();
    assert_eq!(from, start);
    assert_eq!(to - from, chrono::Duration::days(2));

    let (from, to) = prediction_window(start, 0).unwrap();
    assert_eq!(to - from, chrono::Duration::days(1));

    assert!(prediction_window(start, 4_000_000_000).is_err());
}
