//! # Query Entry Point
//!
//! `predict_events(model, start, end, filter)` is the single query the
//! library answers. It ties the pipeline together:
//!
//! 1. Validate the window
//! 2. Fetch node factors for every year the window touches, plus one year
//!    either side for boundary blending, from the shared cache
//! 3. Build one [`TideFunction`] and extract events year by year
//! 4. Add sun and moon events if the filter asks for any
//! 5. Assemble, attaching any warnings
//!
//! A [`Predictor`] owns the node-factor cache and tuning options. It is
//! `Send + Sync`; share one behind an `Arc` across worker threads.

use crate::assemble::{assemble, EventSequence};
use crate::astronomy::{year_start, NodeFactorCache, SUPPORTED_YEARS};
use crate::ephemeris;
use crate::error::{PredictionWarning, TideError};
use crate::extract::{self, DEFAULT_MAX_STEP_SECS};
use crate::filter::EventFilter;
use crate::model::{HarmonicModel, StationType};
use crate::synth::{TideFunction, DEFAULT_BLEND_HOURS};
use crate::{EventKind, TideEvent};
use chrono::{DateTime, Datelike, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Tuning knobs for a [`Predictor`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionOptions {
    /// Half-width of the interpolation window around January 1, hours.
    /// Zero disables blending.
    pub year_blend_hours: f64,
    /// Upper bound on the extrema scan step, seconds
    pub max_scan_step_secs: f64,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        PredictionOptions {
            year_blend_hours: DEFAULT_BLEND_HOURS,
            max_scan_step_secs: DEFAULT_MAX_STEP_SECS,
        }
    }
}

/// Answers prediction queries, memoizing node factors between them.
#[derive(Debug, Default)]
pub struct Predictor {
    cache: Arc<NodeFactorCache>,
    options: PredictionOptions,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PredictionOptions) -> Self {
        Predictor {
            cache: Arc::new(NodeFactorCache::new()),
            options,
        }
    }

    /// Share an existing cache, e.g. between predictors with different options.
    pub fn with_cache(cache: Arc<NodeFactorCache>, options: PredictionOptions) -> Self {
        Predictor { cache, options }
    }

    pub fn options(&self) -> &PredictionOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<NodeFactorCache> {
        &self.cache
    }

    /// Synthesized function covering `first_year..=last_year`.
    ///
    /// Those years must be supported; the neighbouring years are folded in
    /// for blending when they are supported too.
    pub fn tide_function(
        &self,
        model: &HarmonicModel,
        first_year: i32,
        last_year: i32,
    ) -> Result<TideFunction, TideError> {
        let mut factors = Vec::new();
        for year in (first_year - 1)..=(last_year + 1) {
            let required = (first_year..=last_year).contains(&year);
            if required || SUPPORTED_YEARS.contains(&year) {
                factors.push(self.cache.get_or_compute(year)?);
            }
        }
        TideFunction::new(model, &factors, self.options.year_blend_hours)
    }

    /// Every event of a kind in `filter` within `[start, end)`, in order.
    pub fn predict_events(
        &self,
        model: &HarmonicModel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &EventFilter,
    ) -> Result<EventSequence, TideError> {
        if end <= start {
            return Err(TideError::InvalidRange { start, end });
        }

        let first_year = start.year();
        let last_year = (end - Duration::nanoseconds(1)).year();
        let function = self.tide_function(model, first_year, last_year)?;
        debug!(
            "predicting {} from {start} to {end} ({} constituents)",
            model.name(),
            model.constituents().len()
        );

        let mut raw = Vec::new();
        let mut warnings = Vec::new();

        let water = match model.station_type() {
            StationType::Height => EventFilter::tides(),
            StationType::Current => EventFilter::currents(),
        };
        if !filter.intersection(water).is_empty() {
            for year in first_year..=last_year {
                let sub_start = year_start(year)?.max(start);
                let sub_end = match year_start(year + 1) {
                    Ok(next) => next.min(end),
                    Err(_) => end,
                };
                raw.extend(extract::tide_events(
                    &function,
                    model.station_type(),
                    sub_start,
                    sub_end,
                    self.options.max_scan_step_secs,
                ));
            }

            if is_degenerate(&function, &raw, start, end) {
                warn!(
                    "station {} shows no tidal extrema between {start} and {end}",
                    model.name()
                );
                warnings.push(PredictionWarning::DegenerateStation {
                    station: model.name().to_string(),
                });
            }
        }

        if filter.wants_astronomical() {
            raw.extend(ephemeris::astronomical_events(
                model.coordinates(),
                start,
                end,
                filter,
            ));
        }

        let mut sequence = assemble(raw, filter);
        for warning in warnings {
            sequence.push_warning(warning);
        }
        debug!("{}: {} events", model.name(), sequence.len());
        Ok(sequence)
    }
}

/// No extrema where some were expected.
fn is_degenerate(
    function: &TideFunction,
    raw: &[TideEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    let found_extrema = raw.iter().any(|e| {
        matches!(
            e.kind,
            EventKind::HighTide | EventKind::LowTide | EventKind::MaxCurrent | EventKind::MinCurrent
        )
    });
    if found_extrema {
        return false;
    }
    let window_hours = (end - start).num_seconds() as f64 / 3600.0;
    function.is_flat()
        || function
            .dominant_period_hours()
            .is_some_and(|period| window_hours >= period)
}

/// Predict with a process-wide default [`Predictor`].
pub fn predict_events(
    model: &HarmonicModel,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: &EventFilter,
) -> Result<EventSequence, TideError> {
    static SHARED: OnceLock<Predictor> = OnceLock::new();
    SHARED
        .get_or_init(Predictor::new)
        .predict_events(model, start, end, filter)
}
