//! Core data types for the malaria analytics service.
//!
//! This module defines the shared domain model imported by all other modules:
//! observations handed to the analysis components, the results they produce,
//! and the error kinds they report. It contains no logic beyond small
//! accessors and no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::measures::Measure;

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One row of the `malaria_records` table.
///
/// Every column except `id` may be null in storage. Field names on the wire
/// follow the table's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalariaRecord {
    pub id: i64,
    #[serde(rename = "monthyear")]
    pub month_year: Option<NaiveDate>,
    pub site: Option<String>,
    #[serde(rename = "NEWsiteID")]
    pub new_site_id: Option<String>,
    pub region: Option<String>,
    pub malinc: Option<f64>,
    pub propsuspected: Option<f64>,
    #[serde(rename = "TPR")]
    pub tpr: Option<f64>,
}

impl MalariaRecord {
    /// Value of `measure` for this record, if present.
    pub fn measure_value(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Malinc => self.malinc,
            Measure::PropSuspected => self.propsuspected,
            Measure::Tpr => self.tpr,
        }
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single measurement of one measure at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: NaiveDate, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// An observation tagged with its region or site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedObservation {
    pub timestamp: NaiveDate,
    pub group_key: String,
    pub value: f64,
}

impl GroupedObservation {
    pub fn new(timestamp: NaiveDate, group_key: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp,
            group_key: group_key.into(),
            value,
        }
    }
}

/// Upstream region/site restriction for observation queries.
///
/// The summary component only echoes these back; filtering happens in the
/// record source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationFilter {
    pub region: Option<String>,
    pub site: Option<String>,
}

impl ObservationFilter {
    pub fn region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            site: None,
        }
    }

    pub fn site(site: impl Into<String>) -> Self {
        Self {
            region: None,
            site: Some(site.into()),
        }
    }

    /// Returns true when a record with this region and site passes the filter.
    pub fn matches(&self, region: Option<&str>, site: Option<&str>) -> bool {
        let region_ok = match &self.region {
            Some(wanted) => region == Some(wanted.as_str()),
            None => true,
        };
        let site_ok = match &self.site {
            Some(wanted) => site == Some(wanted.as_str()),
            None => true,
        };
        region_ok && site_ok
    }
}

// ---------------------------------------------------------------------------
// Monthly series
// ---------------------------------------------------------------------------

/// One month of a resampled series. `month_start` is always day 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month_start: NaiveDate,
    pub value: f64,
}

/// A series on a strict monthly grid: ascending, at most one point per month.
///
/// Only `analysis::resample::resample_monthly` builds these, which is what
/// upholds the ordering invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    points: Vec<MonthlyPoint>,
}

impl TimeSeries {
    pub(crate) fn from_sorted(points: Vec<MonthlyPoint>) -> Self {
        debug_assert!(
            points.windows(2).all(|w| w[0].month_start < w[1].month_start),
            "monthly points must be strictly increasing"
        );
        Self { points }
    }

    pub fn points(&self) -> &[MonthlyPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First day of the last month in the series.
    pub fn last_month(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.month_start)
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Descriptive statistics for one measure. Floats are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    #[serde(rename = "column")]
    pub measure: Measure,
    pub region_filter: Option<String>,
    pub site_filter: Option<String>,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by N).
    pub std: f64,
}

/// Group key → raw values, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub groups: Vec<(String, Vec<f64>)>,
}

impl GroupDistribution {
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Heatmap column label: calendar month number, or the timestamp itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum TimeBucket {
    Month(u32),
    Date(NaiveDate),
}

/// Mean measure value by (group, time bucket).
///
/// `matrix` holds 0.0 where no observations exist. `counts` carries the
/// number of observations behind each cell so a measured zero can be told
/// apart from a missing cell; use [`HeatmapMatrix::cell`] for that.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    pub groups: Vec<String>,
    pub buckets: Vec<TimeBucket>,
    pub matrix: Vec<Vec<f64>>,
    pub counts: Vec<Vec<usize>>,
}

impl HeatmapMatrix {
    /// Mean for row `i`, column `j`, or `None` if the cell had no observations.
    pub fn cell(&self, i: usize, j: usize) -> Option<f64> {
        match self.counts.get(i)?.get(j)? {
            0 => None,
            _ => self.matrix.get(i)?.get(j).copied(),
        }
    }
}

/// One projected month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Point forecasts for the months after the last observed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    #[serde(rename = "column")]
    pub measure: Measure,
    pub steps: usize,
    pub points: Vec<ForecastPoint>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Request-scoped failures of the analysis components.
///
/// All kinds are deterministic in their input: retrying with the same
/// observations reproduces the same error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyticsError {
    /// Nothing left to analyse after filtering or resampling.
    #[error("No data found for given filters.")]
    NoData,
    /// Too few monthly points to fit the configured model order.
    #[error("Insufficient history: need at least {required} monthly points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    /// The estimation procedure failed or the series is degenerate.
    #[error("Model fitting failed: {0}")]
    ModelFit(String),
    /// The fitted model could not produce projections.
    #[error("Forecasting failed: {0}")]
    Forecast(String),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
    /// A measure or group-by name outside the registry.
    #[error("Unknown selector: {0}")]
    UnknownSelector(String),
}
