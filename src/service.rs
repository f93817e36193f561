//! Request handling on top of a record source.
//!
//! One method per published endpoint: fetch what the request needs from the
//! source, hand it to the matching analysis component, log the outcome.
//! Transport is someone else's job; see `response` for the JSON shapes.

use crate::analysis::{self, ForecastConfig};
use crate::logging::{self, Component};
use crate::measures::{GroupBy, Measure};
use crate::model::{
    AnalyticsError, ForecastResult, GroupDistribution, HeatmapMatrix, MalariaRecord,
    ObservationFilter, SummaryResult,
};
use crate::source::{RecordSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

pub struct AnalyticsService<S: RecordSource> {
    source: S,
    forecast: ForecastConfig,
}

impl<S: RecordSource> AnalyticsService<S> {
    pub fn new(source: S, forecast: ForecastConfig) -> Self {
        Self { source, forecast }
    }

    pub fn forecast_config(&self) -> &ForecastConfig {
        &self.forecast
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// All raw records.
    pub fn records(&mut self) -> Result<Vec<MalariaRecord>, ServiceError> {
        let records = self.source.fetch_records().map_err(ServiceError::from);
        finish(Component::Records, "records", "fetch", records, |r| {
            (r.len(), format!("{} records", r.len()))
        })
    }

    /// Summary statistics of `measure`, optionally for one region and/or site.
    pub fn summary_stats(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<SummaryResult, ServiceError> {
        let result = self
            .source
            .fetch_values(measure, filter)
            .map_err(ServiceError::from)
            .and_then(|values| Ok(analysis::compute_summary(measure, &values, filter)?));
        finish(Component::Summary, measure.column(), "summary", result, |s| {
            (s.count, format!("mean {} over {} values", s.mean, s.count))
        })
    }

    /// Forecast of `measure`; `steps` defaults to the configured value.
    pub fn forecast(
        &mut self,
        measure: Measure,
        steps: Option<usize>,
    ) -> Result<ForecastResult, ServiceError> {
        let steps = steps.unwrap_or(self.forecast.default_steps);
        let config = &self.forecast;
        let result = self
            .source
            .fetch_observations(measure, &ObservationFilter::default())
            .map_err(ServiceError::from)
            .and_then(|obs| {
                Ok(analysis::compute_forecast_with(measure, &obs, steps, config)?)
            });
        finish(Component::Forecast, measure.column(), "forecast", result, |f| {
            (f.points.len(), format!("{} months with {}", f.steps, config.order))
        })
    }

    /// Values of `measure` partitioned by region or site.
    pub fn box_data(
        &mut self,
        measure: Measure,
        group_by: GroupBy,
    ) -> Result<GroupDistribution, ServiceError> {
        let result = self
            .source
            .fetch_grouped_observations(measure, group_by)
            .map_err(ServiceError::from)
            .map(|obs| analysis::compute_grouped_distribution(&obs));
        finish(Component::Distribution, measure.column(), "box data", result, |d| {
            let rows = d.groups.iter().map(|(_, v)| v.len()).sum();
            (rows, format!("{} groups by {}", d.len(), group_by))
        })
    }

    /// Mean of `measure` by group and month (or by date when
    /// `extract_month` is false).
    pub fn heatmap_data(
        &mut self,
        measure: Measure,
        group_by: GroupBy,
        extract_month: bool,
    ) -> Result<HeatmapMatrix, ServiceError> {
        let result = self
            .source
            .fetch_grouped_observations(measure, group_by)
            .map_err(ServiceError::from)
            .map(|obs| analysis::compute_heatmap(&obs, extract_month));
        finish(Component::Heatmap, measure.column(), "heatmap", result, |h| {
            let rows = h.counts.iter().flatten().sum();
            (rows, format!("{}x{} matrix", h.groups.len(), h.buckets.len()))
        })
    }
}

/// Logs the outcome of a request and passes it through.
fn finish<T, F>(
    component: Component,
    context: &str,
    operation: &str,
    result: Result<T, ServiceError>,
    describe: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(&T) -> (usize, String),
{
    match &result {
        Ok(value) => {
            let (rows, outcome) = describe(value);
            logging::log_request_summary(component, context, rows, &outcome);
        }
        Err(err) => logging::log_request_failure(component, context, operation, err),
    }
    result
}
