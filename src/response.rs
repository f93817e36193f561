//! JSON response bodies for the published endpoints.
//!
//! Maps analysis results to the payload shapes dashboard clients consume and
//! each error kind to a status code and message. An HTTP layer only has to
//! write `status` and `body`.

use serde_json::{Map, Value, json};

use crate::measures::{GroupBy, Measure};
use crate::model::{
    AnalyticsError, ForecastResult, GroupDistribution, HeatmapMatrix, MalariaRecord,
    SummaryResult,
};
use crate::service::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// HTTP status for a failed request.
pub fn status_for(err: &ServiceError) -> u16 {
    match err {
        ServiceError::Source(_) => 503,
        ServiceError::Analytics(e) => match e {
            AnalyticsError::NoData => 404,
            AnalyticsError::InsufficientHistory { .. }
            | AnalyticsError::InvalidParameter { .. }
            | AnalyticsError::UnknownSelector(_) => 400,
            AnalyticsError::ModelFit(_) | AnalyticsError::Forecast(_) => 500,
        },
    }
}

pub fn error_response(err: &ServiceError) -> ApiResponse {
    ApiResponse::error(status_for(err), err.to_string())
}

/// Success bodies go through `render`, failures through `error_response`.
pub fn respond<T, F>(result: Result<T, ServiceError>, render: F) -> ApiResponse
where
    F: FnOnce(&T) -> Value,
{
    respond_with(result, |value| Ok(render(value)))
}

/// Like `respond`, for bodies that can fail to serialize. A serialization
/// failure is a 500.
pub fn respond_with<T, F>(result: Result<T, ServiceError>, render: F) -> ApiResponse
where
    F: FnOnce(&T) -> Result<Value, serde_json::Error>,
{
    match result {
        Ok(value) => match render(&value) {
            Ok(body) => ApiResponse::ok(body),
            Err(err) => ApiResponse::error(500, format!("Serialization failed: {}", err)),
        },
        Err(err) => error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Records as a JSON array; use with `respond_with`.
pub fn records_body(records: &[MalariaRecord]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(records)
}

pub fn summary_body(summary: &SummaryResult) -> Value {
    json!({
        "column": summary.measure.column(),
        "region_filter": summary.region_filter,
        "site_filter": summary.site_filter,
        "count": summary.count,
        "mean": summary.mean,
        "median": summary.median,
        "min": summary.min,
        "max": summary.max,
        "std": summary.std,
    })
}

/// `{"column", "steps", "forecast": {"YYYY-MM-DD": value, ...}}`.
pub fn forecast_body(forecast: &ForecastResult) -> Value {
    let mut points = Map::new();
    for point in &forecast.points {
        points.insert(point.date.format("%Y-%m-%d").to_string(), json!(point.value));
    }
    json!({
        "column": forecast.measure.column(),
        "steps": forecast.steps,
        "forecast": points,
    })
}

/// `[{"<group_by>": key, "<column>": [values...]}, ...]`.
pub fn box_body(distribution: &GroupDistribution, measure: Measure, group_by: GroupBy) -> Value {
    let rows = distribution
        .groups
        .iter()
        .map(|(key, values)| {
            let mut row = Map::new();
            row.insert(group_by.column().to_string(), json!(key));
            row.insert(measure.column().to_string(), json!(values));
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}

/// `{"groups", "months", "matrix"}`; buckets are month numbers or dates.
pub fn heatmap_body(heatmap: &HeatmapMatrix) -> Value {
    json!({
        "groups": heatmap.groups,
        "months": heatmap.buckets,
        "matrix": heatmap.matrix,
    })
}
