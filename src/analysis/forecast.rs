//! Monthly forecasting of a single measure.
//!
//! Observations are averaged onto a monthly grid, an ARIMA model of the
//! configured order (ARIMA(1,1,1) by default) is fitted, and the projections
//! are dated on the first of each following month.

use serde::{Deserialize, Serialize};

use crate::analysis::arima::{self, ArimaOrder, FitOptions};
use crate::analysis::resample::{months_after, resample_monthly};
use crate::analysis::round2;
use crate::measures::Measure;
use crate::model::{AnalyticsError, ForecastPoint, ForecastResult, Observation};

/// Months projected when the caller does not ask for a number.
pub const DEFAULT_STEPS: usize = 12;

/// Forecast policy. Every field has a default, so a config file may set any
/// subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Model order. Fixed at ARIMA(1,1,1) unless overridden here.
    pub order: ArimaOrder,
    pub default_steps: usize,
    /// Optional upper bound on requested steps; unbounded when `None`.
    pub max_steps: Option<usize>,
    /// Fewest monthly points a fit is attempted on.
    pub min_history: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::FIXED,
            default_steps: DEFAULT_STEPS,
            max_steps: None,
            min_history: 3,
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

impl ForecastConfig {
    /// Monthly points needed before fitting: `min_history`, and never fewer
    /// than the order itself can use.
    pub fn required_history(&self) -> usize {
        self.min_history.max(self.order.p + self.order.d + 1)
    }

    fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

/// Forecasts `steps` months of `measure` with the default configuration.
pub fn compute_forecast(
    measure: Measure,
    observations: &[Observation],
    steps: usize,
) -> Result<ForecastResult, AnalyticsError> {
    compute_forecast_with(measure, observations, steps, &ForecastConfig::default())
}

/// Forecasts `steps` months of `measure` under `config`.
///
/// Errors, in the order they are checked:
/// - `InvalidParameter` if `steps` is 0 or above a configured `max_steps`
/// - `NoData` if there are no observations
/// - `InsufficientHistory` if the monthly series is shorter than
///   `config.required_history()`
/// - `ModelFit` if estimation fails
/// - `Forecast` if the projections or their dates cannot be produced
pub fn compute_forecast_with(
    measure: Measure,
    observations: &[Observation],
    steps: usize,
    config: &ForecastConfig,
) -> Result<ForecastResult, AnalyticsError> {
    if steps == 0 || config.max_steps.is_some_and(|max| steps > max) {
        let reason = match config.max_steps {
            Some(max) => format!("must be between 1 and {}, got {}", max, steps),
            None => format!("must be at least 1, got {}", steps),
        };
        return Err(AnalyticsError::InvalidParameter {
            name: "steps".to_string(),
            reason,
        });
    }

    let series = resample_monthly(observations)?;
    let required = config.required_history();
    if series.len() < required {
        return Err(AnalyticsError::InsufficientHistory {
            required,
            actual: series.len(),
        });
    }
    let last_month = series.last_month().ok_or(AnalyticsError::NoData)?;

    let model = arima::fit(&series.values(), config.order, &config.fit_options())?;
    let values = model.forecast(steps)?;

    let points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let date = months_after(last_month, i as u32 + 1).ok_or_else(|| {
                AnalyticsError::Forecast(format!(
                    "date {} months after {} is out of range",
                    i + 1,
                    last_month
                ))
            })?;
            Ok(ForecastPoint {
                date,
                value: round2(value),
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    Ok(ForecastResult {
        measure,
        steps,
        points,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
