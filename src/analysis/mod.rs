//! Analysis components for the malaria analytics service.
//!
//! Each component is a pure function over observations already fetched by a
//! `RecordSource`; none of them performs I/O or depends on another.
//!
//! Submodules:
//! - `summary`: count, mean, median, min, max and population std.
//! - `grouping`: partitions values by region or site for box/violin plots.
//! - `heatmap`: mean value pivoted by group and month (or date).
//! - `resample`: averages irregular observations onto a monthly grid.
//! - `arima`: conditional-sum-of-squares ARIMA estimation.
//! - `forecast`: resample, fit, project and date the forecast.

pub mod arima;
pub mod forecast;
pub mod grouping;
pub mod heatmap;
pub mod resample;
pub mod summary;

pub use forecast::{ForecastConfig, compute_forecast, compute_forecast_with};
pub use grouping::compute_grouped_distribution;
pub use heatmap::compute_heatmap;
pub use summary::compute_summary;

/// Rounds to 2 decimal places, the precision of every published figure.
///
/// Rounds the exact decimal expansion of `value`, ties to even, so 0.125
/// gives 0.12 and 2.675 (stored as 2.67499...) gives 2.67.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.118_033_988), 1.12);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(-0.004), -0.0);
        assert_eq!(round2(3.14159), 3.14);
    }

    #[test]
    fn test_round2_ties_go_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(2.675), 2.67, "2.675 is stored just below the tie");
        assert_eq!(round2(1.005), 1.0);
    }
}
