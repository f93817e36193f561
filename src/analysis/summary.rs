//! Descriptive statistics for one measure.

use crate::analysis::round2;
use crate::measures::Measure;
use crate::model::{AnalyticsError, ObservationFilter, SummaryResult};

/// Reduces `values` to count, mean, median, min, max and population
/// standard deviation, each rounded to 2 decimals.
///
/// `filter` is echoed back in the result only; the values are expected to be
/// filtered already.
///
/// Returns `AnalyticsError::NoData` for an empty slice so callers can tell
/// "nothing matched" apart from a genuine mean of zero.
pub fn compute_summary(
    measure: Measure,
    values: &[f64],
    filter: &ObservationFilter,
) -> Result<SummaryResult, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NoData);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    // Population variance: divide by N, not N - 1.
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Ok(SummaryResult {
        measure,
        region_filter: filter.region.clone(),
        site_filter: filter.site.clone(),
        count: values.len(),
        mean: round2(mean),
        median: round2(median),
        min: round2(sorted[0]),
        max: round2(sorted[sorted.len() - 1]),
        std: round2(variance.sqrt()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(values: &[f64]) -> SummaryResult {
        compute_summary(Measure::Malinc, values, &ObservationFilter::default())
            .expect("non-empty input should summarise")
    }

    #[test]
    fn test_four_value_summary() {
        let s = summarize(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        // sqrt(1.25) = 1.118..., population rather than sample (1.29).
        assert_eq!(s.std, 1.12);
    }

    #[test]
    fn test_empty_input_is_no_data_not_zero() {
        let result = compute_summary(Measure::Tpr, &[], &ObservationFilter::default());
        assert_eq!(result, Err(AnalyticsError::NoData));
    }

    #[test]
    fn test_odd_count_median_is_middle_value() {
        let s = summarize(&[9.0, 1.0, 5.0]);
        assert_eq!(s.median, 5.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn test_single_value_has_zero_std() {
        let s = summarize(&[7.25]);
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, 7.25);
        assert_eq!(s.median, 7.25);
        assert_eq!(s.std, 0.0);
    }

    #[test]
    fn test_filter_is_echoed_back() {
        let filter = ObservationFilter {
            region: Some("Northern".to_string()),
            site: Some("Gulu".to_string()),
        };
        let s = compute_summary(Measure::PropSuspected, &[0.4, 0.6], &filter).unwrap();
        assert_eq!(s.measure, Measure::PropSuspected);
        assert_eq!(s.region_filter.as_deref(), Some("Northern"));
        assert_eq!(s.site_filter.as_deref(), Some("Gulu"));
    }

    #[test]
    fn test_proportion_ties_round_to_even() {
        let filter = ObservationFilter::default();
        let s = compute_summary(Measure::PropSuspected, &[0.25, 0.0], &filter).unwrap();
        assert_eq!(s.mean, 0.12, "mean 0.125 should round down to even");
        assert_eq!(s.median, 0.12);
        assert_eq!(s.std, 0.12);

        let s = summarize(&[0.5, 0.75]);
        assert_eq!(s.median, 0.62, "median 0.625 should round down to even");
    }

    #[test]
    fn test_ordering_bounds_hold_for_skewed_input() {
        let values = [0.1, 0.1, 0.1, 0.2, 15.0, 0.3, 0.05];
        let s = summarize(&values);
        assert!(s.min <= s.mean && s.mean <= s.max, "mean out of bounds: {:?}", s);
        assert!(s.min <= s.median && s.median <= s.max, "median out of bounds: {:?}", s);
        assert!(s.std >= 0.0);
    }
}
