//! Monthly resampling of irregular observations.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::model::{AnalyticsError, MonthlyPoint, Observation, TimeSeries};

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `n` months after the month containing `date`.
/// Returns `None` past the end of the calendar chrono supports.
pub fn months_after(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(n))
}

/// Averages observations within each calendar month and sorts the months
/// ascending.
///
/// Returns `AnalyticsError::NoData` when there is nothing to resample.
pub fn resample_monthly(observations: &[Observation]) -> Result<TimeSeries, AnalyticsError> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for obs in observations {
        let bucket = buckets.entry(month_start(obs.timestamp)).or_insert((0.0, 0));
        bucket.0 += obs.value;
        bucket.1 += 1;
    }

    if buckets.is_empty() {
        return Err(AnalyticsError::NoData);
    }

    let points = buckets
        .into_iter()
        .map(|(month_start, (sum, n))| MonthlyPoint {
            month_start,
            value: sum / n as f64,
        })
        .collect();

    Ok(TimeSeries::from_sorted(points))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_duplicates_within_month_are_averaged() {
        let input = vec![
            Observation::new(date(2023, 1, 3), 2.0),
            Observation::new(date(2023, 1, 28), 4.0),
            Observation::new(date(2023, 2, 14), 10.0),
        ];
        let series = resample_monthly(&input).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].month_start, date(2023, 1, 1));
        assert_eq!(series.points()[0].value, 3.0);
        assert_eq!(series.points()[1].month_start, date(2023, 2, 1));
        assert_eq!(series.points()[1].value, 10.0);
    }

    #[test]
    fn test_unsorted_input_comes_out_ascending() {
        let input = vec![
            Observation::new(date(2024, 3, 1), 3.0),
            Observation::new(date(2023, 12, 1), 1.0),
            Observation::new(date(2024, 1, 9), 2.0),
        ];
        let series = resample_monthly(&input).unwrap();
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_month(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_regular_monthly_series_passes_through() {
        let input: Vec<Observation> = (1..=12)
            .map(|m| Observation::new(date(2022, m, 1), m as f64 * 1.5))
            .collect();
        let series = resample_monthly(&input).unwrap();
        let expected: Vec<f64> = input.iter().map(|o| o.value).collect();
        assert_eq!(series.values(), expected);
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert_eq!(resample_monthly(&[]), Err(AnalyticsError::NoData));
    }

    #[test]
    fn test_months_after_crosses_year_boundary() {
        assert_eq!(months_after(date(2023, 11, 30), 1), Some(date(2023, 12, 1)));
        assert_eq!(months_after(date(2023, 12, 15), 1), Some(date(2024, 1, 1)));
        assert_eq!(months_after(date(2024, 1, 31), 14), Some(date(2025, 3, 1)));
    }
}
