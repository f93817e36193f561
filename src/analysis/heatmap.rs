//! Pivoted heatmap of mean measure values by group and time bucket.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use crate::model::{GroupedObservation, HeatmapMatrix, TimeBucket};

/// Buckets a timestamp: its calendar month number when `extract_month` is
/// set, otherwise the date itself.
pub fn time_bucket(obs: &GroupedObservation, extract_month: bool) -> TimeBucket {
    if extract_month {
        TimeBucket::Month(obs.timestamp.month())
    } else {
        TimeBucket::Date(obs.timestamp)
    }
}

/// Pivots `observations` into a dense group × bucket matrix of means.
///
/// Rows are the distinct group keys and columns the distinct buckets, both
/// sorted ascending. Cells with no observations are 0.0 in `matrix` and 0 in
/// `counts`.
pub fn compute_heatmap(observations: &[GroupedObservation], extract_month: bool) -> HeatmapMatrix {
    let mut cells: BTreeMap<(&str, TimeBucket), (f64, usize)> = BTreeMap::new();
    let mut groups: BTreeSet<&str> = BTreeSet::new();
    let mut buckets: BTreeSet<TimeBucket> = BTreeSet::new();

    for obs in observations {
        let bucket = time_bucket(obs, extract_month);
        groups.insert(obs.group_key.as_str());
        buckets.insert(bucket);
        let cell = cells.entry((obs.group_key.as_str(), bucket)).or_insert((0.0, 0));
        cell.0 += obs.value;
        cell.1 += 1;
    }

    let buckets: Vec<TimeBucket> = buckets.into_iter().collect();
    let mut matrix = Vec::with_capacity(groups.len());
    let mut counts = Vec::with_capacity(groups.len());

    for &group in &groups {
        let mut row = Vec::with_capacity(buckets.len());
        let mut row_counts = Vec::with_capacity(buckets.len());
        for &bucket in &buckets {
            match cells.get(&(group, bucket)) {
                Some(&(sum, n)) => {
                    row.push(sum / n as f64);
                    row_counts.push(n);
                }
                None => {
                    row.push(0.0);
                    row_counts.push(0);
                }
            }
        }
        matrix.push(row);
        counts.push(row_counts);
    }

    HeatmapMatrix {
        groups: groups.into_iter().map(String::from).collect(),
        buckets,
        matrix,
        counts,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
