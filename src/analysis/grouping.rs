//! Stable partitioning of grouped observations.
//!
//! Organizes a flat list of observations into per-group value lists for box
//! and violin plots. No statistics are applied here; rendering is up to the
//! caller.

use std::collections::HashMap;

use crate::model::{GroupDistribution, GroupedObservation};

/// Partitions `observations` by group key.
///
/// Groups are listed in order of first appearance and each group's values
/// keep their input order.
pub fn compute_grouped_distribution(observations: &[GroupedObservation]) -> GroupDistribution {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    for obs in observations {
        let slot = *index.entry(obs.group_key.as_str()).or_insert_with(|| {
            groups.push((obs.group_key.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(obs.value);
    }

    GroupDistribution { groups }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
