//! Development mode record source.
//!
//! When no database is available, serve a fixed set of records from memory,
//! typically loaded from a JSON export of `malaria_records` (the same shape
//! the records endpoint returns). Used by the integration tests too.

use std::fs;
use std::path::Path;

use crate::logging::{self, Component};
use crate::measures::{GroupBy, Measure};
use crate::model::{GroupedObservation, MalariaRecord, Observation, ObservationFilter};
use crate::source::{RecordSource, SourceError};

/// A record source backed by a `Vec`, sorted by `id`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<MalariaRecord>,
}

impl InMemorySource {
    pub fn new(mut records: Vec<MalariaRecord>) -> Self {
        records.sort_by_key(|r| r.id);
        Self { records }
    }

    /// Parses a JSON array of records.
    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let records: Vec<MalariaRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    /// Loads a JSON array of records from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let source = Self::from_json_str(&text)?;
        logging::info(
            Component::System,
            None,
            &format!("Loaded {} records from {}", source.len(), path.display()),
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn group_key(record: &MalariaRecord, group_by: GroupBy) -> Option<&str> {
    match group_by {
        GroupBy::Region => record.region.as_deref(),
        GroupBy::Site => record.site.as_deref(),
    }
}

impl RecordSource for InMemorySource {
    fn fetch_records(&mut self) -> Result<Vec<MalariaRecord>, SourceError> {
        Ok(self.records.clone())
    }

    fn fetch_values(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<f64>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r.region.as_deref(), r.site.as_deref()))
            .filter_map(|r| r.measure_value(measure))
            .collect())
    }

    fn fetch_observations(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r.region.as_deref(), r.site.as_deref()))
            .filter_map(|r| Some(Observation::new(r.month_year?, r.measure_value(measure)?)))
            .collect())
    }

    fn fetch_grouped_observations(
        &mut self,
        measure: Measure,
        group_by: GroupBy,
    ) -> Result<Vec<GroupedObservation>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter_map(|r| {
                Some(GroupedObservation::new(
                    r.month_year?,
                    group_key(r, group_by)?,
                    r.measure_value(measure)?,
                ))
            })
            .collect())
    }
}
