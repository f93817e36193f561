//! The record source seam.
//!
//! Analysis components never query storage; a `RecordSource` hands them
//! observations already filtered and projected. `db::PostgresSource` reads
//! the live table, `dev_mode::InMemorySource` serves a fixed record set.

use crate::measures::{GroupBy, Measure};
use crate::model::{GroupedObservation, MalariaRecord, Observation, ObservationFilter};

/// Errors that can arise while fetching records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Connected, but the records table is not there.
    #[error("Table not found: {0}")]
    MissingTable(String),
}

/// Supplies observations to the analysis components.
///
/// Implementations skip rows whose measure is null. Dated queries also skip
/// rows whose date is null, and grouped queries rows whose group key is
/// null. Rows come back in `id` order.
pub trait RecordSource {
    /// Every record, nulls included.
    fn fetch_records(&mut self) -> Result<Vec<MalariaRecord>, SourceError>;

    /// Non-null values of `measure` restricted by `filter`, dated or not.
    fn fetch_values(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<f64>, SourceError>;

    /// `(date, value)` pairs for `measure`, restricted by `filter`.
    fn fetch_observations(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>, SourceError>;

    /// `(date, group, value)` triples for `measure`, grouped by `group_by`.
    fn fetch_grouped_observations(
        &mut self,
        measure: Measure,
        group_by: GroupBy,
    ) -> Result<Vec<GroupedObservation>, SourceError>;
}
