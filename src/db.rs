//! PostgreSQL record source.
//!
//! Reads the surveillance table through the blocking `postgres` client.
//! Measure and group-by columns come from `measures`, so the only text
//! spliced into a statement is a registry column name or the configured
//! table name; region and site filters are bound parameters.

use chrono::NaiveDate;
use postgres::types::ToSql;
use postgres::{Client, NoTls};

use crate::config::DatabaseConfig;
use crate::logging::{self, Component};
use crate::measures::{GroupBy, Measure};
use crate::model::{GroupedObservation, MalariaRecord, Observation, ObservationFilter};
use crate::source::{RecordSource, SourceError};

pub struct PostgresSource {
    client: Client,
    table: String,
}

impl PostgresSource {
    /// Opens a connection using `config`.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, SourceError> {
        let client = Client::connect(&config.connection_string(), NoTls)?;
        logging::info(
            Component::Database,
            None,
            &format!("Connected to {} on {}", config.name, config.host),
        );
        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }

    /// Opens a connection and checks that the records table exists.
    pub fn connect_and_verify(config: &DatabaseConfig) -> Result<Self, SourceError> {
        let mut source = Self::connect(config)?;
        source.verify_table()?;
        Ok(source)
    }

    /// Wraps an existing client, e.g. one shared with test setup code.
    pub fn from_client(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn verify_table(&mut self) -> Result<(), SourceError> {
        let row = self
            .client
            .query_one("SELECT to_regclass($1)::text", &[&self.table])?;
        let found: Option<String> = row.get(0);
        match found {
            Some(_) => Ok(()),
            None => {
                logging::error(
                    Component::Database,
                    Some(self.table.as_str()),
                    "records table not found",
                );
                Err(SourceError::MissingTable(self.table.clone()))
            }
        }
    }
}

/// `WHERE` clause selecting non-null values of `measure` with a date.
fn base_conditions(measure: Measure) -> String {
    format!("{} IS NOT NULL AND monthyear IS NOT NULL", measure.column())
}

/// Appends bound region/site conditions to `query`.
fn push_filter<'a>(
    query: &mut String,
    params: &mut Vec<&'a (dyn ToSql + Sync)>,
    filter: &'a ObservationFilter,
) {
    if let Some(region) = &filter.region {
        params.push(region);
        query.push_str(&format!(" AND region = ${}", params.len()));
    }
    if let Some(site) = &filter.site {
        params.push(site);
        query.push_str(&format!(" AND site = ${}", params.len()));
    }
}

impl RecordSource for PostgresSource {
    fn fetch_records(&mut self) -> Result<Vec<MalariaRecord>, SourceError> {
        let query = format!(
            "SELECT id::bigint, monthyear, site, NEWsiteID::text, region, \
                    malinc::float8, propsuspected::float8, TPR::float8 \
             FROM {} ORDER BY id",
            self.table
        );
        let rows = self.client.query(query.as_str(), &[])?;

        let records = rows
            .iter()
            .map(|row| MalariaRecord {
                id: row.get(0),
                month_year: row.get::<_, Option<NaiveDate>>(1),
                site: row.get(2),
                new_site_id: row.get(3),
                region: row.get(4),
                malinc: row.get(5),
                propsuspected: row.get(6),
                tpr: row.get(7),
            })
            .collect();
        Ok(records)
    }

    fn fetch_values(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<f64>, SourceError> {
        let mut query = format!(
            "SELECT {column}::float8 FROM {table} WHERE {column} IS NOT NULL",
            column = measure.column(),
            table = self.table,
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY id");

        let rows = self.client.query(query.as_str(), &params)?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn fetch_observations(
        &mut self,
        measure: Measure,
        filter: &ObservationFilter,
    ) -> Result<Vec<Observation>, SourceError> {
        let mut query = format!(
            "SELECT monthyear, {}::float8 FROM {} WHERE {}",
            measure.column(),
            self.table,
            base_conditions(measure)
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY id");

        let rows = self.client.query(query.as_str(), &params)?;
        Ok(rows
            .iter()
            .map(|row| Observation::new(row.get(0), row.get(1)))
            .collect())
    }

    fn fetch_grouped_observations(
        &mut self,
        measure: Measure,
        group_by: GroupBy,
    ) -> Result<Vec<GroupedObservation>, SourceError> {
        let query = format!(
            "SELECT monthyear, {group}, {column}::float8 FROM {table} \
             WHERE {conditions} AND {group} IS NOT NULL ORDER BY id",
            group = group_by.column(),
            column = measure.column(),
            table = self.table,
            conditions = base_conditions(measure),
        );

        let rows = self.client.query(query.as_str(), &[])?;
        Ok(rows
            .iter()
            .map(|row| GroupedObservation {
                timestamp: row.get(0),
                group_key: row.get(1),
                value: row.get(2),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_conditions_use_registry_column() {
        assert_eq!(
            base_conditions(Measure::Tpr),
            "TPR IS NOT NULL AND monthyear IS NOT NULL"
        );
        assert_eq!(
            base_conditions(Measure::PropSuspected),
            "propsuspected IS NOT NULL AND monthyear IS NOT NULL"
        );
    }
}
