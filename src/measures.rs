//! Measure and group-by registry for the malaria analytics service.
//!
//! Defines the closed set of numeric measures and grouping columns the
//! service can analyse. This is the single source of truth for column names:
//! no other module spells a column, and only names from here are ever placed
//! into a SQL statement. Request strings are parsed into these enums and
//! rejected if they do not match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::AnalyticsError;

// ---------------------------------------------------------------------------
// Measures
// ---------------------------------------------------------------------------

/// A numeric column of `malaria_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Measure {
    #[serde(rename = "malinc")]
    Malinc,
    #[serde(rename = "propsuspected")]
    PropSuspected,
    #[serde(rename = "TPR", alias = "tpr")]
    Tpr,
}

/// Metadata for a single measure.
pub struct MeasureInfo {
    pub measure: Measure,
    /// Column name in `malaria_records`, as exposed to clients.
    pub column: &'static str,
    /// Short axis label for charts.
    pub label: &'static str,
    pub description: &'static str,
    /// Other accepted spellings, matched case-insensitively.
    pub aliases: &'static [&'static str],
}

/// All measures the service can summarise, group, pivot and forecast.
pub static MEASURE_REGISTRY: &[MeasureInfo] = &[
    MeasureInfo {
        measure: Measure::Malinc,
        column: "malinc",
        label: "Malaria incidence",
        description: "Confirmed malaria cases per 1,000 population for the month.",
        aliases: &["incidence"],
    },
    MeasureInfo {
        measure: Measure::PropSuspected,
        column: "propsuspected",
        label: "Proportion suspected",
        description: "Share of outpatient attendances flagged as suspected malaria.",
        aliases: &["prop_suspected", "proportion_suspected"],
    },
    MeasureInfo {
        measure: Measure::Tpr,
        column: "TPR",
        label: "Test positivity rate",
        description: "Positive tests over tests performed (microscopy and RDT).",
        aliases: &["test_positivity_rate", "positivity"],
    },
];

impl Measure {
    pub fn info(self) -> &'static MeasureInfo {
        // Registry entries are in declaration order.
        match self {
            Measure::Malinc => &MEASURE_REGISTRY[0],
            Measure::PropSuspected => &MEASURE_REGISTRY[1],
            Measure::Tpr => &MEASURE_REGISTRY[2],
        }
    }

    pub fn column(self) -> &'static str {
        self.info().column
    }

    pub fn all() -> impl Iterator<Item = Measure> {
        MEASURE_REGISTRY.iter().map(|m| m.measure)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for Measure {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find_measure(s).ok_or_else(|| AnalyticsError::UnknownSelector(s.to_string()))
    }
}

/// Looks up a measure by column name or alias, ignoring case and
/// surrounding whitespace. Returns `None` if not found.
pub fn find_measure(name: &str) -> Option<Measure> {
    let name = name.trim();
    MEASURE_REGISTRY
        .iter()
        .find(|m| {
            m.column.eq_ignore_ascii_case(name)
                || m.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
        .map(|m| m.measure)
}

// ---------------------------------------------------------------------------
// Group-by selectors
// ---------------------------------------------------------------------------

/// A categorical column used to partition observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Region,
    Site,
}

impl GroupBy {
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Region => "region",
            GroupBy::Site => "site",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for GroupBy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(GroupBy::Region),
            "site" => Ok(GroupBy::Site),
            _ => Err(AnalyticsError::UnknownSelector(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
