//! Analytics and forecasting over monthly malaria surveillance records.
//!
//! Records come from a `RecordSource` (PostgreSQL in production, an
//! in-memory set in development). The `analysis` components are pure
//! functions over the fetched observations; `service` ties them to a source
//! and `response` shapes their results for an HTTP layer.

pub mod analysis;
pub mod config;
pub mod db;
pub mod dev_mode;
pub mod logging;
pub mod measures;
pub mod model;
pub mod response;
pub mod service;
pub mod source;

pub use analysis::{
    compute_forecast, compute_forecast_with, compute_grouped_distribution, compute_heatmap,
    compute_summary,
};
pub use model::AnalyticsError;
