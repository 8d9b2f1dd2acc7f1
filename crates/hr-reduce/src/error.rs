//! Error types for the reduction driver.

use hr_aggregation::AggregationError;
use hr_graph::GraphError;

use crate::settings::SettingsError;

pub type ReduceResult<T> = Result<T, ReduceError>;

/// Errors that abort a reduction run or a settings load.
///
/// Matchers that cannot build one particular aggregate do not end up here;
/// the driver records those in the report and goes on.
#[derive(thiserror::Error, Debug)]
pub enum ReduceError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
