use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the filter and aggregation engines and the session store.
#[derive(Debug, Error)]
pub enum InsightError {
    /// A page ran before any dataset was loaded into the session.
    #[error("No data loaded. Load a file first.")]
    NoDataLoaded,

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column '{column}' is not numeric (found {dtype})")]
    NotNumeric { column: String, dtype: String },

    #[error("invalid percentile range {low}..{high} for column '{column}': bounds must satisfy 0 <= low <= high <= 100")]
    InvalidPercentileRange { column: String, low: f64, high: f64 },

    /// A filter expression from the command line could not be parsed.
    #[error("invalid filter '{0}'")]
    InvalidFilter(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl InsightError {
    /// True for errors that mean "this optional feature is unavailable for the
    /// loaded schema"; callers skip the feature instead of aborting.
    pub fn is_schema_gap(&self) -> bool {
        matches!(self, Self::ColumnNotFound(_) | Self::NotNumeric { .. })
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
