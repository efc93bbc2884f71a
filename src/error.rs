use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures that abort a query. An empty result is not one of them, see
/// [`crate::query::QueryOutcome::NoMatchingData`].
#[derive(Debug, Error)]
pub enum KapalError {
    #[error("Unknown month name: {0:?}")]
    UnknownMonthName(String),
    #[error("Missing {dimension} value{}", at_row(.row))]
    MissingDimensionValue {
        dimension: &'static str,
        row: Option<usize>,
    },
    #[error("Year {year} is not a positive year{}", at_row(.row))]
    InvalidYear { year: i32, row: Option<usize> },
    #[error("Column {column} must be {expected}, found {found}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: String,
    },
    #[error("Invalid {column} amount {value:?} in record {row}")]
    InvalidAmount {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Invalid range: {from} is after {to}")]
    InvalidRange { from: String, to: String },
    #[error("Amount {0} cannot be represented at the ledger scale")]
    AmountOutOfRange(String),
    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(String),
    #[error("Frame error: {0}")]
    Frame(#[from] PolarsError),
}

fn at_row(row: &Option<usize>) -> String {
    row.map(|row| format!(" in record {row}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, KapalError>;
