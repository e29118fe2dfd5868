use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Incomplete row at line {line} in {}", path.display())]
    IncompleteRow { path: PathBuf, line: u64 },

    #[error("No usable observations in {}", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Conflicting prices for {ticker} on {date}: {first} vs {second}")]
    ConflictingObservation {
        date: NaiveDate,
        ticker: String,
        first: f64,
        second: f64,
    },

    #[error("Non-positive price {price} for {ticker} on {date}")]
    NonPositivePrice {
        date: NaiveDate,
        ticker: String,
        price: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
