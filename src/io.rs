use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};
use crate::config::{ColumnMap, DEFAULT_DATE_FORMAT};
use crate::pivot::Observation;
use crate::{Error, Result};

/// How to read the long-format price file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub columns: ColumnMap,
    pub date_format: String,
    /// Fail on incomplete rows instead of dropping them
    pub strict: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            columns: ColumnMap::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            strict: false,
        }
    }
}

/// Column positions of date, ticker and price in the header row
struct ColumnIndex {
    date: usize,
    ticker: usize,
    price: usize,
}

fn find_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
        .ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            path: path.to_path_buf(),
        })
}

fn locate_columns(headers: &StringRecord, columns: &ColumnMap, path: &Path) -> Result<ColumnIndex> {
    Ok(ColumnIndex {
        date: find_column(headers, &columns.date, path)?,
        ticker: find_column(headers, &columns.ticker, path)?,
        price: find_column(headers, &columns.price, path)?,
    })
}

/// Parse a calendar date, also accepting a timestamp whose leading part is the date
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, format) {
        return Some(date);
    }
    match NaiveDate::parse_and_remainder(value, format) {
        Ok((date, rest)) if rest.starts_with(' ') || rest.starts_with('T') => Some(date),
        _ => None,
    }
}

/// Load (date, ticker, price) observations from a delimited file
///
/// Rows with an empty date, ticker or price are dropped unless `strict` is set.
pub fn load_observations<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Input {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let index = locate_columns(&headers, &options.columns, path)?;

    let mut observations = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        let field = |i: usize| record.get(i).filter(|v| !v.is_empty());
        let (date, ticker, price) = match (field(index.date), field(index.ticker), field(index.price)) {
            (Some(d), Some(t), Some(p)) => (d, t, p),
            _ if options.strict => {
                return Err(Error::IncompleteRow {
                    path: path.to_path_buf(),
                    line,
                });
            }
            _ => {
                dropped += 1;
                continue;
            }
        };

        let date = parse_date(date, &options.date_format).ok_or_else(|| {
            Error::Parse(format!(
                "{}: line {}: invalid date '{}' in column '{}' (expected format {})",
                path.display(),
                line,
                date,
                options.columns.date,
                options.date_format
            ))
        })?;

        let price = price
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| {
                Error::Parse(format!(
                    "{}: line {}: invalid price '{}' in column '{}'",
                    path.display(),
                    line,
                    price,
                    options.columns.price
                ))
            })?;

        observations.push(Observation::new(date, ticker, price));
    }

    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped rows with an empty date, ticker or price");
    }
    if observations.is_empty() {
        return Err(Error::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    debug!(rows = observations.len(), path = %path.display(), "loaded observations");
    Ok(observations)
}

/// Save DataFrame to CSV file
pub fn save_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df.clone())?;

    Ok(())
}
