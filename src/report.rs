use polars::prelude::*;
use std::fmt::Write as FmtWrite;
use crate::analysis::{Analysis, CovarianceMatrix, MeanReturns};
use crate::Result;

const MISSING: &str = "NaN";
const MIN_WIDTH: usize = 12;

fn cell(value: Option<f64>, width: usize) -> String {
    match value {
        Some(v) => format!("{:>width$.6}", v, width = width),
        None => format!("{:>width$}", MISSING, width = width),
    }
}

fn label_width(labels: &[String]) -> usize {
    labels
        .iter()
        .map(|l| l.len() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_WIDTH)
}

/// Format ticker-labelled mean returns, one per line
pub fn format_mean_returns(means: &MeanReturns) -> String {
    let mut output = String::new();
    let width = label_width(&means.tickers);

    for (ticker, value) in means.tickers.iter().zip(means.values.iter()) {
        writeln!(output, "{:<width$}{}", ticker, cell(*value, MIN_WIDTH), width = width).unwrap();
    }

    output
}

/// Format a covariance matrix for display
pub fn format_covariance_matrix(matrix: &CovarianceMatrix) -> String {
    let mut output = String::new();
    let labels = &matrix.tickers;
    let width = label_width(labels);

    // Header
    write!(output, "{:>width$}", "", width = width).unwrap();
    for label in labels {
        write!(output, "{:>width$}", label, width = width).unwrap();
    }
    writeln!(output).unwrap();

    // Matrix rows
    for (label, row) in labels.iter().zip(matrix.values.iter()) {
        write!(output, "{:>width$}", label, width = width).unwrap();
        for val in row {
            write!(output, "{}", cell(*val, width)).unwrap();
        }
        writeln!(output).unwrap();
    }

    output
}

/// Generate a text report from analysis results
pub fn generate_text_report(analysis: &Analysis) -> String {
    let mut report = String::new();

    writeln!(report, "{}", "=".repeat(60)).unwrap();
    writeln!(report, "ANNUALIZED RETURN STATISTICS").unwrap();
    writeln!(report, "{}", "=".repeat(60)).unwrap();
    writeln!(
        report,
        "Tickers: {}  Return periods: {}  Trading days: {}",
        analysis.mean_returns_annual.tickers.len(),
        analysis.periods,
        analysis.trading_days
    )
    .unwrap();
    writeln!(report).unwrap();

    writeln!(report, "Mean annualized returns:").unwrap();
    write!(report, "{}", format_mean_returns(&analysis.mean_returns_annual)).unwrap();
    writeln!(report).unwrap();

    writeln!(report, "Covariance matrix (annualized):").unwrap();
    write!(report, "{}", format_covariance_matrix(&analysis.covariance_annual)).unwrap();

    writeln!(report, "{}", "=".repeat(60)).unwrap();

    report
}

/// Mean returns as a two-column frame: `<index_name>`, `mean_return`
pub fn mean_returns_frame(means: &MeanReturns, index_name: &str) -> Result<DataFrame> {
    let columns = vec![
        Column::new(index_name.into(), means.tickers.clone()),
        Column::new("mean_return".into(), means.values.clone()),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Covariance grid: a label column named `index_name`, then one column per ticker
pub fn covariance_frame(matrix: &CovarianceMatrix, index_name: &str) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(matrix.tickers.len() + 1);
    columns.push(Column::new(index_name.into(), matrix.tickers.clone()));

    for (j, ticker) in matrix.tickers.iter().enumerate() {
        let values: Vec<Option<f64>> = matrix.values.iter().map(|row| row[j]).collect();
        columns.push(Column::new(ticker.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}
