pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod analysis;
pub mod pivot;
pub mod report;

pub use error::{Error, Result};

use tracing::{debug, info};
use crate::analysis::Analysis;
use crate::config::Settings;
use crate::io::LoadOptions;
use crate::pivot::PriceMatrix;

/// Load, reshape and compute annualized statistics
pub fn analyze(settings: &Settings) -> Result<Analysis> {
    let options = LoadOptions {
        columns: settings.columns.clone(),
        date_format: settings.date_format.clone(),
        strict: settings.strict,
    };

    info!(path = %settings.input_path.display(), "loading observations");
    let observations = io::load_observations(&settings.input_path, &options)?;

    let prices = PriceMatrix::from_observations(&observations)?;
    let (n_dates, n_tickers) = prices.shape();
    info!(dates = n_dates, tickers = n_tickers, "pivoted price matrix");
    for (ticker, coverage) in prices.coverage() {
        debug!(%ticker, coverage_pct = coverage * 100.0, "date coverage");
    }

    Analysis::from_prices(&prices, settings.non_positive, settings.trading_days)
}

/// Persist annualized mean returns and covariance as CSV
pub fn write_outputs(analysis: &Analysis, settings: &Settings) -> Result<()> {
    let index_name = settings.columns.ticker.as_str();

    let means = report::mean_returns_frame(&analysis.mean_returns_annual, index_name)?;
    io::save_csv(&means, &settings.mean_output)?;
    info!(path = %settings.mean_output.display(), "wrote mean returns");

    let covariance = report::covariance_frame(&analysis.covariance_annual, index_name)?;
    io::save_csv(&covariance, &settings.cov_output)?;
    info!(path = %settings.cov_output.display(), "wrote covariance matrix");

    Ok(())
}

/// Run the whole pipeline; nothing is written unless every statistic succeeds
pub fn run(settings: &Settings) -> Result<Analysis> {
    let analysis = analyze(settings)?;
    write_outputs(&analysis, settings)?;
    Ok(analysis)
}
