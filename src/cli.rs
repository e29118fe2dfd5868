use clap::Parser;

use crate::config::PricePolicy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Long-format price CSV with one (date, ticker, price) observation per row
    #[arg(short = 'i', long)]
    pub input: Option<String>,

    /// TOML configuration file (defaults to .return_stats.toml lookup)
    #[arg(short = 'c', long)]
    pub config: Option<String>,

    /// Column holding the observation date
    #[arg(long)]
    pub date_col: Option<String>,

    /// Column holding the ticker identifier
    #[arg(long)]
    pub ticker_col: Option<String>,

    /// Column holding the price
    #[arg(long)]
    pub price_col: Option<String>,

    /// chrono format string for the date column
    #[arg(long)]
    pub date_format: Option<String>,

    /// Periods per year used for annualization
    #[arg(short = 't', long)]
    pub trading_days: Option<u32>,

    /// Output file for annualized mean returns
    #[arg(long)]
    pub mean_output: Option<String>,

    /// Output file for the annualized covariance matrix
    #[arg(long)]
    pub cov_output: Option<String>,

    /// How to treat zero or negative prices
    #[arg(long, value_enum)]
    pub non_positive: Option<PricePolicy>,

    /// Fail on rows with an empty date, ticker or price instead of dropping them
    #[arg(long)]
    pub strict: bool,

    /// Do not print the report to stdout
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
