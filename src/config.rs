use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::cli::Args;
use crate::Result;

pub const DEFAULT_INPUT: &str = "sp500_data.csv";
pub const DEFAULT_DATE_COLUMN: &str = "date";
pub const DEFAULT_TICKER_COLUMN: &str = "Name";
pub const DEFAULT_PRICE_COLUMN: &str = "close";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_TRADING_DAYS: u32 = 252;
pub const DEFAULT_MEAN_OUTPUT: &str = "mean_returns.csv";
pub const DEFAULT_COV_OUTPUT: &str = "covariance_matrix.csv";

/// Handling of zero or negative prices before taking logarithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PricePolicy {
    /// Abort the run
    #[default]
    Reject,
    /// Treat the price as missing so affected returns become missing
    Missing,
}

/// Configuration for return_stats
/// Can be loaded from a TOML file to set default values for CLI parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default input file
    pub input_path: Option<String>,

    pub trading_days: Option<u32>,

    pub date_format: Option<String>,

    pub mean_output: Option<String>,

    pub cov_output: Option<String>,

    pub non_positive: Option<PricePolicy>,

    pub strict: Option<bool>,

    pub quiet: Option<bool>,

    pub verbose: Option<bool>,

    /// Column name overrides
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Column name configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub date_column: Option<String>,
    pub ticker_column: Option<String>,
    pub price_column: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config file: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from default locations
    /// Checks in order:
    /// 1. ./.return_stats.toml (current directory)
    /// 2. ~/.config/return_stats/config.toml (user config directory)
    /// 3. ~/.return_stats.toml (home directory)
    pub fn load_default() -> Result<Option<Self>> {
        let current_dir_config = PathBuf::from(".return_stats.toml");
        if current_dir_config.exists() {
            return Ok(Some(Self::from_file(current_dir_config)?));
        }

        if let Some(config_dir) = Self::get_config_dir() {
            let config_path = config_dir.join("return_stats").join("config.toml");
            if config_path.exists() {
                return Ok(Some(Self::from_file(config_path)?));
            }
        }

        if let Some(home_dir) = Self::get_home_dir() {
            let home_config = home_dir.join(".return_stats.toml");
            if home_config.exists() {
                return Ok(Some(Self::from_file(home_config)?));
            }
        }

        Ok(None)
    }

    fn get_config_dir() -> Option<PathBuf> {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            Some(PathBuf::from(config_dir))
        } else {
            Self::get_home_dir().map(|home_dir| home_dir.join(".config"))
        }
    }

    fn get_home_dir() -> Option<PathBuf> {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from)
    }

    /// Merge config with CLI arguments, giving CLI arguments priority
    pub fn merge_with_cli(&self, cli_args: &mut Args) {
        if cli_args.input.is_none() {
            cli_args.input = self.input_path.clone();
        }
        if cli_args.trading_days.is_none() {
            cli_args.trading_days = self.trading_days;
        }
        if cli_args.date_format.is_none() {
            cli_args.date_format = self.date_format.clone();
        }
        if cli_args.mean_output.is_none() {
            cli_args.mean_output = self.mean_output.clone();
        }
        if cli_args.cov_output.is_none() {
            cli_args.cov_output = self.cov_output.clone();
        }
        if cli_args.non_positive.is_none() {
            cli_args.non_positive = self.non_positive;
        }

        // Booleans: only set from config if CLI flag wasn't explicitly set
        if !cli_args.strict && self.strict == Some(true) {
            cli_args.strict = true;
        }
        if !cli_args.quiet && self.quiet == Some(true) {
            cli_args.quiet = true;
        }
        if !cli_args.verbose && self.verbose == Some(true) {
            cli_args.verbose = true;
        }

        if cli_args.date_col.is_none() {
            cli_args.date_col = self.columns.date_column.clone();
        }
        if cli_args.ticker_col.is_none() {
            cli_args.ticker_col = self.columns.ticker_column.clone();
        }
        if cli_args.price_col.is_none() {
            cli_args.price_col = self.columns.price_column.clone();
        }
    }
}

/// Names of the three columns read from the input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: String,
    pub ticker: String,
    pub price: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_COLUMN.to_string(),
            ticker: DEFAULT_TICKER_COLUMN.to_string(),
            price: DEFAULT_PRICE_COLUMN.to_string(),
        }
    }
}

/// Fully resolved run settings, defaults applied and validated
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_path: PathBuf,
    pub columns: ColumnMap,
    pub date_format: String,
    pub trading_days: u32,
    pub mean_output: PathBuf,
    pub cov_output: PathBuf,
    pub non_positive: PricePolicy,
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            columns: ColumnMap::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            trading_days: DEFAULT_TRADING_DAYS,
            mean_output: PathBuf::from(DEFAULT_MEAN_OUTPUT),
            cov_output: PathBuf::from(DEFAULT_COV_OUTPUT),
            non_positive: PricePolicy::default(),
            strict: false,
        }
    }
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        let defaults = Self::default();

        let trading_days = args.trading_days.unwrap_or(defaults.trading_days);
        if trading_days == 0 {
            return Err(crate::Error::Config(
                "trading_days must be greater than zero".to_string(),
            ));
        }

        let columns = ColumnMap {
            date: args.date_col.clone().unwrap_or(defaults.columns.date),
            ticker: args.ticker_col.clone().unwrap_or(defaults.columns.ticker),
            price: args.price_col.clone().unwrap_or(defaults.columns.price),
        };
        if columns.date == columns.ticker
            || columns.date == columns.price
            || columns.ticker == columns.price
        {
            return Err(crate::Error::Config(format!(
                "date, ticker and price columns must be distinct, got {:?}",
                columns
            )));
        }

        Ok(Self {
            input_path: args.input.clone().map(PathBuf::from).unwrap_or(defaults.input_path),
            columns,
            date_format: args.date_format.clone().unwrap_or(defaults.date_format),
            trading_days,
            mean_output: args.mean_output.clone().map(PathBuf::from).unwrap_or(defaults.mean_output),
            cov_output: args.cov_output.clone().map(PathBuf::from).unwrap_or(defaults.cov_output),
            non_positive: args.non_positive.unwrap_or(defaults.non_positive),
            strict: args.strict,
        })
    }
}
