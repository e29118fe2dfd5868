use chrono::NaiveDate;
use tracing::{debug, warn};
use crate::config::PricePolicy;
use crate::pivot::PriceMatrix;
use crate::{Error, Result};

/// Daily log-returns, one row per date after the first
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl ReturnMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (self.dates.len(), self.tickers.len())
    }

    pub fn column(&self, col: usize) -> Vec<Option<f64>> {
        self.values.iter().map(|row| row[col]).collect()
    }
}

/// Mean return per ticker
#[derive(Debug, Clone, PartialEq)]
pub struct MeanReturns {
    pub tickers: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl MeanReturns {
    /// Scale every mean by the number of periods per year
    pub fn annualize(&self, trading_days: u32) -> Self {
        let factor = f64::from(trading_days);
        MeanReturns {
            tickers: self.tickers.clone(),
            values: self.values.iter().map(|v| v.map(|m| m * factor)).collect(),
        }
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .and_then(|i| self.values[i])
    }
}

/// Symmetric ticker x ticker sample covariance
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CovarianceMatrix {
    /// Scale every entry by the number of periods per year
    pub fn annualize(&self, trading_days: u32) -> Self {
        let factor = f64::from(trading_days);
        CovarianceMatrix {
            tickers: self.tickers.clone(),
            values: self
                .values
                .iter()
                .map(|row| row.iter().map(|v| v.map(|c| c * factor)).collect())
                .collect(),
        }
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == row)?;
        let j = self.tickers.iter().position(|t| t == col)?;
        self.values[i][j]
    }
}

/// Daily and annualized statistics for one run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub trading_days: u32,
    /// Return rows left after dropping all-missing dates
    pub periods: usize,
    pub returns: ReturnMatrix,
    pub mean_returns: MeanReturns,
    pub covariance: CovarianceMatrix,
    pub mean_returns_annual: MeanReturns,
    pub covariance_annual: CovarianceMatrix,
}

impl Analysis {
    pub fn from_prices(prices: &PriceMatrix, policy: PricePolicy, trading_days: u32) -> Result<Self> {
        let returns = log_returns(prices, policy)?;
        let mean_returns = mean_returns(&returns);
        let covariance = covariance_matrix(&returns);
        debug!(rows = returns.dates.len(), tickers = returns.tickers.len(), "computed return statistics");

        Ok(Analysis {
            trading_days,
            periods: returns.dates.len(),
            mean_returns_annual: mean_returns.annualize(trading_days),
            covariance_annual: covariance.annualize(trading_days),
            returns,
            mean_returns,
            covariance,
        })
    }
}

/// Calculate log-returns `ln(p[i] / p[i-1])` per ticker.
///
/// A missing price on either side leaves that return missing. Rows where every
/// ticker is missing are dropped afterwards, which always removes the first date.
pub fn log_returns(prices: &PriceMatrix, policy: PricePolicy) -> Result<ReturnMatrix> {
    let cleaned = screen_prices(prices, policy)?;

    let mut dates = Vec::with_capacity(prices.dates.len().saturating_sub(1));
    let mut values = Vec::with_capacity(prices.dates.len().saturating_sub(1));

    for (i, pair) in cleaned.windows(2).enumerate() {
        let row: Vec<Option<f64>> = pair[0]
            .iter()
            .zip(pair[1].iter())
            .map(|(prev, curr)| match (prev, curr) {
                (Some(p), Some(c)) => Some((c / p).ln()),
                _ => None,
            })
            .collect();

        if row.iter().any(Option::is_some) {
            dates.push(prices.dates[i + 1]);
            values.push(row);
        }
    }

    Ok(ReturnMatrix {
        dates,
        tickers: prices.tickers.clone(),
        values,
    })
}

/// Apply the non-positive price policy to every present price
fn screen_prices(prices: &PriceMatrix, policy: PricePolicy) -> Result<Vec<Vec<Option<f64>>>> {
    let mut masked = 0usize;
    let mut cleaned = prices.values.clone();

    for (i, row) in cleaned.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let Some(price) = *cell else { continue };
            if price > 0.0 {
                continue;
            }
            match policy {
                PricePolicy::Reject => {
                    return Err(Error::NonPositivePrice {
                        date: prices.dates[i],
                        ticker: prices.tickers[j].clone(),
                        price,
                    });
                }
                PricePolicy::Missing => {
                    *cell = None;
                    masked += 1;
                }
            }
        }
    }

    if masked > 0 {
        warn!(masked, "treated non-positive prices as missing");
    }

    Ok(cleaned)
}

/// Per-ticker arithmetic mean over the non-missing returns
pub fn mean_returns(returns: &ReturnMatrix) -> MeanReturns {
    let values = (0..returns.tickers.len())
        .map(|j| mean(returns.values.iter().filter_map(|row| row[j])))
        .collect();

    MeanReturns {
        tickers: returns.tickers.clone(),
        values,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Sample covariance between every pair of tickers over pairwise-complete rows
pub fn covariance_matrix(returns: &ReturnMatrix) -> CovarianceMatrix {
    let n = returns.tickers.len();
    let columns: Vec<Vec<Option<f64>>> = (0..n).map(|j| returns.column(j)).collect();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        for j in i..n {
            let cov = pairwise_covariance(&columns[i], &columns[j]);
            values[i][j] = cov;
            values[j][i] = cov;
        }
    }

    CovarianceMatrix {
        tickers: returns.tickers.clone(),
        values,
    }
}

/// Bessel-corrected covariance over rows where both series are present.
/// `None` with fewer than two such rows.
fn pairwise_covariance(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let sum: f64 = pairs
        .iter()
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum();

    Some(sum / (n - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::Observation;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn matrix(series: &[(&str, &[Option<f64>])]) -> PriceMatrix {
        let n_dates = series.first().map_or(0, |(_, v)| v.len());
        PriceMatrix {
            dates: (1..=n_dates as u32).map(day).collect(),
            tickers: series.iter().map(|(t, _)| t.to_string()).collect(),
            values: (0..n_dates)
                .map(|i| series.iter().map(|(_, v)| v[i]).collect())
                .collect(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_two_point_log_return() {
        let prices = matrix(&[("A", &[Some(100.0), Some(137.5)])]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        assert_eq!(returns.shape(), (1, 1));
        assert_eq!(returns.dates, vec![day(2)]);
        assert!(close(returns.values[0][0].unwrap(), (137.5f64 / 100.0).ln()));
    }

    #[test]
    fn test_return_matrix_drops_first_row() {
        let prices = matrix(&[
            ("A", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            ("B", &[Some(5.0), Some(4.0), Some(3.0), Some(2.0), Some(1.0)]),
            ("C", &[Some(2.0), Some(2.0), Some(2.0), Some(2.0), Some(2.0)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        assert_eq!(returns.shape(), (4, 3));

        let single = matrix(&[("A", &[Some(1.0)])]);
        assert_eq!(log_returns(&single, PricePolicy::Reject).unwrap().shape(), (0, 1));
    }

    #[test]
    fn test_partial_missing_row_is_kept() {
        let prices = matrix(&[
            ("A", &[Some(1.0), None, Some(2.0), Some(4.0)]),
            ("B", &[Some(1.0), Some(2.0), Some(4.0), Some(8.0)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        assert_eq!(returns.shape(), (3, 2));
        assert_eq!(returns.column(0)[0], None);
        assert_eq!(returns.column(0)[1], None);
        assert!(close(returns.column(0)[2].unwrap(), 2f64.ln()));
    }

    #[test]
    fn test_all_missing_middle_row_is_dropped() {
        let prices = matrix(&[
            ("A", &[Some(1.0), None, Some(2.0), Some(4.0)]),
            ("B", &[Some(1.0), None, Some(4.0), Some(8.0)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        assert_eq!(returns.dates, vec![day(4)]);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let prices = matrix(&[
            ("A", &[Some(100.0), Some(110.0), Some(121.0)]),
            ("B", &[Some(50.0), Some(55.0), Some(60.5)]),
        ]);
        let analysis = Analysis::from_prices(&prices, PricePolicy::Reject, 252).unwrap();

        let a = analysis.returns.column(0);
        assert!((a[0].unwrap() - 0.09531).abs() < 1e-5);
        assert!((a[1].unwrap() - 0.09531).abs() < 1e-5);

        let mean_a = analysis.mean_returns.get("A").unwrap();
        assert!((mean_a - 0.09531).abs() < 1e-5);
        let annual_a = analysis.mean_returns_annual.get("A").unwrap();
        assert!((annual_a - 24.02).abs() < 0.01);

        let cov_ab = analysis.covariance_annual.get("A", "B").unwrap();
        assert!(cov_ab.is_finite());
        assert!(cov_ab.abs() < 1e-12);
    }

    #[test]
    fn test_covariance_known_values() {
        // returns: A = [ln2, ln2, ln0.5], B = [ln2, ln0.5, ln2]
        let prices = matrix(&[
            ("A", &[Some(1.0), Some(2.0), Some(4.0), Some(2.0)]),
            ("B", &[Some(1.0), Some(2.0), Some(1.0), Some(2.0)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        let cov = covariance_matrix(&returns);
        let l = 2f64.ln();

        // A = l*[1,1,-1], mean l/3; deviations l*[2/3,2/3,-4/3]
        let var_a = l * l * (4.0 / 9.0 + 4.0 / 9.0 + 16.0 / 9.0) / 2.0;
        // B = l*[1,-1,1], deviations l*[2/3,-4/3,2/3]
        let cov_ab = l * l * (4.0 / 9.0 - 8.0 / 9.0 - 8.0 / 9.0) / 2.0;

        assert!(close(cov.get("A", "A").unwrap(), var_a));
        assert!(close(cov.get("B", "B").unwrap(), var_a));
        assert!(close(cov.get("A", "B").unwrap(), cov_ab));
    }

    #[test]
    fn test_covariance_symmetric_with_nonnegative_diagonal() {
        let prices = matrix(&[
            ("A", &[Some(10.0), Some(10.5), Some(9.8), None, Some(10.1), Some(10.9)]),
            ("B", &[Some(20.0), Some(19.0), Some(19.5), Some(21.0), Some(22.0), Some(21.5)]),
            ("C", &[None, Some(5.0), Some(5.5), Some(5.1), Some(4.9), Some(5.2)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        let cov = covariance_matrix(&returns);

        for i in 0..3 {
            assert!(cov.values[i][i].unwrap() >= 0.0);
            for j in 0..3 {
                assert_eq!(cov.values[i][j], cov.values[j][i]);
            }
        }
    }

    #[test]
    fn test_pairwise_complete_uses_paired_means() {
        let x = [Some(1.0), Some(2.0), Some(3.0), None];
        let y = [Some(2.0), None, Some(6.0), Some(100.0)];
        // pairs (1,2), (3,6): means 2 and 4, cov = ((-1)(-2) + (1)(2)) / 1
        assert_eq!(pairwise_covariance(&x, &y), Some(4.0));
        assert_eq!(pairwise_covariance(&x[..1], &y[..1]), None);
    }

    #[test]
    fn test_annualization_is_scalar_multiply() {
        let prices = matrix(&[
            ("A", &[Some(1.0), Some(1.1), Some(1.05), Some(1.2)]),
            ("B", &[Some(3.0), Some(2.9), Some(3.1), Some(3.3)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Reject).unwrap();
        let means = mean_returns(&returns);
        let cov = covariance_matrix(&returns);

        let means_annual = means.annualize(252);
        let cov_annual = cov.annualize(252);

        for (daily, annual) in means.values.iter().zip(means_annual.values.iter()) {
            assert_eq!(daily.unwrap() * 252.0, annual.unwrap());
        }
        for (daily_row, annual_row) in cov.values.iter().zip(cov_annual.values.iter()) {
            for (daily, annual) in daily_row.iter().zip(annual_row.iter()) {
                assert_eq!(daily.unwrap() * 252.0, annual.unwrap());
            }
        }
    }

    #[test]
    fn test_single_price_ticker_is_missing_everywhere() {
        let obs = vec![
            Observation::new(day(1), "A", 100.0),
            Observation::new(day(2), "A", 101.0),
            Observation::new(day(3), "A", 99.0),
            Observation::new(day(1), "C", 42.0),
        ];
        let prices = PriceMatrix::from_observations(&obs).unwrap();
        let analysis = Analysis::from_prices(&prices, PricePolicy::Reject, 252).unwrap();

        assert!(analysis.returns.column(1).iter().all(Option::is_none));
        assert_eq!(analysis.mean_returns_annual.get("C"), None);
        assert_eq!(analysis.covariance_annual.get("C", "C"), None);
        assert_eq!(analysis.covariance_annual.get("A", "C"), None);
        assert_eq!(analysis.covariance_annual.get("C", "A"), None);
        assert!(analysis.covariance_annual.get("A", "A").is_some());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let prices = matrix(&[("A", &[Some(10.0), Some(0.0), Some(11.0)])]);
        let err = log_returns(&prices, PricePolicy::Reject).unwrap_err();
        match err {
            Error::NonPositivePrice { date, ticker, price } => {
                assert_eq!(date, day(2));
                assert_eq!(ticker, "A");
                assert_eq!(price, 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        let negative = matrix(&[("A", &[Some(-1.0), Some(2.0)])]);
        assert!(log_returns(&negative, PricePolicy::Reject).is_err());
    }

    #[test]
    fn test_non_positive_price_masked_as_missing() {
        let prices = matrix(&[
            ("A", &[Some(10.0), Some(-5.0), Some(11.0), Some(12.0)]),
            ("B", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
        ]);
        let returns = log_returns(&prices, PricePolicy::Missing).unwrap();
        let a = returns.column(0);
        assert_eq!(a[0], None);
        assert_eq!(a[1], None);
        assert!(close(a[2].unwrap(), (12.0f64 / 11.0).ln()));
        assert!(returns.values.iter().flatten().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_matrix() {
        let prices = PriceMatrix::from_observations(&[]).unwrap();
        let analysis = Analysis::from_prices(&prices, PricePolicy::Reject, 252).unwrap();
        assert_eq!(analysis.returns.shape(), (0, 0));
        assert!(analysis.mean_returns.values.is_empty());
        assert!(analysis.covariance.values.is_empty());
    }
}
