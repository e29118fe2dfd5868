use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use crate::{Error, Result};

/// One (date, ticker, price) row of the long-format input
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub ticker: String,
    pub price: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, ticker: impl Into<String>, price: f64) -> Self {
        Observation {
            date,
            ticker: ticker.into(),
            price,
        }
    }
}

/// Wide price table: one row per date (ascending), one column per ticker (sorted)
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// `values[row][col]`, `None` where the ticker has no price on that date
    pub values: Vec<Vec<Option<f64>>>,
}

impl PriceMatrix {
    /// Pivot observations into a dense date x ticker grid.
    ///
    /// A (date, ticker) pair seen twice with the same price is collapsed; with a
    /// different price it is rejected.
    pub fn from_observations(observations: &[Observation]) -> Result<Self> {
        let dates: Vec<NaiveDate> = observations
            .iter()
            .map(|obs| obs.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let tickers: Vec<String> = observations
            .iter()
            .map(|obs| obs.ticker.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let date_index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let ticker_index: HashMap<&str, usize> = tickers
            .iter()
            .enumerate()
            .map(|(j, t)| (t.as_str(), j))
            .collect();

        let mut values = vec![vec![None; tickers.len()]; dates.len()];
        let mut collapsed = 0usize;

        for obs in observations {
            let row = date_index[&obs.date];
            let col = ticker_index[obs.ticker.as_str()];
            match values[row][col] {
                None => values[row][col] = Some(obs.price),
                Some(existing) if existing == obs.price => collapsed += 1,
                Some(existing) => {
                    return Err(Error::ConflictingObservation {
                        date: obs.date,
                        ticker: obs.ticker.clone(),
                        first: existing,
                        second: obs.price,
                    });
                }
            }
        }

        if collapsed > 0 {
            debug!(collapsed, "collapsed duplicate observations with identical prices");
        }

        Ok(PriceMatrix {
            dates,
            tickers,
            values,
        })
    }

    /// (dates, tickers)
    pub fn shape(&self) -> (usize, usize) {
        (self.dates.len(), self.tickers.len())
    }

    /// Prices of one ticker in date order
    pub fn column(&self, col: usize) -> Vec<Option<f64>> {
        self.values.iter().map(|row| row[col]).collect()
    }

    /// Fraction of dates carrying a price, per ticker
    pub fn coverage(&self) -> Vec<(String, f64)> {
        let n_dates = self.dates.len();
        self.tickers
            .iter()
            .enumerate()
            .map(|(j, ticker)| {
                let present = self.values.iter().filter(|row| row[j].is_some()).count();
                let pct = if n_dates > 0 {
                    present as f64 / n_dates as f64
                } else {
                    0.0
                };
                (ticker.clone(), pct)
            })
            .collect()
    }
}
