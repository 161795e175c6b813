//! Market data types shared across providers, indicators and the screener.

pub mod cache;
pub mod facade;
pub mod polygon;
pub mod provider;
pub mod yahoo;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use cache::FetchCache;
pub use facade::MarketData;
pub use provider::{DataProvider, ProviderError};

/// Single daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered daily price history for one symbol.
///
/// A successfully fetched series is never empty; adapters report an empty
/// upstream payload as `ProviderError::NoData` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, sorting bars by date.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Day-over-day close change in percent; `None` for the first bar and
    /// wherever the prior close is zero.
    pub fn change_pcts(&self) -> Vec<Option<f64>> {
        let closes = self.closes();
        let mut out = vec![None; closes.len()];
        for i in 1..closes.len() {
            let prev = closes[i - 1];
            if prev != 0.0 {
                out[i] = Some((closes[i] / prev - 1.0) * 100.0);
            }
        }
        out
    }

    /// Change% of the most recent bar.
    pub fn last_change_pct(&self) -> Option<f64> {
        self.change_pcts().last().copied().flatten()
    }
}

/// Company reference data. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub shares_outstanding: Option<f64>,
}

impl Profile {
    /// True when no field carries a value (triggers provider fallback).
    pub fn is_empty(&self) -> bool {
        self.market_cap.is_none() && self.sector.is_none() && self.shares_outstanding.is_none()
    }
}

/// Earnings dates split around today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EarningsDates {
    pub recent: Option<NaiveDate>,
    pub upcoming: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date.parse().unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_series_sorts_bars() {
        let series = PriceSeries::new(
            "TEST",
            vec![bar("2025-01-03", 3.0), bar("2025-01-01", 1.0), bar("2025-01-02", 2.0)],
        );
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_change_pcts() {
        let series = PriceSeries::new(
            "TEST",
            vec![bar("2025-01-01", 100.0), bar("2025-01-02", 110.0), bar("2025-01-03", 99.0)],
        );
        let pcts = series.change_pcts();
        assert_eq!(pcts[0], None);
        assert!((pcts[1].unwrap() - 10.0).abs() < 1e-9);
        assert!((pcts[2].unwrap() - (-10.0)).abs() < 1e-9);
        assert!((series.last_change_pct().unwrap() - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_profile_is_empty() {
        assert!(Profile::default().is_empty());
        let p = Profile {
            sector: Some("Technology".to_string()),
            ..Default::default()
        };
        assert!(!p.is_empty());
    }
}
