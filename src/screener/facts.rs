//! Per-symbol derived snapshot the filter predicates run against.

use chrono::NaiveDate;

use crate::config::ScanConfig;
use crate::data::{EarningsDates, PriceSeries, Profile};
use crate::indicators;

/// Everything the filters need to know about one symbol, computed once.
#[derive(Debug, Clone, Default)]
pub struct ScanFacts {
    pub symbol: String,
    pub last_date: Option<NaiveDate>,
    pub last_close: Option<f64>,
    pub change_pct: Option<f64>,
    pub avg_volume: Option<f64>,
    pub avg_dollar_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub ytd_pct: Option<f64>,
    pub beta: Option<f64>,
    pub rating: Option<String>,
    pub earnings: EarningsDates,
    pub stochrsi_k: Option<f64>,
    /// Fast and slow moving averages, kept whole for the trend predicate
    /// and the chart overlays.
    pub ma_fast: Vec<f64>,
    pub ma_slow: Vec<f64>,
}

impl ScanFacts {
    /// Assemble facts from the fetched pieces. `beta` and the enrichment
    /// fields arrive precomputed; everything price-derived happens here.
    pub fn assemble(
        symbol: &str,
        series: &PriceSeries,
        profile: Option<&Profile>,
        rating: Option<String>,
        earnings: EarningsDates,
        beta: Option<f64>,
        config: &ScanConfig,
    ) -> Self {
        let closes = series.closes();
        let volumes = series.volumes();
        let last_close = closes.last().copied();

        let window = config.volume.avg_window_days;
        let avg_volume = sma_last(&volumes, window);
        let dollar: Vec<f64> = closes
            .iter()
            .zip(volumes.iter())
            .map(|(c, v)| c * v)
            .collect();
        let avg_dollar_volume = sma_last(&dollar, window);

        let market_cap = profile.and_then(|p| {
            p.market_cap.or_else(|| {
                // Derive from the float when the cap itself is missing.
                p.shares_outstanding
                    .zip(last_close)
                    .map(|(shares, close)| shares * close)
            })
        });

        let stochrsi_k = if config.momentum.enable_stochrsi {
            indicators::stoch_rsi(
                &closes,
                config.momentum.stochrsi_len,
                config.momentum.stochrsi_k,
                config.momentum.stochrsi_d,
            )
            .last_k()
        } else {
            None
        };

        let (ma_fast, ma_slow) = if config.trend.enable_ma_cross_filter {
            (
                indicators::sma(&closes, config.trend.ma_mid),
                indicators::sma(&closes, config.trend.ma_slow),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            symbol: symbol.to_string(),
            last_date: series.last().map(|b| b.date),
            last_close,
            change_pct: series.last_change_pct(),
            avg_volume,
            avg_dollar_volume,
            market_cap,
            sector: profile.and_then(|p| p.sector.clone()),
            ytd_pct: indicators::ytd_pct(series),
            beta,
            rating,
            earnings,
            stochrsi_k,
            ma_fast,
            ma_slow,
        }
    }
}

fn sma_last(values: &[f64], window: usize) -> Option<f64> {
    indicators::sma(values, window).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let start: NaiveDate = "2025-01-01".parse().unwrap();
        PriceSeries::new(
            "TEST",
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: *c,
                    high: *c,
                    low: *c,
                    close: *c,
                    volume: 500.0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_assemble_price_fields() {
        let config = ScanConfig::default();
        let s = series(&[100.0, 110.0]);
        let facts = ScanFacts::assemble(
            "TEST",
            &s,
            None,
            None,
            EarningsDates::default(),
            None,
            &config,
        );

        assert_eq!(facts.last_close, Some(110.0));
        assert!((facts.change_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(facts.avg_volume, Some(500.0));
        assert_eq!(facts.avg_dollar_volume, Some((100.0 * 500.0 + 110.0 * 500.0) / 2.0));
        assert_eq!(facts.market_cap, None);
    }

    #[test]
    fn test_market_cap_derived_from_shares() {
        let config = ScanConfig::default();
        let profile = Profile {
            market_cap: None,
            sector: Some("Technology".to_string()),
            shares_outstanding: Some(1_000_000.0),
        };
        let facts = ScanFacts::assemble(
            "TEST",
            &series(&[100.0, 110.0]),
            Some(&profile),
            None,
            EarningsDates::default(),
            None,
            &config,
        );
        assert_eq!(facts.market_cap, Some(110.0 * 1_000_000.0));
        assert_eq!(facts.sector.as_deref(), Some("Technology"));
    }

    #[test]
    fn test_reported_cap_wins_over_derived() {
        let config = ScanConfig::default();
        let profile = Profile {
            market_cap: Some(5.0e9),
            sector: None,
            shares_outstanding: Some(1_000_000.0),
        };
        let facts = ScanFacts::assemble(
            "TEST",
            &series(&[100.0, 110.0]),
            Some(&profile),
            None,
            EarningsDates::default(),
            None,
            &config,
        );
        assert_eq!(facts.market_cap, Some(5.0e9));
    }

    #[test]
    fn test_disabled_signals_stay_empty() {
        let config = ScanConfig::default();
        let facts = ScanFacts::assemble(
            "TEST",
            &series(&[100.0; 250]),
            None,
            None,
            EarningsDates::default(),
            None,
            &config,
        );
        assert_eq!(facts.stochrsi_k, None);
        assert!(facts.ma_fast.is_empty());
    }
}
