//! End-to-end pipeline tests over mock providers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use equity_screener::chart::{ChartRenderer, ChartStyle, NullRenderer, Overlay};
use equity_screener::config::ScanConfig;
use equity_screener::data::provider::{DataProvider, ProviderError, ProviderResult};
use equity_screener::data::{
    EarningsDates, FetchCache, MarketData, PriceBar, PriceSeries, Profile,
};
use equity_screener::screener::{Scanner, SymbolOutcome};

// ============================================================================
// Mock providers
// ============================================================================

struct MockProvider {
    name: &'static str,
    symbols: HashSet<String>,
    series_calls: Arc<AtomicU32>,
    profile_calls: Arc<AtomicU32>,
    delay_ms: u64,
    enrichment: bool,
}

impl MockProvider {
    fn new(name: &'static str, symbols: &[&str]) -> Self {
        Self {
            name,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            series_calls: Arc::new(AtomicU32::new(0)),
            profile_calls: Arc::new(AtomicU32::new(0)),
            delay_ms: 0,
            enrichment: false,
        }
    }

    fn with_enrichment(mut self) -> Self {
        self.enrichment = true;
        self
    }

    fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    fn make_series(symbol: &str, from: NaiveDate, to: NaiveDate) -> PriceSeries {
        // Deterministic wavy closes so indicators and beta have variance.
        let mut bars = Vec::new();
        let mut date = from;
        let mut i = 0i64;
        while date <= to {
            let close = 100.0 + ((i % 13) as f64 - 6.0) * 0.4 + i as f64 * 0.01;
            bars.push(PriceBar {
                date,
                open: close - 0.2,
                high: close + 0.6,
                low: close - 0.6,
                close,
                volume: 1_000_000.0,
            });
            date += Duration::days(1);
            i += 1;
        }
        PriceSeries::new(symbol, bars)
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_enrichment(&self) -> bool {
        self.enrichment
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<PriceSeries> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if symbol == "PANIC" {
            panic!("mock provider induced panic");
        }
        if !self.symbols.contains(symbol) {
            return Err(ProviderError::no_data(self.name, symbol));
        }
        Ok(Self::make_series(symbol, from, to))
    }

    async fn fetch_profile(&self, symbol: &str) -> ProviderResult<Profile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if !self.symbols.contains(symbol) {
            return Err(ProviderError::no_data(self.name, symbol));
        }
        Ok(Profile {
            market_cap: Some(5.0e9),
            sector: Some("Technology".to_string()),
            shares_outstanding: Some(50_000_000.0),
        })
    }

    async fn fetch_earnings(&self, _symbol: &str) -> ProviderResult<EarningsDates> {
        Ok(EarningsDates::default())
    }

    async fn fetch_rating(&self, _symbol: &str) -> ProviderResult<Option<String>> {
        Ok(Some("Buy".to_string()))
    }
}

fn test_config() -> ScanConfig {
    let mut config = ScanConfig::default();
    config.scan.workers = 4;
    config.scan.lookback_days = 270;
    config.beta.min_points = 50;
    config.output.charts_enabled = false;
    config
}

fn scanner_with(
    preferred: MockProvider,
    fallback: Option<MockProvider>,
    config: ScanConfig,
) -> Scanner {
    let data = Arc::new(MarketData::new(
        Arc::new(preferred),
        fallback.map(|f| Arc::new(f) as Arc<dyn DataProvider>),
        Arc::new(FetchCache::new()),
    ));
    Scanner::new(Arc::new(config), data, Arc::new(NullRenderer))
}

// ============================================================================
// Fallback and skip behavior
// ============================================================================

#[tokio::test]
async fn test_fallback_serves_symbol_missing_from_preferred() {
    let preferred = MockProvider::new("primary", &["SPY"]);
    let fallback = MockProvider::new("secondary", &["AAPL", "SPY"]).with_enrichment();
    let primary_calls = preferred.series_calls.clone();
    let secondary_calls = fallback.series_calls.clone();

    let scanner = scanner_with(preferred, Some(fallback), test_config());
    let outcomes = scanner.run(vec!["AAPL".to_string()]).await;

    assert_eq!(outcomes.len(), 1);
    let SymbolOutcome::Record(record) = &outcomes[0] else {
        panic!("expected a record, got {:?}", outcomes[0]);
    };
    assert_eq!(record.symbol, "AAPL");
    assert!(primary_calls.load(Ordering::SeqCst) > 0);
    assert!(secondary_calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_symbol_absent_everywhere_is_skipped() {
    let preferred = MockProvider::new("primary", &["AAPL", "SPY"]);
    let fallback = MockProvider::new("secondary", &["AAPL", "SPY"]);

    let scanner = scanner_with(preferred, Some(fallback), test_config());
    let outcomes = scanner
        .run(vec!["AAPL".to_string(), "GHOST".to_string()])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], SymbolOutcome::Record(_)));
    assert_eq!(
        outcomes[1],
        SymbolOutcome::Skipped {
            symbol: "GHOST".to_string()
        }
    );
}

#[tokio::test]
async fn test_worker_panic_skips_only_that_symbol() {
    let preferred = MockProvider::new("primary", &["AAPL", "MSFT", "SPY"]);

    let scanner = scanner_with(preferred, None, test_config());
    let outcomes = scanner
        .run(vec![
            "AAPL".to_string(),
            "PANIC".to_string(),
            "MSFT".to_string(),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], SymbolOutcome::Record(_)));
    assert!(matches!(outcomes[1], SymbolOutcome::Skipped { .. }));
    assert!(matches!(outcomes[2], SymbolOutcome::Record(_)));
}

// ============================================================================
// Memoization
// ============================================================================

#[tokio::test]
async fn test_facade_memoizes_repeated_lookups() {
    let provider = MockProvider::new("primary", &["SPY"]);
    let series_calls = provider.series_calls.clone();

    let data = MarketData::new(
        Arc::new(provider),
        None,
        Arc::new(FetchCache::new()),
    );

    let from: NaiveDate = "2025-01-01".parse().unwrap();
    let to: NaiveDate = "2025-06-02".parse().unwrap();

    let first = data.get_series("SPY", from, to).await;
    let second = data.get_series("SPY", from, to).await;

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(series_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_facade_memoizes_absence() {
    let provider = MockProvider::new("primary", &[]);
    let series_calls = provider.series_calls.clone();

    let data = MarketData::new(Arc::new(provider), None, Arc::new(FetchCache::new()));

    let from: NaiveDate = "2025-01-01".parse().unwrap();
    let to: NaiveDate = "2025-06-02".parse().unwrap();

    assert!(data.get_series("GHOST", from, to).await.is_none());
    assert!(data.get_series("GHOST", from, to).await.is_none());
    assert_eq!(series_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_benchmark_fetched_once_across_workers() {
    let symbols: Vec<String> = (0..8).map(|i| format!("S{i}")).collect();
    let mut universe: Vec<&str> = symbols.iter().map(String::as_str).collect();
    universe.push("SPY");

    let provider = MockProvider::new("primary", &universe);
    let series_calls = provider.series_calls.clone();

    // One worker makes the fetch count deterministic; concurrent misses
    // on a cold key may legally recompute.
    let mut config = test_config();
    config.scan.workers = 1;

    let scanner = scanner_with(provider, None, config);
    let outcomes = scanner.run(symbols).await;

    assert!(outcomes
        .iter()
        .all(|o| matches!(o, SymbolOutcome::Record(_))));
    // Two windows per symbol (scan + beta) plus one benchmark fetch.
    assert_eq!(series_calls.load(Ordering::SeqCst), 8 * 2 + 1);
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_results_arrive_in_submission_order() {
    let symbols: Vec<String> = (0..50).map(|i| format!("T{i:02}")).collect();
    let mut universe: Vec<&str> = symbols.iter().map(String::as_str).collect();
    universe.push("SPY");

    // Per-call delay shuffles completion order under 5 workers.
    let provider = MockProvider::new("primary", &universe).with_delay(3);

    let mut config = test_config();
    config.scan.workers = 5;

    let scanner = scanner_with(provider, None, config);
    let outcomes = scanner.run(symbols.clone()).await;

    let returned: Vec<&str> = outcomes.iter().map(|o| o.symbol()).collect();
    let submitted: Vec<&str> = symbols.iter().map(String::as_str).collect();
    assert_eq!(returned, submitted);
}

// ============================================================================
// Renderer isolation
// ============================================================================

struct FailingRenderer {
    calls: Arc<AtomicU32>,
}

impl ChartRenderer for FailingRenderer {
    fn render(
        &self,
        _series: &PriceSeries,
        _overlays: &[Overlay],
        _style: &ChartStyle,
        _dest_dir: &std::path::Path,
        _fail_reason: Option<&str>,
    ) -> anyhow::Result<std::path::PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("render backend unavailable"))
    }
}

#[tokio::test]
async fn test_render_failure_does_not_disturb_records() {
    let provider = MockProvider::new("primary", &["AAPL", "SPY"]);
    let calls = Arc::new(AtomicU32::new(0));
    let renderer = Arc::new(FailingRenderer {
        calls: calls.clone(),
    });

    let mut config = test_config();
    config.output.charts_enabled = true;
    let dir = tempfile::tempdir().unwrap();
    config.output.out_dir = dir.path().to_string_lossy().into_owned();

    let data = Arc::new(MarketData::new(
        Arc::new(provider),
        None,
        Arc::new(FetchCache::new()),
    ));
    let scanner = Scanner::new(Arc::new(config), data, renderer);

    let outcomes = scanner.run(vec!["AAPL".to_string()]).await;

    assert!(matches!(outcomes[0], SymbolOutcome::Record(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
