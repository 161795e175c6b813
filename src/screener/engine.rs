//! Scan orchestration: bounded-parallel per-symbol workers with ordered
//! result delivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::facts::ScanFacts;
use super::filter::{self, FilterOutcome};
use crate::chart::{ChartRenderer, ChartStyle, Overlay};
use crate::config::{ScanConfig, FALLBACK_BENCHMARK};
use crate::data::{EarningsDates, MarketData, PriceSeries};
use crate::indicators::beta::compute_beta;

/// Final per-symbol decision record, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRecord {
    pub symbol: String,
    pub date: Option<NaiveDate>,
    pub close: Option<f64>,
    pub change_pct: Option<f64>,
    pub market_cap: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub beta: Option<f64>,
    pub rating: Option<String>,
    pub recent_earnings: Option<NaiveDate>,
    pub upcoming_earnings: Option<NaiveDate>,
    pub sector: Option<String>,
    /// Comma-joined failure tags; empty iff the symbol passed.
    pub fail_reason: String,
}

impl ScanRecord {
    pub fn passed(&self) -> bool {
        self.fail_reason.is_empty()
    }

    fn from_facts(facts: &ScanFacts, outcome: &FilterOutcome) -> Self {
        Self {
            symbol: facts.symbol.clone(),
            date: facts.last_date,
            close: facts.last_close,
            change_pct: facts.change_pct,
            market_cap: facts.market_cap,
            ytd_pct: facts.ytd_pct,
            beta: facts.beta,
            rating: facts.rating.clone(),
            recent_earnings: facts.earnings.recent,
            upcoming_earnings: facts.earnings.upcoming,
            sector: facts.sector.clone(),
            fail_reason: outcome.fail_reason(),
        }
    }
}

/// What a worker produced for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Record(ScanRecord),
    /// The symbol could not be processed; it carries no record.
    Skipped { symbol: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Record(r) => &r.symbol,
            Self::Skipped { symbol } => symbol,
        }
    }
}

/// Scan orchestrator. Cheap to clone; every field is run-scoped shared
/// state injected at construction.
#[derive(Clone)]
pub struct Scanner {
    config: Arc<ScanConfig>,
    data: Arc<MarketData>,
    renderer: Arc<dyn ChartRenderer>,
    style: ChartStyle,
    /// Only rendering is a critical section; fetch and compute never
    /// take this lock.
    render_lock: Arc<Mutex<()>>,
}

impl Scanner {
    pub fn new(
        config: Arc<ScanConfig>,
        data: Arc<MarketData>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            config,
            data,
            renderer,
            style: ChartStyle::default(),
            render_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run the scan over an ordered symbol list.
    ///
    /// Workers run `scan.workers` at a time; outcomes come back in
    /// submission order regardless of completion order. A worker error
    /// or panic maps to `Skipped` for that symbol only.
    pub async fn run(&self, symbols: Vec<String>) -> Vec<SymbolOutcome> {
        let today = Utc::now().date_naive();
        let total = symbols.len();
        info!(
            symbols = total,
            workers = self.config.scan.workers,
            "Starting scan"
        );

        let outcomes: Vec<SymbolOutcome> = stream::iter(symbols)
            .map(|symbol| {
                let scanner = self.clone();
                async move {
                    let worker_symbol = symbol.clone();
                    let handle =
                        tokio::spawn(async move { scanner.process_symbol(&worker_symbol, today).await });
                    match handle.await {
                        Ok(Ok(outcome)) => outcome,
                        Ok(Err(e)) => {
                            warn!(symbol = %symbol, error = %e, "Worker failed, skipping symbol");
                            SymbolOutcome::Skipped { symbol }
                        }
                        Err(e) => {
                            warn!(symbol = %symbol, error = %e, "Worker panicked, skipping symbol");
                            SymbolOutcome::Skipped { symbol }
                        }
                    }
                }
            })
            .buffered(self.config.scan.workers.max(1))
            .collect()
            .await;

        let stats = self.data.cache().stats();
        info!(
            symbols = total,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Scan complete"
        );
        outcomes
    }

    /// Full per-symbol pipeline: fetch, enrich, derive, filter, chart.
    async fn process_symbol(&self, symbol: &str, today: NaiveDate) -> Result<SymbolOutcome> {
        let from = today - Duration::days(self.config.scan.lookback_days);

        let Some(series) = self.data.get_series(symbol, from, today).await else {
            debug!(symbol, "No price data from any provider, skipping");
            return Ok(SymbolOutcome::Skipped {
                symbol: symbol.to_string(),
            });
        };

        let profile = self.data.get_profile(symbol).await;
        let rating = if self.config.options.include_analyst {
            self.data.get_rating(symbol).await
        } else {
            None
        };
        let earnings = if self.config.options.include_earnings {
            self.data.get_earnings(symbol).await.unwrap_or_default()
        } else {
            EarningsDates::default()
        };

        let beta = self.symbol_beta(symbol, today).await;

        let facts = ScanFacts::assemble(
            symbol,
            &series,
            profile.as_ref(),
            rating,
            earnings,
            beta,
            &self.config,
        );
        let outcome = filter::evaluate(&facts, &self.config);

        if self.config.output.charts_enabled {
            self.dispatch_chart(&series, &facts, &outcome).await;
        }

        Ok(SymbolOutcome::Record(ScanRecord::from_facts(
            &facts, &outcome,
        )))
    }

    /// Beta over the trailing window, with benchmark substitution when
    /// the configured benchmark has no data. The benchmark series is a
    /// cache hit for every worker after the first.
    async fn symbol_beta(&self, symbol: &str, today: NaiveDate) -> Option<f64> {
        let cfg = &self.config.beta;
        let from = today - Duration::days(365 * cfg.years as i64);

        let sym_series = self.data.get_series(symbol, from, today).await?;

        let mut bench = self.data.get_series(&cfg.benchmark, from, today).await;
        if bench.is_none() && cfg.benchmark != FALLBACK_BENCHMARK {
            debug!(
                benchmark = %cfg.benchmark,
                fallback = FALLBACK_BENCHMARK,
                "Benchmark has no data, substituting"
            );
            bench = self.data.get_series(FALLBACK_BENCHMARK, from, today).await;
        }
        let bench = bench?;

        compute_beta(&sym_series, &bench, cfg.min_points, cfg.winsor_pct)
    }

    /// Render one symbol's chart into the accepted/ or rejected/ bucket.
    /// Render failures are logged and never disturb the record.
    async fn dispatch_chart(&self, series: &PriceSeries, facts: &ScanFacts, outcome: &FilterOutcome) {
        let bucket = if outcome.passed { "accepted" } else { "rejected" };
        let dest: PathBuf = Path::new(&self.config.output.out_dir)
            .join("charts")
            .join(bucket);

        let mut overlays = Vec::new();
        if !facts.ma_fast.is_empty() {
            overlays.push(Overlay {
                label: format!("SMA {}", self.config.trend.ma_mid),
                values: facts.ma_fast.clone(),
            });
        }
        if !facts.ma_slow.is_empty() {
            overlays.push(Overlay {
                label: format!("SMA {}", self.config.trend.ma_slow),
                values: facts.ma_slow.clone(),
            });
        }
        let fail = (!outcome.passed).then(|| outcome.fail_reason());

        let _guard = self.render_lock.lock().await;
        if let Err(e) = self
            .renderer
            .render(series, &overlays, &self.style, &dest, fail.as_deref())
        {
            warn!(symbol = %facts.symbol, error = %e, "Chart render failed");
        }
    }
}
