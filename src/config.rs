//! Scan configuration module.
//!
//! Defines the filter/threshold tree loaded once per run from a YAML file.
//! Every key is optional; missing keys take the documented defaults, so a
//! minimal config file (or an empty one) is always valid.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "SCREENER_FILTERS_PATH";

// ============================================================================
// Main Scan Configuration
// ============================================================================

/// Top-level configuration for a screening run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Run-wide options (provider preference, enrichment toggles)
    #[serde(default)]
    pub options: OptionsConfig,

    /// Price-universe bounds
    #[serde(default)]
    pub universe: UniverseConfig,

    /// Liquidity minimums
    #[serde(default)]
    pub volume: VolumeConfig,

    /// Fundamentals bounds (market cap, beta, YTD, analyst rating)
    #[serde(default)]
    pub fundamentals: FundamentalsConfig,

    /// StochRSI momentum filter
    #[serde(default)]
    pub momentum: MomentumConfig,

    /// Moving-average trend-cross filter
    #[serde(default)]
    pub trend: TrendConfig,

    /// Beta estimation parameters
    #[serde(default)]
    pub beta: BetaConfig,

    /// HTTP timeout / retry budget
    #[serde(default)]
    pub http: HttpConfig,

    /// Worker pool and universe sizing
    #[serde(default)]
    pub scan: ScanRunConfig,

    /// Output layout (CSV + chart directories)
    #[serde(default)]
    pub output: OutputConfig,
}

impl ScanConfig {
    /// Load configuration from a YAML file.
    ///
    /// Resolution order: `SCREENER_FILTERS_PATH` env var, then the given
    /// path. A missing file is a startup error; configuration problems
    /// are fatal before any worker runs.
    pub fn load(path: &Path) -> Result<Self> {
        let resolved = std::env::var(CONFIG_PATH_ENV)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| path.to_path_buf());

        let raw = std::fs::read_to_string(&resolved)
            .with_context(|| format!("Failed to read config file {}", resolved.display()))?;

        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", resolved.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate load-time invariants.
    pub fn validate(&self) -> Result<()> {
        if self.scan.workers == 0 {
            anyhow::bail!("scan.workers must be at least 1");
        }
        if self.volume.avg_window_days == 0 {
            anyhow::bail!("volume.avg_window_days must be at least 1");
        }
        if self.momentum.stochrsi_len == 0 {
            anyhow::bail!("momentum.stochrsi_len must be at least 1");
        }
        if let (Some(lo), Some(hi)) = (self.universe.min_price, self.universe.max_price) {
            if lo > hi {
                anyhow::bail!("universe.min_price exceeds universe.max_price");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Options
// ============================================================================

/// Run-wide options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Preferred data provider: "polygon" or "yahoo"
    #[serde(default = "default_data_provider")]
    pub data_provider: String,

    /// Fetch recent/upcoming earnings dates (enrichment provider)
    #[serde(default = "default_true")]
    pub include_earnings: bool,

    /// Fetch analyst consensus rating (enrichment provider)
    #[serde(default = "default_true")]
    pub include_analyst: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            data_provider: default_data_provider(),
            include_earnings: true,
            include_analyst: true,
        }
    }
}

fn default_data_provider() -> String {
    "polygon".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Universe / Volume
// ============================================================================

/// Price bounds for the tradable universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Minimum last close (unbounded if absent)
    #[serde(default)]
    pub min_price: Option<f64>,

    /// Maximum last close (unbounded if absent)
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// Liquidity minimums over a rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Rolling window for average volume / dollar-volume
    #[serde(default = "default_avg_window_days")]
    pub avg_window_days: usize,

    /// Minimum rolling average share volume
    #[serde(default)]
    pub min_avg_volume: f64,

    /// Minimum rolling average dollar volume
    #[serde(default)]
    pub min_avg_dollar_vol: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            avg_window_days: default_avg_window_days(),
            min_avg_volume: 0.0,
            min_avg_dollar_vol: 0.0,
        }
    }
}

fn default_avg_window_days() -> usize {
    20
}

// ============================================================================
// Fundamentals
// ============================================================================

/// Fundamentals bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsConfig {
    /// Minimum market cap (missing cap always fails this predicate)
    #[serde(default)]
    pub market_cap_min: f64,

    /// Maximum market cap (unbounded if absent)
    #[serde(default)]
    pub market_cap_max: Option<f64>,

    /// Minimum beta. The Beta predicate requires a defined beta even when
    /// this bound is absent; an undefined beta always fails.
    #[serde(default)]
    pub beta_min: Option<f64>,

    /// Minimum YTD return (%)
    #[serde(default)]
    pub ytd_min_pct: Option<f64>,

    /// Maximum YTD return (%)
    #[serde(default)]
    pub ytd_max_pct: Option<f64>,

    /// Whether an undefined YTD fails the YTD predicate
    #[serde(default = "default_true")]
    pub require_ytd: bool,

    /// Allowed analyst rating labels. Empty list disables the predicate.
    #[serde(default)]
    pub analyst_ratings_allow: Vec<String>,

    /// Whether an empty rating fails when an allow-list is configured
    #[serde(default)]
    pub require_analyst_rating: bool,
}

impl Default for FundamentalsConfig {
    fn default() -> Self {
        Self {
            market_cap_min: 0.0,
            market_cap_max: None,
            beta_min: None,
            ytd_min_pct: None,
            ytd_max_pct: None,
            require_ytd: true,
            analyst_ratings_allow: Vec::new(),
            require_analyst_rating: false,
        }
    }
}

// ============================================================================
// Momentum / Trend
// ============================================================================

/// StochRSI momentum filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Enable the StochRSI predicate
    #[serde(default)]
    pub enable_stochrsi: bool,

    /// RSI length (also the normalization window)
    #[serde(default = "default_stochrsi_len")]
    pub stochrsi_len: usize,

    /// %K smoothing length
    #[serde(default = "default_stochrsi_k")]
    pub stochrsi_k: usize,

    /// %D smoothing length
    #[serde(default = "default_stochrsi_d")]
    pub stochrsi_d: usize,

    /// Ceiling for the last %K value; the filter requires strictly below
    #[serde(default = "default_stochrsi_max")]
    pub stochrsi_max: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            enable_stochrsi: false,
            stochrsi_len: default_stochrsi_len(),
            stochrsi_k: default_stochrsi_k(),
            stochrsi_d: default_stochrsi_d(),
            stochrsi_max: default_stochrsi_max(),
        }
    }
}

fn default_stochrsi_len() -> usize {
    14
}

fn default_stochrsi_k() -> usize {
    3
}

fn default_stochrsi_d() -> usize {
    3
}

fn default_stochrsi_max() -> f64 {
    0.5
}

/// Moving-average crossover filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Enable the MA crossover predicate
    #[serde(default)]
    pub enable_ma_cross_filter: bool,

    /// Fast moving average window
    #[serde(default = "default_ma_mid")]
    pub ma_mid: usize,

    /// Slow moving average window
    #[serde(default = "default_ma_slow")]
    pub ma_slow: usize,

    /// Lookahead horizon (sessions) for the projected cross
    #[serde(default = "default_ma_lookahead")]
    pub ma_cross_lookahead_days: usize,

    /// Maximum current gap between the MAs (% of the slow MA)
    #[serde(default = "default_ma_max_gap_pct")]
    pub ma_cross_max_gap_pct: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            enable_ma_cross_filter: false,
            ma_mid: default_ma_mid(),
            ma_slow: default_ma_slow(),
            ma_cross_lookahead_days: default_ma_lookahead(),
            ma_cross_max_gap_pct: default_ma_max_gap_pct(),
        }
    }
}

fn default_ma_mid() -> usize {
    50
}

fn default_ma_slow() -> usize {
    200
}

fn default_ma_lookahead() -> usize {
    20
}

fn default_ma_max_gap_pct() -> f64 {
    3.0
}

// ============================================================================
// Beta
// ============================================================================

/// Beta estimation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetaConfig {
    /// Benchmark symbol for the regression
    #[serde(default = "default_benchmark")]
    pub benchmark: String,

    /// Trailing window in years
    #[serde(default = "default_beta_years")]
    pub years: u32,

    /// Minimum aligned return observations; fewer yields an undefined beta
    #[serde(default = "default_beta_min_points")]
    pub min_points: usize,

    /// Tail fraction clipped from each return series before the regression
    #[serde(default = "default_winsor_pct")]
    pub winsor_pct: f64,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self {
            benchmark: default_benchmark(),
            years: default_beta_years(),
            min_points: default_beta_min_points(),
            winsor_pct: default_winsor_pct(),
        }
    }
}

/// Substitute benchmark when the configured one has no data.
pub const FALLBACK_BENCHMARK: &str = "SPY";

fn default_benchmark() -> String {
    FALLBACK_BENCHMARK.to_string()
}

fn default_beta_years() -> u32 {
    3
}

fn default_beta_min_points() -> usize {
    500
}

fn default_winsor_pct() -> f64 {
    0.01
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP timeout and retry budget, fixed for the run's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures (total attempts = retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (doubles per attempt)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    600
}

fn default_max_delay_ms() -> u64 {
    1500
}

// ============================================================================
// Scan run / Output
// ============================================================================

/// Worker pool and universe sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRunConfig {
    /// Concurrent per-symbol workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Price history lookback in calendar days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Cap on the number of symbols processed (unbounded if absent)
    #[serde(default)]
    pub max_symbols: Option<usize>,

    /// Path to the ticker universe file
    #[serde(default = "default_universe_file")]
    pub universe_file: String,
}

impl Default for ScanRunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            lookback_days: default_lookback_days(),
            max_symbols: None,
            universe_file: default_universe_file(),
        }
    }
}

fn default_workers() -> usize {
    16
}

fn default_lookback_days() -> i64 {
    270
}

fn default_universe_file() -> String {
    "tickers/tickers_stocks_cs.txt".to_string()
}

/// Output layout for CSV and chart artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run outputs
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Render a chart per processed symbol
    #[serde(default = "default_true")]
    pub charts_enabled: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            charts_enabled: true,
        }
    }
}

fn default_out_dir() -> String {
    "results".to_string()
}

// ============================================================================
// Tests
// ============================================================================
