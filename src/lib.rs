//! Batch equity screener.
//!
//! Screens a universe of ticker symbols against configurable quantitative
//! filters and emits, per symbol, a decision record plus an optional chart
//! routed into an accepted/rejected bucket.
//!
//! # Architecture
//!
//! ```text
//! universe file ──► Scanner (bounded worker pool, ordered results)
//!                      │ per symbol:
//!                      │   MarketData (polygon ⇄ yahoo, memo cache)
//!                      │   indicators (SMA, StochRSI, YTD, beta)
//!                      │   filter predicates (accumulate fail tags)
//!                      │   ChartRenderer (serialized)
//!                      ▼
//!                  CSV report + run summary
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod chart;
pub mod config;
pub mod data;
pub mod indicators;
pub mod logging;
pub mod net;
pub mod screener;
pub mod universe;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::data::polygon::{self, PolygonProvider};
use crate::data::yahoo::YahooProvider;
use crate::data::{DataProvider, FetchCache, MarketData};
use crate::net::HttpClient;

/// Environment variable overriding the configured preferred provider.
pub const DATA_PROVIDER_ENV: &str = "SCREENER_DATA_PROVIDER";

/// Build the provider façade for a run.
///
/// Polygon participates only when `POLYGON_API_KEY` is set; without it
/// the scan runs Yahoo-only. The preferred provider comes from config,
/// overridable via `SCREENER_DATA_PROVIDER`.
pub fn build_market_data(config: &ScanConfig, http: HttpClient) -> Result<Arc<MarketData>> {
    let preference = std::env::var(DATA_PROVIDER_ENV)
        .unwrap_or_else(|_| config.options.data_provider.clone())
        .to_lowercase();

    let yahoo: Arc<dyn DataProvider> = Arc::new(YahooProvider::new(http.clone()));
    let polygon: Option<Arc<dyn DataProvider>> =
        match PolygonProvider::new(http, std::env::var(polygon::API_KEY_ENV).ok()) {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                warn!(error = %e, "Polygon disabled, running Yahoo-only");
                None
            }
        };

    let (preferred, fallback) = match (preference.as_str(), polygon) {
        ("polygon", Some(polygon)) => (polygon, Some(yahoo)),
        ("polygon", None) => (yahoo, None),
        (_, polygon) => (yahoo, polygon),
    };

    info!(
        preferred = preferred.name(),
        fallback = fallback.as_ref().map(|p| p.name()).unwrap_or("none"),
        "Provider selection"
    );

    Ok(Arc::new(MarketData::new(
        preferred,
        fallback,
        Arc::new(FetchCache::new()),
    )))
}
