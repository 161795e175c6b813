//! Provider façade: fallback between adapters plus cache-first reads.
//!
//! Workers talk to `MarketData` only. Strategy selection is stateless;
//! every call re-evaluates preferred-then-fallback, and memoization keeps
//! repeated lookups (benchmark series, duplicated symbols) to one fetch.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::cache::FetchCache;
use super::provider::DataProvider;
use super::{EarningsDates, PriceSeries, Profile};

pub struct MarketData {
    preferred: Arc<dyn DataProvider>,
    fallback: Option<Arc<dyn DataProvider>>,
    cache: Arc<FetchCache>,
}

impl MarketData {
    pub fn new(
        preferred: Arc<dyn DataProvider>,
        fallback: Option<Arc<dyn DataProvider>>,
        cache: Arc<FetchCache>,
    ) -> Self {
        Self {
            preferred,
            fallback,
            cache,
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    fn enrichment_provider(&self) -> Option<&Arc<dyn DataProvider>> {
        if self.preferred.supports_enrichment() {
            return Some(&self.preferred);
        }
        self.fallback.as_ref().filter(|p| p.supports_enrichment())
    }

    /// Daily history with provider fallback. `None` means no provider has
    /// data for the symbol in the window.
    pub async fn get_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Option<PriceSeries> {
        let key = FetchCache::series_key(symbol, from, to);
        if let Some(cached) = self.cache.get_series(&key) {
            return cached;
        }

        let mut result = match self.preferred.fetch_series(symbol, from, to).await {
            Ok(series) => Some(series),
            Err(e) => {
                debug!(symbol, provider = self.preferred.name(), error = %e, "Series fetch failed");
                None
            }
        };

        if result.is_none() {
            if let Some(fallback) = &self.fallback {
                match fallback.fetch_series(symbol, from, to).await {
                    Ok(series) => {
                        debug!(symbol, provider = fallback.name(), "Series served by fallback");
                        result = Some(series);
                    }
                    Err(e) => {
                        warn!(symbol, provider = fallback.name(), error = %e, "Series fetch failed on fallback");
                    }
                }
            }
        }

        self.cache.put_series(&key, result.clone());
        result
    }

    /// Profile with fallback; an all-null profile from the preferred
    /// provider also triggers the alternative.
    pub async fn get_profile(&self, symbol: &str) -> Option<Profile> {
        if let Some(cached) = self.cache.get_profile(symbol) {
            return cached;
        }

        let mut result = match self.preferred.fetch_profile(symbol).await {
            Ok(profile) if !profile.is_empty() => Some(profile),
            Ok(_) => {
                debug!(symbol, provider = self.preferred.name(), "Profile came back empty");
                None
            }
            Err(e) => {
                debug!(symbol, provider = self.preferred.name(), error = %e, "Profile fetch failed");
                None
            }
        };

        if result.is_none() {
            if let Some(fallback) = &self.fallback {
                match fallback.fetch_profile(symbol).await {
                    Ok(profile) if !profile.is_empty() => result = Some(profile),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(symbol, provider = fallback.name(), error = %e, "Profile fetch failed on fallback");
                    }
                }
            }
        }

        self.cache.put_profile(symbol, result.clone());
        result
    }

    /// Earnings dates from the enrichment-capable provider, if any.
    pub async fn get_earnings(&self, symbol: &str) -> Option<EarningsDates> {
        if let Some(cached) = self.cache.get_earnings(symbol) {
            return cached;
        }

        let result = match self.enrichment_provider() {
            Some(provider) => match provider.fetch_earnings(symbol).await {
                Ok(dates) => Some(dates),
                Err(e) => {
                    debug!(symbol, provider = provider.name(), error = %e, "Earnings fetch failed");
                    None
                }
            },
            None => None,
        };

        self.cache.put_earnings(symbol, result);
        result
    }

    /// Analyst consensus label from the enrichment-capable provider.
    pub async fn get_rating(&self, symbol: &str) -> Option<String> {
        if let Some(cached) = self.cache.get_rating(symbol) {
            return cached.flatten();
        }

        let result = match self.enrichment_provider() {
            Some(provider) => match provider.fetch_rating(symbol).await {
                Ok(label) => Some(label),
                Err(e) => {
                    debug!(symbol, provider = provider.name(), error = %e, "Rating fetch failed");
                    None
                }
            },
            None => None,
        };

        self.cache.put_rating(symbol, result.clone());
        result.flatten()
    }
}
