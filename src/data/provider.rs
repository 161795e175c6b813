//! Provider abstraction: the trait every market data source implements.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::{EarningsDates, PriceSeries, Profile};

/// Errors surfaced by a provider adapter.
///
/// The retrying HTTP layer already degrades transient trouble to absence,
/// so by the time an adapter reports, the taxonomy is small: either the
/// upstream had nothing for us, the payload did not parse, or the adapter
/// cannot authenticate at all.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: no data for {symbol}")]
    NoData { provider: String, symbol: String },

    #[error("{provider}: malformed response for {symbol}: {detail}")]
    Malformed {
        provider: String,
        symbol: String,
        detail: String,
    },

    #[error("{provider}: missing credentials")]
    MissingCredentials { provider: String },

    #[error("{provider}: unsupported operation {operation}")]
    Unsupported {
        provider: String,
        operation: String,
    },
}

impl ProviderError {
    pub fn no_data(provider: &str, symbol: &str) -> Self {
        Self::NoData {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn malformed(provider: &str, symbol: &str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }

    pub fn unsupported(provider: &str, operation: &str) -> Self {
        Self::Unsupported {
            provider: provider.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Whether the façade should try the alternative provider.
    pub fn should_failover(&self) -> bool {
        // Every failure mode here leaves the symbol unserved; another
        // provider may still have it.
        true
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A market data source.
///
/// Adapters are pure translators from upstream JSON to typed results;
/// fallback and memoization live in the façade, not here.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Short provider name used in logs and cache keys.
    fn name(&self) -> &'static str;

    /// Whether this provider serves earnings dates and analyst ratings.
    fn supports_enrichment(&self) -> bool {
        false
    }

    /// Daily price history over [from, to], inclusive.
    async fn fetch_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<PriceSeries>;

    /// Company reference data.
    async fn fetch_profile(&self, symbol: &str) -> ProviderResult<Profile>;

    /// Earnings dates split around today. Enrichment-capable providers only.
    async fn fetch_earnings(&self, _symbol: &str) -> ProviderResult<EarningsDates> {
        Err(ProviderError::unsupported(self.name(), "fetch_earnings"))
    }

    /// Analyst consensus rating label. Enrichment-capable providers only.
    async fn fetch_rating(&self, _symbol: &str) -> ProviderResult<Option<String>> {
        Err(ProviderError::unsupported(self.name(), "fetch_rating"))
    }
}
