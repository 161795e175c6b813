//! Polygon.io adapter: daily aggregates and reference data.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use super::provider::{DataProvider, ProviderError, ProviderResult};
use super::{PriceBar, PriceSeries, Profile};
use crate::net::HttpClient;

const PROVIDER: &str = "polygon";
const BASE_URL: &str = "https://api.polygon.io";

/// Environment variable holding the Polygon API key.
pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

pub struct PolygonProvider {
    http: HttpClient,
    api_key: String,
}

impl PolygonProvider {
    /// Build the adapter. Fails when no API key is configured; the caller
    /// then falls back to a key-less provider.
    pub fn new(http: HttpClient, api_key: Option<String>) -> ProviderResult<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredentials {
                provider: PROVIDER.to_string(),
            })?;
        Ok(Self { http, api_key })
    }

    fn auth_header(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.api_key))
    }
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<AggBar>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    /// Epoch milliseconds of the bar's start
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: Option<TickerDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct TickerDetails {
    market_cap: Option<f64>,
    sic_description: Option<String>,
    description: Option<String>,
    share_class_shares_outstanding: Option<f64>,
    weighted_shares_outstanding: Option<f64>,
}

// ============================================================================
// DataProvider implementation
// ============================================================================

#[async_trait]
impl DataProvider for PolygonProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<PriceSeries> {
        let url = format!("{BASE_URL}/v2/aggs/ticker/{symbol}/range/1/day/{from}/{to}");
        let params = [
            ("adjusted", "true".to_string()),
            ("sort", "asc".to_string()),
            ("limit", "50000".to_string()),
        ];

        let json = self
            .http
            .get_json(&url, &[self.auth_header()], &params)
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        let parsed: AggsResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::malformed(PROVIDER, symbol, e.to_string()))?;

        let bars: Vec<PriceBar> = parsed
            .results
            .iter()
            .filter_map(|a| {
                let date = DateTime::from_timestamp_millis(a.t)?.date_naive();
                Some(PriceBar {
                    date,
                    open: a.o,
                    high: a.h,
                    low: a.l,
                    close: a.c,
                    volume: a.v,
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(ProviderError::no_data(PROVIDER, symbol));
        }

        debug!(symbol, bars = bars.len(), "Fetched daily aggregates");
        Ok(PriceSeries::new(symbol, bars))
    }

    async fn fetch_profile(&self, symbol: &str) -> ProviderResult<Profile> {
        let url = format!("{BASE_URL}/v3/reference/tickers/{symbol}");

        let json = self
            .http
            .get_json(&url, &[self.auth_header()], &[])
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        let parsed: TickerDetailsResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::malformed(PROVIDER, symbol, e.to_string()))?;

        let details = parsed.results.unwrap_or_default();
        Ok(Profile {
            market_cap: details.market_cap,
            sector: details.sic_description.or(details.description),
            shares_outstanding: details
                .share_class_shares_outstanding
                .or(details.weighted_shares_outstanding),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let http = HttpClient::new(Default::default());
        assert!(matches!(
            PolygonProvider::new(http.clone(), None),
            Err(ProviderError::MissingCredentials { .. })
        ));
        assert!(matches!(
            PolygonProvider::new(http.clone(), Some("  ".to_string())),
            Err(ProviderError::MissingCredentials { .. })
        ));
        assert!(PolygonProvider::new(http, Some("k".to_string())).is_ok());
    }

    #[test]
    fn test_aggs_parsing() {
        let json = serde_json::json!({
            "ticker": "AAPL",
            "results": [
                {"t": 1735689600000i64, "o": 100.0, "h": 101.0, "l": 99.0, "c": 100.5, "v": 1000.0},
                {"t": 1735776000000i64, "o": 100.5, "h": 102.0, "l": 100.0, "c": 101.5, "v": 1100.0}
            ]
        });
        let parsed: AggsResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].c, 100.5);
    }

    #[test]
    fn test_details_parsing_with_missing_fields() {
        let json = serde_json::json!({
            "results": {"market_cap": 3.0e12, "sic_description": "ELECTRONIC COMPUTERS"}
        });
        let parsed: TickerDetailsResponse = serde_json::from_value(json).unwrap();
        let details = parsed.results.unwrap();
        assert_eq!(details.market_cap, Some(3.0e12));
        assert_eq!(details.share_class_shares_outstanding, None);
    }
}
