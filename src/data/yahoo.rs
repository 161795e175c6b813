//! Yahoo Finance adapter: chart candles, quoteSummary fundamentals,
//! earnings dates and analyst consensus.
//!
//! The quoteSummary surface is loosely shaped (numbers arrive as
//! `{"raw": n, "fmt": "..."}` envelopes, whole modules go missing), so
//! this adapter mines `serde_json::Value` with pointers instead of rigid
//! response structs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;

use super::provider::{DataProvider, ProviderError, ProviderResult};
use super::{EarningsDates, PriceBar, PriceSeries, Profile};
use crate::net::HttpClient;

const PROVIDER: &str = "yahoo";
const BASE_URL: &str = "https://query1.finance.yahoo.com";

pub struct YahooProvider {
    http: HttpClient,
}

impl YahooProvider {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Option<Value> {
        let url = format!("{BASE_URL}/v10/finance/quoteSummary/{symbol}");
        let params = [("modules", modules.to_string())];
        let json = self.http.get_json(&url, &[], &params).await?;
        json.pointer("/quoteSummary/result/0").cloned()
    }
}

/// Unwrap Yahoo's `{"raw": n, "fmt": "..."}` number envelope.
fn raw_f64(value: &Value, pointer: &str) -> Option<f64> {
    let node = value.pointer(pointer)?;
    node.get("raw").and_then(Value::as_f64).or_else(|| node.as_f64())
}

fn raw_date(value: &Value, pointer: &str) -> Option<NaiveDate> {
    let epoch = value
        .pointer(pointer)?
        .get("raw")
        .and_then(Value::as_i64)
        .or_else(|| value.pointer(pointer).and_then(Value::as_i64))?;
    Some(DateTime::from_timestamp(epoch, 0)?.date_naive())
}

// ============================================================================
// Rating derivation
// ============================================================================

/// Bucket an analyst consensus mean into a label.
pub fn bucket_rating_mean(mean: f64) -> &'static str {
    if mean <= 1.5 {
        "Strong Buy"
    } else if mean <= 2.5 {
        "Buy"
    } else if mean <= 3.5 {
        "Hold"
    } else if mean <= 4.5 {
        "Sell"
    } else {
        "Strong Sell"
    }
}

/// Derive a label from recommendation vote counts.
///
/// Votes are compared as grouped tallies, strong-buy+buy against hold
/// against sell+strong-sell, walking a ladder from the most bullish
/// claim down: Strong Buy needs the strong-buy column to lead every
/// other column and the bullish group to cover everyone else, Buy needs
/// a strict bullish plurality, Hold wins any remaining tie, and only a
/// strict bearish plurality reads Sell. All-zero votes yield nothing.
pub fn rating_from_votes(
    strong_buy: u64,
    buy: u64,
    hold: u64,
    sell: u64,
    strong_sell: u64,
) -> Option<&'static str> {
    if strong_buy + buy + hold + sell + strong_sell == 0 {
        return None;
    }

    let pos = strong_buy + buy;
    let neg = sell + strong_sell;

    if strong_buy >= buy.max(hold).max(sell).max(strong_sell) && pos >= hold + neg {
        return Some("Strong Buy");
    }
    if pos > hold.max(neg) {
        return Some("Buy");
    }
    if hold >= pos.max(neg) {
        return Some("Hold");
    }
    if neg > pos {
        return Some("Sell");
    }
    Some("Hold")
}

// ============================================================================
// DataProvider implementation
// ============================================================================

#[async_trait]
impl DataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn supports_enrichment(&self) -> bool {
        true
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProviderResult<PriceSeries> {
        let url = format!("{BASE_URL}/v8/finance/chart/{symbol}");
        let period1 = from
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = to
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let params = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "div,split".to_string()),
        ];

        let json = self
            .http
            .get_json(&url, &[], &params)
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        let result = json
            .pointer("/chart/result/0")
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        let timestamps = result
            .pointer("/timestamp")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;
        let quote = result
            .pointer("/indicators/quote/0")
            .ok_or_else(|| ProviderError::malformed(PROVIDER, symbol, "missing quote block"))?;

        let field = |name: &str, i: usize| -> Option<f64> {
            quote.pointer(&format!("/{name}/{i}")).and_then(Value::as_f64)
        };

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let Some(epoch) = ts.as_i64() else { continue };
            let Some(date) = DateTime::from_timestamp(epoch, 0).map(|d| d.date_naive()) else {
                continue;
            };
            // Yahoo pads halted sessions with nulls; skip incomplete bars.
            let (Some(open), Some(high), Some(low), Some(close)) = (
                field("open", i),
                field("high", i),
                field("low", i),
                field("close", i),
            ) else {
                continue;
            };
            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: field("volume", i).unwrap_or(0.0),
            });
        }

        if bars.is_empty() {
            return Err(ProviderError::no_data(PROVIDER, symbol));
        }

        debug!(symbol, bars = bars.len(), "Fetched chart candles");
        Ok(PriceSeries::new(symbol, bars))
    }

    async fn fetch_profile(&self, symbol: &str) -> ProviderResult<Profile> {
        let result = self
            .quote_summary(symbol, "summaryDetail,assetProfile,defaultKeyStatistics")
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        Ok(Profile {
            market_cap: raw_f64(&result, "/summaryDetail/marketCap"),
            sector: result
                .pointer("/assetProfile/sector")
                .and_then(Value::as_str)
                .map(str::to_string),
            shares_outstanding: raw_f64(&result, "/defaultKeyStatistics/sharesOutstanding"),
        })
    }

    async fn fetch_earnings(&self, symbol: &str) -> ProviderResult<EarningsDates> {
        let result = self
            .quote_summary(symbol, "calendarEvents,earningsHistory")
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        let today = Utc::now().date_naive();

        let upcoming = result
            .pointer("/calendarEvents/earnings/earningsDate")
            .and_then(Value::as_array)
            .map(|dates| {
                dates
                    .iter()
                    .filter_map(|d| {
                        let epoch = d.get("raw").and_then(Value::as_i64).or_else(|| d.as_i64())?;
                        Some(DateTime::from_timestamp(epoch, 0)?.date_naive())
                    })
                    .filter(|d| *d >= today)
                    .min()
            })
            .unwrap_or(None);

        let recent = result
            .pointer("/earningsHistory/history")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| raw_date(row, "/quarter"))
                    .filter(|d| *d < today)
                    .max()
            })
            .unwrap_or(None);

        Ok(EarningsDates { recent, upcoming })
    }

    async fn fetch_rating(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let result = self
            .quote_summary(symbol, "financialData,recommendationTrend")
            .await
            .ok_or_else(|| ProviderError::no_data(PROVIDER, symbol))?;

        if let Some(mean) = raw_f64(&result, "/financialData/recommendationMean") {
            return Ok(Some(bucket_rating_mean(mean).to_string()));
        }

        let votes = |name: &str| -> u64 {
            result
                .pointer(&format!("/recommendationTrend/trend/0/{name}"))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        Ok(rating_from_votes(
            votes("strongBuy"),
            votes("buy"),
            votes("hold"),
            votes("sell"),
            votes("strongSell"),
        )
        .map(str::to_string))
    }
}
