//! Pure series math: rolling means, StochRSI, YTD return.
//!
//! Everything here is deterministic over in-memory slices; undefined
//! points (warm-up windows, zero ranges, empty years) surface as `None`
//! and flow into the filter predicates unchanged.

pub mod beta;

use crate::data::PriceSeries;

/// Rolling mean with a shrinking early window (minimum one observation),
/// so every point is defined.
pub fn sma(values: &[f64], n: usize) -> Vec<f64> {
    let n = n.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= n {
            sum -= values[i - n];
        }
        let window = (i + 1).min(n);
        out.push(sum / window as f64);
    }
    out
}

/// Rolling mean over a trailing window, averaging whatever defined
/// values the window holds (minimum one); `None` only when the window
/// has no defined value at all.
fn rolling_mean_opt(values: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    let n = n.max(1);
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(n);
            let defined: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if defined.is_empty() {
                None
            } else {
                Some(defined.iter().sum::<f64>() / defined.len() as f64)
            }
        })
        .collect()
}

/// Stochastic RSI output: smoothed %K and %D lines.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsi {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

impl StochRsi {
    pub fn last_k(&self) -> Option<f64> {
        self.k.last().copied().flatten()
    }
}

/// Stochastic RSI over closes.
///
/// RSI uses Wilder smoothing (exponential mean with alpha = 1/len,
/// defined once `len` deltas have been seen; a gainless and lossless
/// window leaves it undefined). Normalization and the %K/%D smoothing
/// run over trailing windows that take whatever observations are
/// available, so short histories still yield a %K. A zero RSI range in
/// the window yields `None` for that point.
pub fn stoch_rsi(closes: &[f64], len: usize, k: usize, d: usize) -> StochRsi {
    let len = len.max(1);
    let n = closes.len();
    let mut rsi: Vec<Option<f64>> = vec![None; n];

    if n >= 2 {
        let alpha = 1.0 / len as f64;
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for i in 1..n {
            let delta = closes[i] - closes[i - 1];
            let gain = delta.max(0.0);
            let loss = (-delta).max(0.0);
            if i == 1 {
                avg_gain = gain;
                avg_loss = loss;
            } else {
                avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
                avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
            }
            if i >= len {
                rsi[i] = if avg_gain == 0.0 && avg_loss == 0.0 {
                    None
                } else if avg_loss == 0.0 {
                    Some(100.0)
                } else {
                    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
                };
            }
        }
    }

    // Min-max normalize RSI over the trailing `len` window.
    let mut stoch: Vec<Option<f64>> = vec![None; n];
    for i in 0..n {
        let Some(r) = rsi[i] else { continue };
        let start = (i + 1).saturating_sub(len);
        let window: Vec<f64> = rsi[start..=i].iter().flatten().copied().collect();
        let lo = window.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let hi = window.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let range = hi - lo;
        if range > 0.0 {
            stoch[i] = Some((r - lo) / range);
        }
    }

    let k_line = rolling_mean_opt(&stoch, k);
    let d_line = rolling_mean_opt(&k_line, d);
    StochRsi { k: k_line, d: d_line }
}

/// Year-to-date return in percent, measured over the bars belonging to
/// the last bar's calendar year. `None` when the series is empty or the
/// year's first close is zero.
pub fn ytd_pct(series: &PriceSeries) -> Option<f64> {
    use chrono::Datelike;

    let year = series.last()?.date.year();
    let mut first = None;
    let mut last = None;
    for bar in &series.bars {
        if bar.date.year() == year {
            if first.is_none() {
                first = Some(bar.close);
            }
            last = Some(bar.close);
        }
    }
    let (first, last) = (first?, last?);
    if first == 0.0 {
        return None;
    }
    Some((last / first - 1.0) * 100.0)
}
