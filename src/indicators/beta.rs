//! Market beta: OLS slope of symbol log returns on benchmark log returns.

use statrs::statistics::{Data, OrderStatistics};

use crate::data::PriceSeries;

/// Forward-fill benchmark closes onto the symbol's dates.
///
/// Both series are date-sorted. Symbol dates before the benchmark's first
/// bar have no fill and are dropped, which is the date intersection the
/// regression runs on.
fn align_ffill(symbol: &PriceSeries, benchmark: &PriceSeries) -> Vec<(f64, f64)> {
    let mut aligned = Vec::with_capacity(symbol.len());
    let mut bench_iter = benchmark.bars.iter().peekable();
    let mut last_bench: Option<f64> = None;

    for bar in &symbol.bars {
        while let Some(b) = bench_iter.peek() {
            if b.date <= bar.date {
                last_bench = Some(b.close);
                bench_iter.next();
            } else {
                break;
            }
        }
        if let Some(bench_close) = last_bench {
            aligned.push((bar.close, bench_close));
        }
    }
    aligned
}

fn log_returns(values: impl Iterator<Item = f64> + Clone) -> Vec<f64> {
    let v: Vec<f64> = values.collect();
    let mut out = Vec::with_capacity(v.len().saturating_sub(1));
    for i in 1..v.len() {
        if v[i - 1] > 0.0 && v[i] > 0.0 {
            out.push((v[i] / v[i - 1]).ln());
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

/// Clamp a return series to its [pct, 1-pct] empirical quantiles.
fn winsorize(values: &[f64], pct: f64) -> Vec<f64> {
    if values.is_empty() || pct <= 0.0 {
        return values.to_vec();
    }
    let mut data = Data::new(values.to_vec());
    let lo = data.quantile(pct);
    let hi = data.quantile(1.0 - pct);
    values.iter().map(|v| v.clamp(lo, hi)).collect()
}

/// Compute beta over pre-windowed series.
///
/// Returns `None` when fewer than `min_points` aligned return pairs
/// survive, or when the benchmark shows no variance.
pub fn compute_beta(
    symbol: &PriceSeries,
    benchmark: &PriceSeries,
    min_points: usize,
    winsor_pct: f64,
) -> Option<f64> {
    let aligned = align_ffill(symbol, benchmark);
    if aligned.len() < 2 {
        return None;
    }

    let sym_returns = log_returns(aligned.iter().map(|(s, _)| *s));
    let bench_returns = log_returns(aligned.iter().map(|(_, b)| *b));

    // Intersect: keep pairs where both returns are finite.
    let (sym, bench): (Vec<f64>, Vec<f64>) = sym_returns
        .iter()
        .zip(bench_returns.iter())
        .filter(|(s, b)| s.is_finite() && b.is_finite())
        .map(|(s, b)| (*s, *b))
        .unzip();

    if sym.len() < min_points {
        return None;
    }

    let sym = winsorize(&sym, winsor_pct);
    let bench = winsorize(&bench, winsor_pct);

    let n = sym.len() as f64;
    let mean_s = sym.iter().sum::<f64>() / n;
    let mean_b = bench.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (s, b) in sym.iter().zip(bench.iter()) {
        cov += (s - mean_s) * (b - mean_b);
        var += (b - mean_b) * (b - mean_b);
    }

    if var == 0.0 {
        return None;
    }
    let beta = cov / var;
    beta.is_finite().then_some(beta)
}
