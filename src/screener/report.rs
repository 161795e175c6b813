//! Result sink: fixed-column CSV plus the end-of-run summary.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::engine::{ScanRecord, SymbolOutcome};

/// CSV header, fixed for downstream consumers.
const CSV_HEADER: &str = "Ticker,Date,Close,ChangePct,MarketCap,YTDpct,Beta,AnalystRating,RecentEarnings,UpcomingEarnings,Sector,FailReason";

/// How many skipped symbols the summary names before truncating.
const SKIP_SAMPLE_LIMIT: usize = 10;

/// Format a dollar amount with a K/M/B/T suffix.
pub fn human_money(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn record_row(record: &ScanRecord) -> String {
    let fields = [
        record.symbol.clone(),
        record.date.map(|d| d.to_string()).unwrap_or_default(),
        opt_num(record.close),
        opt_num(record.change_pct),
        record.market_cap.map(human_money).unwrap_or_default(),
        opt_num(record.ytd_pct),
        opt_num(record.beta),
        record.rating.clone().unwrap_or_default(),
        record
            .recent_earnings
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record
            .upcoming_earnings
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record.sector.clone().unwrap_or_default(),
        record.fail_reason.clone(),
    ];
    fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write every record (passed and failed) to a CSV file.
pub fn write_csv(records: &[ScanRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir {}", parent.display()))?;
    }

    let mut out = String::with_capacity(records.len() * 96 + CSV_HEADER.len());
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        let _ = writeln!(out, "{}", record_row(record));
    }

    std::fs::write(path, out)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    info!(records = records.len(), path = %path.display(), "Wrote results CSV");
    Ok(())
}

/// End-of-run tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// First few skipped symbols, for the log line.
    pub skipped_sample: Vec<String>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[SymbolOutcome]) -> Self {
        let mut summary = Self {
            processed: outcomes.len(),
            passed: 0,
            failed: 0,
            skipped: 0,
            skipped_sample: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                SymbolOutcome::Record(r) if r.passed() => summary.passed += 1,
                SymbolOutcome::Record(_) => summary.failed += 1,
                SymbolOutcome::Skipped { symbol } => {
                    summary.skipped += 1;
                    if summary.skipped_sample.len() < SKIP_SAMPLE_LIMIT {
                        summary.skipped_sample.push(symbol.clone());
                    }
                }
            }
        }
        summary
    }

    pub fn log(&self) {
        info!(
            processed = self.processed,
            passed = self.passed,
            failed = self.failed,
            skipped = self.skipped,
            "Run summary"
        );
        if self.skipped > 0 {
            let suffix = if self.skipped > self.skipped_sample.len() {
                format!(" (+{} more)", self.skipped - self.skipped_sample.len())
            } else {
                String::new()
            };
            info!(
                sample = %self.skipped_sample.join(","),
                "Skipped symbols{suffix}"
            );
        }
    }
}

/// Extract the records from a run, dropping skips.
pub fn records(outcomes: &[SymbolOutcome]) -> Vec<ScanRecord> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            SymbolOutcome::Record(r) => Some(r.clone()),
            SymbolOutcome::Skipped { .. } => None,
        })
        .collect()
}
