//! Filter predicates over assembled facts.
//!
//! Every enabled predicate runs; failures accumulate in evaluation order
//! and never short-circuit, so a record always carries the complete set
//! of reasons it missed.

use serde::Serialize;

use super::facts::ScanFacts;
use crate::config::ScanConfig;

/// Result of running all predicates against one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOutcome {
    pub passed: bool,
    pub reasons: Vec<String>,
}

impl FilterOutcome {
    /// Reasons joined for the CSV FailReason column; empty iff passed.
    pub fn fail_reason(&self) -> String {
        self.reasons.join(",")
    }
}

/// Evaluate every enabled predicate, accumulating all failure tags.
pub fn evaluate(facts: &ScanFacts, config: &ScanConfig) -> FilterOutcome {
    let mut reasons = Vec::new();

    if !pass_universe(facts, config) {
        reasons.push("Universe".to_string());
    }
    if !pass_volume(facts, config) {
        reasons.push("Volume".to_string());
    }
    if !pass_market_cap(facts, config) {
        reasons.push("MarketCap".to_string());
    }
    if !pass_beta(facts, config) {
        reasons.push("Beta".to_string());
    }
    if !pass_ytd(facts, config) {
        reasons.push("YTD".to_string());
    }
    if !pass_analyst(facts, config) {
        reasons.push("Analyst".to_string());
    }
    if config.momentum.enable_stochrsi && !pass_stochrsi(facts, config) {
        reasons.push("StochRSI".to_string());
    }
    if config.trend.enable_ma_cross_filter
        && !ma_cross_ok(
            &facts.ma_fast,
            &facts.ma_slow,
            config.trend.ma_cross_lookahead_days,
            config.trend.ma_cross_max_gap_pct,
        )
    {
        reasons.push(format!(
            "MA{}x{}",
            config.trend.ma_mid, config.trend.ma_slow
        ));
    }

    FilterOutcome {
        passed: reasons.is_empty(),
        reasons,
    }
}

fn pass_universe(facts: &ScanFacts, config: &ScanConfig) -> bool {
    let Some(close) = facts.last_close else {
        return false;
    };
    config.universe.min_price.map_or(true, |lo| close >= lo)
        && config.universe.max_price.map_or(true, |hi| close <= hi)
}

fn pass_volume(facts: &ScanFacts, config: &ScanConfig) -> bool {
    let (Some(vol), Some(dollar)) = (facts.avg_volume, facts.avg_dollar_volume) else {
        return false;
    };
    vol >= config.volume.min_avg_volume && dollar >= config.volume.min_avg_dollar_vol
}

fn pass_market_cap(facts: &ScanFacts, config: &ScanConfig) -> bool {
    // A missing cap fails regardless of bounds.
    let Some(cap) = facts.market_cap else {
        return false;
    };
    cap >= config.fundamentals.market_cap_min
        && config.fundamentals.market_cap_max.map_or(true, |hi| cap <= hi)
}

fn pass_beta(facts: &ScanFacts, config: &ScanConfig) -> bool {
    // An undefined beta fails even without a configured floor.
    let Some(beta) = facts.beta else {
        return false;
    };
    config.fundamentals.beta_min.map_or(true, |lo| beta >= lo)
}

fn pass_ytd(facts: &ScanFacts, config: &ScanConfig) -> bool {
    let Some(ytd) = facts.ytd_pct else {
        return !config.fundamentals.require_ytd;
    };
    config.fundamentals.ytd_min_pct.map_or(true, |lo| ytd >= lo)
        && config.fundamentals.ytd_max_pct.map_or(true, |hi| ytd <= hi)
}

fn pass_analyst(facts: &ScanFacts, config: &ScanConfig) -> bool {
    let allow = &config.fundamentals.analyst_ratings_allow;
    if allow.is_empty() {
        return true;
    }
    match &facts.rating {
        Some(rating) => allow.iter().any(|a| a.eq_ignore_ascii_case(rating)),
        None => !config.fundamentals.require_analyst_rating,
    }
}

fn pass_stochrsi(facts: &ScanFacts, config: &ScanConfig) -> bool {
    match facts.stochrsi_k {
        // Strictly below the ceiling; sitting on it fails.
        Some(k) => k < config.momentum.stochrsi_max,
        None => false,
    }
}

/// Trend predicate: the fast MA is at or above the slow MA now, or a
/// cross is projected close enough ahead.
///
/// The gap-closing rate comes from a 5-session look-back on the MA
/// difference (1-session when history is short). A projected cross
/// passes only when the estimated days to cross fit in the lookahead
/// and the current gap is small relative to the slow MA.
pub fn ma_cross_ok(fast: &[f64], slow: &[f64], lookahead_days: usize, max_gap_pct: f64) -> bool {
    let n = fast.len().min(slow.len());
    if n < 2 {
        return false;
    }

    let f = fast[n - 1];
    let s = slow[n - 1];
    if f >= s {
        return true;
    }

    let lb = if n > 5 { 5 } else { 1 };
    let rate = ((f - s) - (fast[n - 1 - lb] - slow[n - 1 - lb])) / lb as f64;
    if !rate.is_finite() || rate <= 0.0 {
        return false;
    }

    let gap = s - f;
    if s == 0.0 {
        return false;
    }
    let gap_pct = gap / s * 100.0;
    let est_days = gap / rate;

    est_days <= lookahead_days as f64 && gap_pct <= max_gap_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_facts() -> ScanFacts {
        ScanFacts {
            symbol: "TEST".to_string(),
            last_close: Some(50.0),
            change_pct: Some(1.0),
            avg_volume: Some(1_000_000.0),
            avg_dollar_volume: Some(50_000_000.0),
            market_cap: Some(10.0e9),
            ytd_pct: Some(12.0),
            beta: Some(1.1),
            rating: Some("Buy".to_string()),
            ..Default::default()
        }
    }

    fn base_config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.universe.min_price = Some(5.0);
        config.universe.max_price = Some(500.0);
        config.volume.min_avg_volume = 100_000.0;
        config.fundamentals.market_cap_min = 1.0e9;
        config.fundamentals.ytd_min_pct = Some(0.0);
        config.fundamentals.analyst_ratings_allow =
            vec!["Strong Buy".to_string(), "Buy".to_string()];
        config
    }

    #[test]
    fn test_clean_pass() {
        let outcome = evaluate(&base_facts(), &base_config());
        assert!(outcome.passed);
        assert!(outcome.reasons.is_empty());
        assert_eq!(outcome.fail_reason(), "");
    }

    #[test]
    fn test_failures_accumulate_in_order() {
        let mut facts = base_facts();
        facts.last_close = Some(1.0); // below universe floor
        facts.market_cap = None;
        facts.beta = None;

        let outcome = evaluate(&facts, &base_config());
        assert!(!outcome.passed);
        assert_eq!(outcome.reasons, vec!["Universe", "MarketCap", "Beta"]);
        assert_eq!(outcome.fail_reason(), "Universe,MarketCap,Beta");
    }

    #[test]
    fn test_missing_ytd_respects_require_flag() {
        let mut facts = base_facts();
        facts.ytd_pct = None;

        let mut config = base_config();
        config.fundamentals.require_ytd = true;
        assert!(evaluate(&facts, &config).reasons.contains(&"YTD".to_string()));

        config.fundamentals.require_ytd = false;
        assert!(!evaluate(&facts, &config).reasons.contains(&"YTD".to_string()));
    }

    #[test]
    fn test_analyst_allow_list() {
        let config = base_config();

        let mut facts = base_facts();
        facts.rating = Some("Sell".to_string());
        assert!(evaluate(&facts, &config).reasons.contains(&"Analyst".to_string()));

        facts.rating = Some("buy".to_string()); // case-insensitive match
        assert!(evaluate(&facts, &config).passed);
    }

    #[test]
    fn test_empty_rating_governed_by_require_flag() {
        let mut facts = base_facts();
        facts.rating = None;

        let mut config = base_config();
        config.fundamentals.require_analyst_rating = false;
        assert!(evaluate(&facts, &config).passed);

        config.fundamentals.require_analyst_rating = true;
        assert!(evaluate(&facts, &config).reasons.contains(&"Analyst".to_string()));
    }

    #[test]
    fn test_empty_allow_list_disables_analyst_predicate() {
        let mut facts = base_facts();
        facts.rating = None;
        let mut config = base_config();
        config.fundamentals.analyst_ratings_allow.clear();
        config.fundamentals.require_analyst_rating = true;
        assert!(evaluate(&facts, &config).passed);
    }

    #[test]
    fn test_stochrsi_predicate() {
        let mut config = base_config();
        config.momentum.enable_stochrsi = true;
        config.momentum.stochrsi_max = 0.5;

        let mut facts = base_facts();
        facts.stochrsi_k = Some(0.2);
        assert!(evaluate(&facts, &config).passed);

        facts.stochrsi_k = Some(0.8);
        assert!(evaluate(&facts, &config)
            .reasons
            .contains(&"StochRSI".to_string()));

        // Exactly on the ceiling fails: the bound is strict.
        facts.stochrsi_k = Some(0.5);
        assert!(evaluate(&facts, &config)
            .reasons
            .contains(&"StochRSI".to_string()));

        facts.stochrsi_k = None;
        assert!(evaluate(&facts, &config)
            .reasons
            .contains(&"StochRSI".to_string()));
    }

    #[test]
    fn test_ma_cross_already_above_passes() {
        let fast = vec![10.0; 10];
        let slow = vec![9.0; 10];
        assert!(ma_cross_ok(&fast, &slow, 20, 3.0));
    }

    #[test]
    fn test_ma_cross_projected_within_lookahead() {
        // Gap closes by 0.1/session from 1.0 away on a slow MA of 100:
        // est 10 sessions, gap 1%.
        let slow = vec![100.0; 10];
        let fast: Vec<f64> = (0..10).map(|i| 98.5 + 0.1 * i as f64).collect();
        assert!(ma_cross_ok(&fast, &slow, 20, 3.0));
        assert!(!ma_cross_ok(&fast, &slow, 5, 3.0)); // too far out
    }

    #[test]
    fn test_ma_cross_wide_gap_fails() {
        let slow = vec![100.0; 10];
        let fast: Vec<f64> = (0..10).map(|i| 90.0 + 0.1 * i as f64).collect();
        // Closing, but the gap is ~9% of the slow MA.
        assert!(!ma_cross_ok(&fast, &slow, 200, 3.0));
    }

    #[test]
    fn test_ma_cross_diverging_fails() {
        let slow = vec![100.0; 10];
        let fast: Vec<f64> = (0..10).map(|i| 99.0 - 0.1 * i as f64).collect();
        assert!(!ma_cross_ok(&fast, &slow, 20, 3.0));
    }

    #[test]
    fn test_ma_cross_short_history_fails() {
        assert!(!ma_cross_ok(&[10.0], &[11.0], 20, 3.0));
        assert!(!ma_cross_ok(&[], &[], 20, 3.0));
    }

    #[test]
    fn test_ma_cross_one_session_fallback() {
        // Exactly 2 points forces the 1-session slope.
        let fast = vec![98.0, 99.5];
        let slow = vec![100.0, 100.0];
        // Rate 1.5/session, gap 0.5 -> est under a session.
        assert!(ma_cross_ok(&fast, &slow, 20, 3.0));
    }
}
