//! Ticker universe loading and symbol sanitization.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Instrument-class markers rejected by the sanitizer. Warrants, rights,
/// units and preferred-share listings are out of the tradable universe.
const REJECT_MARKERS: [&str; 7] = [".WS", ".W", ".WT", ".U", "PFD", "WRT", "RIGHT"];

/// Sanitize a raw ticker line into a canonical symbol.
///
/// Returns `None` for blank lines, comments and symbols carrying any
/// rejected instrument-class marker. Surviving symbols are upper-cased
/// with internal dots mapped to dashes (Yahoo/Polygon share-class form).
pub fn sanitize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if REJECT_MARKERS.iter().any(|m| upper.contains(m)) {
        return None;
    }

    Some(upper.replace('.', "-"))
}

/// Load the ticker universe from a file of one symbol per line.
///
/// Lines are sanitized, deduplicated and sorted; `max_symbols` caps the
/// result after sorting. An empty universe is a startup error.
pub fn load_universe(path: &Path, max_symbols: Option<usize>) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read universe file {}", path.display()))?;

    let unique: BTreeSet<String> = raw.lines().filter_map(sanitize_symbol).collect();
    let mut symbols: Vec<String> = unique.into_iter().collect();

    if let Some(cap) = max_symbols {
        symbols.truncate(cap);
    }

    if symbols.is_empty() {
        anyhow::bail!("Universe file {} yielded no symbols", path.display());
    }

    info!(count = symbols.len(), file = %path.display(), "Loaded ticker universe");
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_symbol("aapl"), Some("AAPL".to_string()));
        assert_eq!(sanitize_symbol("  MSFT  "), Some("MSFT".to_string()));
        assert_eq!(sanitize_symbol("BRK.B"), Some("BRK-B".to_string()));
    }

    #[test]
    fn test_sanitize_rejects_markers() {
        assert_eq!(sanitize_symbol("FOO.WS"), None);
        assert_eq!(sanitize_symbol("BAR.WT"), None);
        assert_eq!(sanitize_symbol("BAZ.U"), None);
        assert_eq!(sanitize_symbol("QUXPFD"), None);
        assert_eq!(sanitize_symbol("ABCWRT"), None);
        assert_eq!(sanitize_symbol("XYZRIGHT"), None);
    }

    #[test]
    fn test_sanitize_skips_blank_and_comment() {
        assert_eq!(sanitize_symbol(""), None);
        assert_eq!(sanitize_symbol("   "), None);
        assert_eq!(sanitize_symbol("# heading"), None);
    }

    #[test]
    fn test_load_universe_dedupes_sorts_and_caps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# US common stock\nmsft\nAAPL\naapl\nNVDA\nFOO.WS").unwrap();

        let all = load_universe(file.path(), None).unwrap();
        assert_eq!(all, vec!["AAPL", "MSFT", "NVDA"]);

        let capped = load_universe(file.path(), Some(2)).unwrap();
        assert_eq!(capped, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_load_universe_empty_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# only comments\nFOO.WS").unwrap();
        assert!(load_universe(file.path(), None).is_err());
    }
}
