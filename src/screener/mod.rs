//! Screening pipeline: per-symbol fact assembly, filter evaluation,
//! orchestration and report output.

pub mod engine;
pub mod facts;
pub mod filter;
pub mod report;

pub use engine::{ScanRecord, Scanner, SymbolOutcome};
pub use facts::ScanFacts;
pub use filter::FilterOutcome;
