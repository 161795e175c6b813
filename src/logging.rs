//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Modules whose debug chatter drowns the scan log.
const NOISY_MODULES: &[&str] = &["hyper", "reqwest", "h2", "rustls"];

/// Initialize the global subscriber. `RUST_LOG` wins when set; the
/// default is `info` with HTTP internals clamped to `warn`.
pub fn init_logging() {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for module in NOISY_MODULES {
        if let Ok(directive) = format!("{module}=warn").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
