use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use equity_screener::chart::{CandlestickRenderer, ChartRenderer, NullRenderer};
use equity_screener::config::ScanConfig;
use equity_screener::net::HttpClient;
use equity_screener::screener::report::{self, RunSummary};
use equity_screener::screener::Scanner;
use equity_screener::{build_market_data, logging, universe};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Arc::new(ScanConfig::load(Path::new("filters.yaml"))?);
    let symbols = universe::load_universe(
        Path::new(&config.scan.universe_file),
        config.scan.max_symbols,
    )?;

    let http = HttpClient::new(config.http.clone());
    let data = build_market_data(&config, http)?;

    let renderer: Arc<dyn ChartRenderer> = if config.output.charts_enabled {
        Arc::new(CandlestickRenderer)
    } else {
        Arc::new(NullRenderer)
    };

    let scanner = Scanner::new(config.clone(), data, renderer);
    let outcomes = scanner.run(symbols).await;

    let records = report::records(&outcomes);
    let csv_path = Path::new(&config.output.out_dir).join("results.csv");
    report::write_csv(&records, &csv_path)?;

    RunSummary::from_outcomes(&outcomes).log();
    Ok(())
}
