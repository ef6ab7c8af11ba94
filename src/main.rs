mod config;
mod error;
mod portfolio;
mod report;
mod scoring;
mod stocks;

use config::Config;
use error::ConfigError;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use stocks::{QuoteSource, YahooFinance};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auto_investor=info".into()),
        )
        .init();

    let config = load_config()?;
    info!(
        "universe of {} symbols, budget ${:.2}",
        config.tickers.len(),
        config.budget
    );

    let source: Arc<dyn QuoteSource> = Arc::new(YahooFinance::new());
    let quotes =
        stocks::fetch_universe(source, &config.tickers, config.max_concurrent_fetches).await;
    info!(
        "{} of {} symbols have complete quote data",
        quotes.len(),
        config.tickers.len()
    );

    let scored = scoring::score_stocks(quotes, &config.multipliers, config.weight_exponent)
        .map_err(|e| format!("scoring failed: {e}"))?;

    let mut portfolio = portfolio::build_portfolio(scored, config.budget)
        .map_err(|e| format!("allocation failed: {e}"))?;
    portfolio::refine(&mut portfolio, config.swap_iteration_cap);

    report::print_summary(&portfolio);
    report::write_csv(&portfolio, Path::new(&config.export_path))
        .map_err(|e| format!("failed to write `{}`: {e}", config.export_path))?;
    info!("wrote {}", config.export_path);

    Ok(())
}

/// Resolve the run configuration: an explicit path argument wins, then a
/// `config.toml` in the working directory, then compiled defaults.
fn load_config() -> Result<Config, ConfigError> {
    if let Some(path) = std::env::args().nth(1) {
        return Config::from_file(path);
    }
    if Path::new("config.toml").exists() {
        return Config::from_file("config.toml");
    }
    Ok(Config::default())
}
