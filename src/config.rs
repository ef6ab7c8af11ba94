//! Run configuration.
//!
//! Every policy value the pipeline consumes (budget, universe, category
//! multipliers, weight exponent, fetch concurrency, swap iteration cap) lives
//! in one immutable [`Config`] that is passed into each stage explicitly, so
//! unit tests can vary any of them.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// First 50 companies of the S&P 500, the default investment universe.
pub const DEFAULT_TICKERS: &[&str] = &[
    "NVDA", "AAPL", "MSFT", "AMZN", "GOOGL", "GOOG", "META", "AVGO",
    "TSLA", "BRK-B", "LLY", "JPM", "WMT", "V", "ORCL", "MA", "XOM",
    "JNJ", "PLTR", "BAC", "ABBV", "NFLX", "COST", "AMD", "HD", "PG",
    "GE", "MU", "CSCO", "CVX", "KO", "WFC", "UNH", "MS", "IBM", "GS",
    "CAT", "MRK", "AXP", "PM", "RTX", "CRM", "APP", "LRCX", "MCD",
    "TMUS", "TMO", "C", "ABT", "AMAT",
];

/// Root configuration. All fields are optional in the TOML file and fall back
/// to the defaults below.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Total cash available for purchases, in currency units.
    #[serde(default = "default_budget")]
    pub budget: f64,

    /// Ordered universe of symbols to quote. Duplicates are rejected.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Exponent applied to the adjusted score; higher values concentrate the
    /// allocation into the best-ranked names.
    #[serde(default = "default_weight_exponent")]
    pub weight_exponent: u32,

    /// Maximum number of quote requests in flight at once.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Upper bound on swap-refinement iterations.
    #[serde(default = "default_swap_iteration_cap")]
    pub swap_iteration_cap: u32,

    /// Where the allocation table is written.
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Score multiplier per valuation category.
    #[serde(default)]
    pub multipliers: Multipliers,
}

/// Policy multipliers for the four valuation categories.
#[derive(Debug, Clone, Deserialize)]
pub struct Multipliers {
    #[serde(default = "default_both_undervalued")]
    pub both_undervalued: f64,
    #[serde(default = "default_pe_undervalued")]
    pub pe_undervalued: f64,
    #[serde(default = "default_pb_undervalued")]
    pub pb_undervalued: f64,
    #[serde(default = "default_both_overvalued")]
    pub both_overvalued: f64,
}

fn default_budget() -> f64 {
    100_000.0
}

fn default_tickers() -> Vec<String> {
    DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect()
}

fn default_weight_exponent() -> u32 {
    3
}

fn default_max_concurrent_fetches() -> usize {
    10
}

fn default_swap_iteration_cap() -> u32 {
    1000
}

fn default_export_path() -> String {
    "allocation.csv".to_string()
}

fn default_both_undervalued() -> f64 {
    2.0
}

fn default_pe_undervalued() -> f64 {
    1.2
}

fn default_pb_undervalued() -> f64 {
    1.2
}

fn default_both_overvalued() -> f64 {
    1.0
}

impl Default for Multipliers {
    fn default() -> Self {
        Multipliers {
            both_undervalued: default_both_undervalued(),
            pe_undervalued: default_pe_undervalued(),
            pb_undervalued: default_pb_undervalued(),
            both_overvalued: default_both_overvalued(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            budget: default_budget(),
            tickers: default_tickers(),
            weight_exponent: default_weight_exponent(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            swap_iteration_cap: default_swap_iteration_cap(),
            export_path: default_export_path(),
            multipliers: Multipliers::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.budget > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "budget must be positive, got {}",
                self.budget
            )));
        }
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("ticker universe is empty".into()));
        }
        let mut seen = HashSet::new();
        for ticker in &self.tickers {
            if !seen.insert(ticker.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate ticker `{ticker}` in universe"
                )));
            }
        }
        if self.weight_exponent == 0 {
            return Err(ConfigError::Invalid("weight_exponent must be >= 1".into()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_fetches must be >= 1".into(),
            ));
        }
        if self.swap_iteration_cap == 0 {
            return Err(ConfigError::Invalid(
                "swap_iteration_cap must be >= 1".into(),
            ));
        }
        let m = &self.multipliers;
        for (name, value) in [
            ("both_undervalued", m.both_undervalued),
            ("pe_undervalued", m.pe_undervalued),
            ("pb_undervalued", m.pb_undervalued),
            ("both_overvalued", m.both_overvalued),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "multiplier `{name}` must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}
