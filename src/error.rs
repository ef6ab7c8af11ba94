use thiserror::Error;

/// Per-symbol quote failures. Never fatal: the symbol is logged, dropped from
/// the batch, and the run continues with whatever survives.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("{ticker}: quote payload has no usable `{field}`")]
    MissingField {
        ticker: String,
        field: &'static str,
    },

    #[error("{ticker}: request failed: {source}")]
    Request {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{ticker}: unexpected payload: {reason}")]
    Payload { ticker: String, reason: String },
}

/// Fatal pipeline failures. These abort the whole run before any partial
/// output is produced.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// No instruments survived quote filtering; there is nothing to score.
    #[error("no instruments survived quote filtering; cannot build a portfolio")]
    InsufficientData,

    /// The weighted-score sum is unusable as a divisor. Should not happen
    /// given the positive shift, but division by it is never done silently.
    #[error("weighted score sum is {sum}; refusing to divide the budget")]
    ArithmeticDegeneracy { sum: f64 },
}

/// Configuration loading and validation failures, fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
