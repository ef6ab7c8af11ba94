//! Instrument quotes and the Yahoo Finance quote source.
//!
//! This module handles:
//! - The per-instrument quote shape consumed by the scorer
//! - Fetching price, P/E and P/B for a single symbol from Yahoo Finance
//! - Bounded-concurrency fan-out across the configured universe

use crate::error::QuoteError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// A single instrument as supplied by the quote source. Built once per run,
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub ticker: String,
    pub price: f64,
    pub pe_ratio: f64,
    pub pb_ratio: f64,
}

/// Anything that can resolve a symbol into a quote. The pipeline only depends
/// on this seam, so tests can drive it with a canned source.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, QuoteError>;
}

// One client for the whole run; reqwest multiplexes connections internally.
static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("default TLS backend available")
});

/// Quote source backed by the Yahoo Finance v7 quote endpoint.
pub struct YahooFinance {
    client: reqwest::Client,
}

impl YahooFinance {
    pub fn new() -> Self {
        YahooFinance {
            client: HTTP.clone(),
        }
    }
}

impl Default for YahooFinance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for YahooFinance {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, QuoteError> {
        let url = format!("https://query1.finance.yahoo.com/v7/finance/quote?symbols={ticker}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::Request {
                ticker: ticker.to_string(),
                source: e,
            })?;

        let json: Value = resp.json().await.map_err(|e| QuoteError::Request {
            ticker: ticker.to_string(),
            source: e,
        })?;

        parse_quote(ticker, &json)
    }
}

/// Pull price, P/E and P/B out of a v7 quote payload. Absence of any of the
/// three fields disqualifies the symbol.
fn parse_quote(ticker: &str, json: &Value) -> Result<StockQuote, QuoteError> {
    let item = json["quoteResponse"]["result"]
        .as_array()
        .and_then(|results| results.first())
        .ok_or_else(|| QuoteError::Payload {
            ticker: ticker.to_string(),
            reason: "empty quoteResponse.result".to_string(),
        })?;

    let price = item["regularMarketPrice"]
        .as_f64()
        .or_else(|| item["postMarketPrice"].as_f64())
        .or_else(|| item["regularMarketPreviousClose"].as_f64())
        .ok_or(QuoteError::MissingField {
            ticker: ticker.to_string(),
            field: "regularMarketPrice",
        })?;

    if price <= 0.0 {
        return Err(QuoteError::Payload {
            ticker: ticker.to_string(),
            reason: format!("non-positive price {price}"),
        });
    }

    let pe_ratio = item["trailingPE"].as_f64().ok_or(QuoteError::MissingField {
        ticker: ticker.to_string(),
        field: "trailingPE",
    })?;

    let pb_ratio = item["priceToBook"].as_f64().ok_or(QuoteError::MissingField {
        ticker: ticker.to_string(),
        field: "priceToBook",
    })?;

    Ok(StockQuote {
        ticker: ticker.to_string(),
        price,
        pe_ratio,
        pb_ratio,
    })
}

/// Fetch the whole universe with at most `max_in_flight` requests running at
/// once. Each symbol is an independent task; a symbol that fails or comes back
/// incomplete is logged and dropped while the rest of the batch proceeds.
/// Collection order is not significant; display order is re-established
/// downstream.
pub async fn fetch_universe(
    source: Arc<dyn QuoteSource>,
    tickers: &[String],
    max_in_flight: usize,
) -> Vec<StockQuote> {
    let semaphore = Arc::new(Semaphore::new(max_in_flight));
    let mut handles = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let ticker = ticker.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            source.fetch_quote(&ticker).await
        }));
    }

    let mut quotes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Ok(quote)) => {
                debug!(
                    "{}: price={:.2} P/E={:.2} P/B={:.2}",
                    quote.ticker, quote.price, quote.pe_ratio, quote.pb_ratio
                );
                quotes.push(quote);
            }
            Ok(Err(e)) => warn!("dropping symbol: {e}"),
            Err(e) => warn!("quote task aborted: {e}"),
        }
    }

    quotes
}
