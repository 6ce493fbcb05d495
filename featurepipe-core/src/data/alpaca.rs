//! Alpaca crypto bars provider.
//!
//! Fetches hourly OHLCV bars from Alpaca's public crypto market data API
//! (`/v1beta3/crypto/us/bars`). Crypto bars need no credentials. Responses are
//! paginated through `next_page_token`; each page goes through the same
//! retry/backoff and circuit breaker logic.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, FetchResult};
use crate::domain::{Bar, Symbol};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

/// Maximum bars per page accepted by the API.
const PAGE_LIMIT: u32 = 10_000;

/// Hard cap on pages per fetch; a year of hourly bars fits in one page.
const MAX_PAGES: usize = 50;

/// Longest we will honour a server's `retry-after`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: HashMap<String, Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl From<AlpacaBar> for Bar {
    fn from(b: AlpacaBar) -> Self {
        Bar {
            timestamp: b.t,
            open: b.o,
            high: b.h,
            low: b.l,
            close: b.c,
            volume: b.v,
        }
    }
}

/// Alpaca crypto market data provider.
pub struct AlpacaCryptoProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl AlpacaCryptoProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Self::with_base_url(ALPACA_DATA_URL, circuit_breaker)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("featurepipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn bars_url(&self) -> String {
        format!("{}/v1beta3/crypto/us/bars", self.base_url)
    }

    fn query(
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("symbols", symbol.to_string()),
            ("timeframe", "1Hour".to_string()),
            ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", PAGE_LIMIT.to_string()),
            ("sort", "asc".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }
        query
    }

    /// Pull this symbol's bars out of one response page.
    fn parse_page(symbol: &Symbol, mut resp: BarsResponse) -> (Vec<Bar>, Option<String>) {
        let bars = resp
            .bars
            .remove(symbol.as_str())
            .unwrap_or_default()
            .into_iter()
            .map(Bar::from)
            .collect();
        let next = resp.next_page_token.filter(|t| !t.is_empty());
        (bars, next)
    }

    /// Exponential backoff, stretched to the server's `retry-after` (capped)
    /// when the previous attempt was rate limited.
    fn retry_delay(&self, attempt: u32, last_error: Option<&DataError>) -> Duration {
        let backoff = self.base_delay * 2u32.pow(attempt.saturating_sub(1));
        match last_error {
            Some(DataError::RateLimited { retry_after_secs }) => {
                backoff.max(Duration::from_secs(*retry_after_secs).min(MAX_RETRY_AFTER))
            }
            _ => backoff,
        }
    }

    /// Execute a single page request with retry and circuit breaker logic.
    fn fetch_page(
        &self,
        symbol: &Symbol,
        query: &[(&'static str, String)],
    ) -> Result<BarsResponse, DataError> {
        let url = self.bars_url();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt, last_error.as_ref());
                tracing::debug!(attempt, ?delay, "retrying bars request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(0);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(
                            "Alpaca rejected the request".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND
                        || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
                    {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let page: BarsResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse bars for {symbol}: {e}"
                        ))
                    })?;
                    self.circuit_breaker.record_success();
                    return Ok(page);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for AlpacaCryptoProvider {
    fn name(&self) -> &str {
        "alpaca_crypto"
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchResult, DataError> {
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let query = Self::query(symbol, start, end, page_token.as_deref());
            let page = self.fetch_page(symbol, &query)?;
            let (page_bars, next) = Self::parse_page(symbol, page);
            bars.extend(page_bars);
            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        // `end` is inclusive upstream; keep the half-open window.
        bars.retain(|b| b.timestamp >= start && b.timestamp < end);

        tracing::info!(
            symbol = %symbol,
            bars = bars.len(),
            %start,
            %end,
            "fetched bars from {}",
            self.name()
        );

        Ok(FetchResult {
            symbol: symbol.clone(),
            bars,
            source: self.name().to_string(),
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
