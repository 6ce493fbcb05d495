//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market data sources so the updater
//! can be driven by a real HTTP client or a scripted mock in tests.

use crate::domain::{Bar, Symbol};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for market data and snapshot operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no raw snapshot for '{symbol}' at {} (run with --init first)", path.display())]
    NoSnapshot { symbol: String, path: PathBuf },

    #[error("malformed snapshot {}: {reason}", path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("snapshot I/O error: {0}")]
    SnapshotIo(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: Symbol,
    pub bars: Vec<Bar>,
    /// Provider name, recorded for log lines.
    pub source: String,
}

/// Trait for hourly market data providers.
///
/// Implementations handle the specifics of one upstream API. The snapshot
/// store sits above this trait; providers never touch the filesystem.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch hourly bars opening in `[start, end)`.
    fn fetch(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
