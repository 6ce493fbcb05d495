//! Market data: providers, raw snapshots and the incremental updater.

pub mod alpaca;
pub mod canonicalize;
pub mod circuit_breaker;
pub mod provider;
pub mod snapshot;
pub mod updater;

pub use alpaca::AlpacaCryptoProvider;
pub use canonicalize::{canonicalize, merge_bars, Canonicalized};
pub use circuit_breaker::CircuitBreaker;
pub use provider::{DataError, DataProvider, FetchResult};
pub use snapshot::{read_snapshot_file, Snapshot, SnapshotStore};
pub use updater::{DataUpdater, SnapshotUpdater, UpdateStatus, DEFAULT_DAYS_BEFORE};
