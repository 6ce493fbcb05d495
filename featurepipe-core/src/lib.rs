//! featurepipe core: domain types, market data snapshots, indicators and
//! feature engineering.
//!
//! This crate holds everything the pipeline needs below the orchestration layer:
//! - Domain types (hourly bars, symbols, on-disk layout)
//! - Market data providers, circuit breaker, raw snapshot store and updater
//! - Indicators computed over bar history
//! - Feature engineering from raw snapshot to engineered table

pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
