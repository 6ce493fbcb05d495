//! Orchestrator: update → decide → engineer → publish.
//!
//! One pass, no loops. The update status is a plain value handed to the
//! decision step; nothing downstream runs unless it is `Updated`.

use crate::config::PipelineConfig;
use crate::feature_store::{FeatureStore, FeatureStorePublisher, PublishError, PublishReceipt};
use featurepipe_core::data::{DataError, DataUpdater, UpdateStatus};
use featurepipe_core::domain::Symbol;
use featurepipe_core::features::{FeatureError, FeatureStage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal state of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    /// No new bar; nothing downstream ran.
    UpToDate,
    /// The update failed; nothing downstream ran.
    Failed { reason: String },
    /// Updated, but the snapshot held no bars. Nothing was published.
    NoData,
    Published(PublishReceipt),
}

impl PipelineOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("initialization failed: {0}")]
    Data(#[from] DataError),

    #[error("feature engineering failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("publishing failed: {0}")]
    Publish(#[from] PublishError),
}

/// Receives human-readable status lines as the pipeline progresses.
pub trait PipelineProgress {
    fn fetching(&self, _symbol: &Symbol) {}
    fn fetched(&self, _symbol: &Symbol) {}
    fn engineering(&self) {}
    fn engineered(&self) {}
    fn publishing(&self) {}
    fn published(&self) {}
    fn up_to_date(&self) {}
    fn failed(&self, _reason: &str) {}
}

/// Status lines on stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn fetching(&self, symbol: &Symbol) {
        println!("Fetching data for {symbol}...");
    }
    fn fetched(&self, symbol: &Symbol) {
        println!("Data fetched for {symbol}");
    }
    fn engineering(&self) {
        println!("Running feature engineering pipeline...");
    }
    fn engineered(&self) {
        println!("Feature engineering pipeline completed");
    }
    fn publishing(&self) {
        println!("Running feature store ingestion pipeline...");
    }
    fn published(&self) {
        println!("Feature store ingestion pipeline completed");
    }
    fn up_to_date(&self) {
        println!("Data already up to date");
    }
    fn failed(&self, _reason: &str) {
        println!("Failed to update data");
    }
}

/// Reports nothing.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    updater: &'a dyn DataUpdater,
    features: &'a dyn FeatureStage,
    store: &'a dyn FeatureStore,
    progress: &'a dyn PipelineProgress,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        updater: &'a dyn DataUpdater,
        features: &'a dyn FeatureStage,
        store: &'a dyn FeatureStore,
    ) -> Self {
        Self {
            config,
            updater,
            features,
            store,
            progress: &SilentProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn PipelineProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Backfill `days_before` days, overwriting the snapshot. Returns bars written.
    pub fn initialize(&self, days_before: u32) -> Result<usize, PipelineError> {
        let symbol = &self.config.symbol;
        self.progress.fetching(symbol);
        let written = self.updater.initialize(symbol, days_before)?;
        tracing::debug!(%symbol, bars = written, "backfill finished");
        self.progress.fetched(symbol);
        Ok(written)
    }

    /// Backfill, then engineer and publish the fresh snapshot. A backfill
    /// failure propagates instead of collapsing into `Failed`.
    pub fn run_initial(&self, days_before: u32) -> Result<PipelineOutcome, PipelineError> {
        self.initialize(days_before)?;
        self.engineer_and_publish()
    }

    /// Run one incremental pass.
    pub fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        let symbol = &self.config.symbol;
        self.progress.fetching(symbol);
        let status = self.updater.update(symbol);
        tracing::debug!(%symbol, ?status, "update finished");
        self.decide(status)
    }

    fn decide(&self, status: UpdateStatus) -> Result<PipelineOutcome, PipelineError> {
        match status {
            UpdateStatus::UpToDate => {
                self.progress.up_to_date();
                Ok(PipelineOutcome::UpToDate)
            }
            UpdateStatus::Failed { reason } => {
                self.progress.failed(&reason);
                Ok(PipelineOutcome::Failed { reason })
            }
            UpdateStatus::Updated => {
                self.progress.fetched(&self.config.symbol);
                self.engineer_and_publish()
            }
        }
    }

    fn engineer_and_publish(&self) -> Result<PipelineOutcome, PipelineError> {
        let symbol = &self.config.symbol;

        self.progress.engineering();
        let Some(artifact) = self.features.run(symbol)? else {
            tracing::warn!(%symbol, "snapshot holds no bars; skipping publish");
            return Ok(PipelineOutcome::NoData);
        };
        tracing::debug!(
            rows = artifact.rows,
            columns = artifact.columns.len(),
            "feature stage finished"
        );
        self.progress.engineered();

        self.progress.publishing();
        let publisher = FeatureStorePublisher::new(self.config.feature_store_target(), self.store);
        let receipt = publisher.run_pipeline()?;
        self.progress.published();
        Ok(PipelineOutcome::Published(receipt))
    }
}
