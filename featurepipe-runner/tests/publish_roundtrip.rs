//! End to end on disk: backfill → update → engineer → read step.

use chrono::{DateTime, TimeZone, Utc};
use featurepipe_core::data::{
    DataError, DataProvider, FetchResult, SnapshotStore, SnapshotUpdater, UpdateStatus,
    DataUpdater,
};
use featurepipe_core::domain::{Bar, Symbol};
use featurepipe_core::features::{read_engineered_table, FeatureEngineer, FeatureStage};
use featurepipe_runner::{
    FeatureStore, FeatureStorePublisher, FeatureStoreTarget, Pipeline, PipelineConfig,
    PipelineOutcome, PublishError, PublishReceipt,
};
use polars::prelude::DataFrame;
use std::cell::RefCell;

/// Synthetic market: one sane bar per requested hour.
struct SyntheticProvider;

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchResult, DataError> {
        let mut bars = Vec::new();
        let mut ts = start;
        while ts < end {
            let x = ts.timestamp() as f64 / 3600.0;
            let close = 3_000.0 + (x * 0.3).sin() * 40.0;
            bars.push(Bar {
                timestamp: ts,
                open: close - 2.0,
                high: close + 5.0,
                low: close - 6.0,
                close,
                volume: 100.0 + (x % 7.0),
            });
            ts += chrono::Duration::hours(1);
        }
        Ok(FetchResult {
            symbol: symbol.clone(),
            bars,
            source: "synthetic".into(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Keeps a copy of every uploaded frame.
#[derive(Default)]
struct CapturingStore {
    frames: RefCell<Vec<DataFrame>>,
}

impl FeatureStore for CapturingStore {
    fn upload(
        &self,
        target: &FeatureStoreTarget,
        table: &DataFrame,
    ) -> Result<PublishReceipt, PublishError> {
        self.frames.borrow_mut().push(table.clone());
        Ok(PublishReceipt {
            project_name: target.project_name.clone(),
            feature_group: target.feature_group.clone(),
            version: target.version,
            rows: table.height(),
            job: None,
        })
    }
}

fn first_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 3, 12, 15, 0).unwrap()
}

fn later_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 3, 15, 5, 0).unwrap()
}

fn config(dir: &std::path::Path) -> PipelineConfig {
    let mut cfg = PipelineConfig::from_toml(
        "[hopsworks]\nproject_name = \"crypto\"\n[stock_api_params]\nsymbol = \"ETH/USD\"\ndays_before = 2\n",
    )
    .unwrap()
    .with_api_key(Some("secret".into()));
    cfg.base_dir = dir.to_path_buf();
    cfg
}

#[test]
fn read_step_returns_what_engineer_wrote() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let updater = SnapshotUpdater::new(
        Box::new(SyntheticProvider),
        SnapshotStore::new(cfg.layout()),
    )
    .with_clock(first_clock);
    updater.initialize(&cfg.symbol, cfg.days_before).unwrap();

    let engineer = FeatureEngineer::new(cfg.layout());
    let artifact = engineer.run(&cfg.symbol).unwrap().expect("snapshot has bars");
    assert_eq!(artifact.rows, 48);

    let bars = engineer
        .load(&engineer.locate_snapshot(&cfg.symbol))
        .unwrap()
        .unwrap();
    let expected = engineer
        .engineer(&engineer.to_table(&bars).unwrap())
        .unwrap();

    let store = CapturingStore::default();
    let publisher = FeatureStorePublisher::new(cfg.feature_store_target(), &store);
    let read_back = publisher.read_table().unwrap();

    assert_eq!(read_back.height(), expected.height());
    assert_eq!(read_back.get_column_names(), expected.frame().get_column_names());
    assert!(read_back.equals_missing(expected.frame()));

    let receipt = publisher.run_pipeline().unwrap();
    assert_eq!(receipt.feature_group, "eth_features");
    assert!(store.frames.borrow()[0].equals_missing(&read_back));
}

#[test]
fn full_run_after_backfill_publishes_new_hours() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let store = CapturingStore::default();
    let engineer = FeatureEngineer::new(cfg.layout());

    let first = SnapshotUpdater::new(
        Box::new(SyntheticProvider),
        SnapshotStore::new(cfg.layout()),
    )
    .with_clock(first_clock);
    let written = Pipeline::new(&cfg, &first, &engineer, &store)
        .initialize(cfg.days_before)
        .unwrap();
    assert_eq!(written, 48);

    // Same hour: nothing new to fetch.
    assert_eq!(first.update(&cfg.symbol), UpdateStatus::UpToDate);

    let later = SnapshotUpdater::new(
        Box::new(SyntheticProvider),
        SnapshotStore::new(cfg.layout()),
    )
    .with_clock(later_clock);
    let outcome = Pipeline::new(&cfg, &later, &engineer, &store).run().unwrap();

    match outcome {
        PipelineOutcome::Published(receipt) => {
            assert_eq!(receipt.feature_group, "eth_features");
            assert_eq!(receipt.rows, 51);
        }
        other => panic!("expected Published, got {other:?}"),
    }

    let on_disk = read_engineered_table(&cfg.layout().engineered_table_path(&cfg.symbol)).unwrap();
    assert_eq!(on_disk.height(), 51);
    assert_eq!(store.frames.borrow().len(), 1);
}
