//! Publisher: credential check → read step → upload.

use super::{FeatureStore, FeatureStoreTarget, PublishError, PublishReceipt};
use featurepipe_core::features::read_engineered_table;
use polars::prelude::DataFrame;

pub struct FeatureStorePublisher<'a> {
    target: FeatureStoreTarget,
    store: &'a dyn FeatureStore,
}

impl<'a> FeatureStorePublisher<'a> {
    pub fn new(target: FeatureStoreTarget, store: &'a dyn FeatureStore) -> Self {
        Self { target, store }
    }

    pub fn target(&self) -> &FeatureStoreTarget {
        &self.target
    }

    /// Read the engineered table from the target's source path.
    pub fn read_table(&self) -> Result<DataFrame, PublishError> {
        let path = &self.target.source_path;
        if !path.exists() {
            return Err(PublishError::MissingTable { path: path.clone() });
        }
        Ok(read_engineered_table(path)?)
    }

    /// Publish the engineered table. No network traffic happens unless a
    /// credential is present.
    pub fn run_pipeline(&self) -> Result<PublishReceipt, PublishError> {
        if self.target.credential().is_none() {
            return Err(PublishError::MissingCredential);
        }

        let table = self.read_table()?;
        tracing::info!(
            project = %self.target.project_name,
            feature_group = %self.target.feature_group,
            rows = table.height(),
            "uploading engineered table"
        );

        let receipt = self.store.upload(&self.target, &table)?;
        tracing::info!(
            feature_group = %receipt.feature_group,
            version = receipt.version,
            rows = receipt.rows,
            job = receipt.job.as_deref().unwrap_or("-"),
            "upload accepted"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurepipe_core::domain::{Bar, DataLayout, Symbol};
    use featurepipe_core::features::FeatureEngineer;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingStore {
        uploads: RefCell<Vec<(String, usize)>>,
    }

    impl FeatureStore for RecordingStore {
        fn upload(
            &self,
            target: &FeatureStoreTarget,
            table: &DataFrame,
        ) -> Result<PublishReceipt, PublishError> {
            self.uploads
                .borrow_mut()
                .push((target.feature_group.clone(), table.height()));
            Ok(PublishReceipt {
                project_name: target.project_name.clone(),
                feature_group: target.feature_group.clone(),
                version: target.version,
                rows: table.height(),
                job: None,
            })
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        let start = chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar {
                    timestamp: start + chrono::Duration::hours(i as i64),
                    open: c,
                    high: c + 1.0,
                    low: c - 1.0,
                    close: c,
                    volume: 10.0,
                }
            })
            .collect()
    }

    fn write_table(layout: &DataLayout, symbol: &Symbol, n: usize) {
        let engineer = FeatureEngineer::new(layout.clone());
        let raw = engineer.to_table(&bars(n)).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        engineer.persist(&table, symbol).unwrap();
    }

    #[test]
    fn missing_credential_fails_before_read_or_upload() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let symbol = Symbol::parse("BTC/USD").unwrap();
        let store = RecordingStore::default();
        let target = FeatureStoreTarget::for_symbol("p", &symbol, None, &layout);

        let err = FeatureStorePublisher::new(target, &store)
            .run_pipeline()
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingCredential));
        assert!(store.uploads.borrow().is_empty());
    }

    #[test]
    fn missing_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let symbol = Symbol::parse("BTC/USD").unwrap();
        let store = RecordingStore::default();
        let target = FeatureStoreTarget::for_symbol("p", &symbol, Some("k".into()), &layout);

        let err = FeatureStorePublisher::new(target, &store)
            .run_pipeline()
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingTable { .. }));
        assert!(store.uploads.borrow().is_empty());
    }

    #[test]
    fn uploads_table_to_derived_group() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let symbol = Symbol::parse("BTC/USD").unwrap();
        write_table(&layout, &symbol, 30);

        let store = RecordingStore::default();
        let target = FeatureStoreTarget::for_symbol("p", &symbol, Some("k".into()), &layout);
        let receipt = FeatureStorePublisher::new(target, &store)
            .run_pipeline()
            .unwrap();

        assert_eq!(receipt.feature_group, "btc_features");
        assert_eq!(receipt.rows, 30);
        assert_eq!(
            store.uploads.borrow().as_slice(),
            &[("btc_features".to_string(), 30)]
        );
    }

    #[test]
    fn corrupt_table_is_a_table_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let symbol = Symbol::parse("BTC/USD").unwrap();
        let path = layout.engineered_table_path(&symbol);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "timestamp,open\n2024-01-01T00:00:00Z,1.0\n").unwrap();

        let store = RecordingStore::default();
        let target = FeatureStoreTarget::for_symbol("p", &symbol, Some("k".into()), &layout);
        let err = FeatureStorePublisher::new(target, &store)
            .run_pipeline()
            .unwrap_err();
        assert!(matches!(err, PublishError::Table(_)));
        assert!(store.uploads.borrow().is_empty());
    }
}
