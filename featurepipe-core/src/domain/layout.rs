//! On-disk layout for pipeline artifacts.
//!
//! Layout under the project base directory:
//! - `data/raw/stockdata_{BASE}.json`: raw snapshot written by the updater
//! - `data/engineered/stockdata_{BASE}_engineered.csv`: engineered table
//!
//! Both paths are pure functions of the symbol's base asset.

use super::Symbol;
use std::path::PathBuf;

/// Root-relative directory layout. Cheap to clone; holds no open handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    base_dir: PathBuf,
}

impl DataLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.base_dir.join("data").join("raw")
    }

    pub fn engineered_dir(&self) -> PathBuf {
        self.base_dir.join("data").join("engineered")
    }

    pub fn raw_snapshot_path(&self, symbol: &Symbol) -> PathBuf {
        self.raw_dir()
            .join(format!("stockdata_{}.json", symbol.base_asset()))
    }

    pub fn engineered_table_path(&self, symbol: &Symbol) -> PathBuf {
        self.engineered_dir()
            .join(format!("stockdata_{}_engineered.csv", symbol.base_asset()))
    }
}
