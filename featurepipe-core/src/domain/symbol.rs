//! Instrument symbols and the names derived from them.
//!
//! A symbol such as `BTC/USD` names a tradable pair. Everything downstream is
//! keyed on its base asset: snapshot file names, engineered table file names and
//! the feature-group name in the feature store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between base and quote asset.
pub const SYMBOL_SEPARATOR: char = '/';

/// Appended to the lowercased base asset to form the feature-group name.
pub const FEATURE_GROUP_SUFFIX: &str = "_features";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol '{0}' has no base asset before '{SYMBOL_SEPARATOR}'")]
    MissingBase(String),
}

/// Validated instrument identifier, e.g. `BTC/USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        let symbol = Self(trimmed.to_string());
        if symbol.base_asset().trim().is_empty() {
            return Err(SymbolError::MissingBase(trimmed.to_string()));
        }
        Ok(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the separator (`BTC` for `BTC/USD`). A symbol without a
    /// separator is its own base asset.
    pub fn base_asset(&self) -> &str {
        match self.0.split_once(SYMBOL_SEPARATOR) {
            Some((base, _)) => base,
            None => &self.0,
        }
    }

    /// Feature-group name: lowercased base asset plus `_features`.
    pub fn feature_group_name(&self) -> String {
        format!("{}{FEATURE_GROUP_SUFFIX}", self.base_asset().to_lowercase())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
