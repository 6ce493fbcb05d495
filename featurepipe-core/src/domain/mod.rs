//! Domain types shared by every stage of the pipeline.

pub mod bar;
pub mod layout;
pub mod symbol;

pub use bar::Bar;
pub use layout::DataLayout;
pub use symbol::{Symbol, SymbolError, FEATURE_GROUP_SUFFIX, SYMBOL_SEPARATOR};
