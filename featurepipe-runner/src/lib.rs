//! FeaturePipe runner: configuration, feature store publishing and the
//! update → engineer → publish orchestrator.

pub mod config;
pub mod feature_store;
pub mod logging;
pub mod pipeline;

pub use config::{api_key_from_env, ConfigError, PipelineConfig, API_KEY_ENV};
pub use feature_store::{
    FeatureStore, FeatureStorePublisher, FeatureStoreTarget, HopsworksStore, PublishError,
    PublishReceipt,
};
pub use logging::{init_logging, LogFormat};
pub use pipeline::{
    Pipeline, PipelineError, PipelineOutcome, PipelineProgress, SilentProgress, StdoutProgress,
};
