//! FeaturePipe CLI: hourly market data → engineered features → feature store.
//!
//! With no flags: incremental update of the configured symbol, then, only if
//! new bars arrived, feature engineering and publishing.
//! With `--init`: backfill `--days-before` days first, then engineer and publish.

use anyhow::{Context, Result};
use clap::Parser;
use featurepipe_core::data::{AlpacaCryptoProvider, CircuitBreaker, SnapshotStore, SnapshotUpdater};
use featurepipe_core::features::FeatureEngineer;
use featurepipe_runner::{
    api_key_from_env, init_logging, HopsworksStore, LogFormat, Pipeline, PipelineConfig,
    PipelineOutcome, StdoutProgress,
};
use featurepipe_core::domain::Symbol;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "featurepipe",
    version,
    about = "Update hourly market data, engineer features and publish them to Hopsworks"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Backfill the raw snapshot before engineering (overwrites it).
    #[arg(long, default_value_t = false)]
    init: bool,

    /// Backfill window in days (with --init). Defaults to the config value.
    #[arg(long, requires = "init")]
    days_before: Option<u32>,

    /// Log output format: plain or json.
    #[arg(long, default_value = "plain")]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    match run() {
        Ok(outcome) if outcome.is_failure() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<PipelineOutcome> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = PipelineConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_api_key(api_key_from_env());
    tracing::info!(
        symbol = %config.symbol,
        project = %config.project_name,
        base_dir = %config.base_dir.display(),
        "configuration loaded"
    );

    let breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = AlpacaCryptoProvider::new(breaker)?;
    let updater = SnapshotUpdater::new(Box::new(provider), SnapshotStore::new(config.layout()));
    let engineer = FeatureEngineer::new(config.layout());
    let store = HopsworksStore::new(&config.hopsworks_host)?;
    let progress = StdoutProgress;

    let pipeline = Pipeline::new(&config, &updater, &engineer, &store).with_progress(&progress);

    let outcome = if cli.init {
        let days = cli.days_before.unwrap_or(config.days_before);
        pipeline.run_initial(days)?
    } else {
        pipeline.run()?
    };

    report(&outcome, &config.symbol, &mut std::io::stdout().lock())?;
    Ok(outcome)
}

/// Final summary. Only a publish adds a stdout line; the other outcomes were
/// already reported as status lines or halt silently.
fn report(outcome: &PipelineOutcome, symbol: &Symbol, out: &mut impl Write) -> Result<()> {
    match outcome {
        PipelineOutcome::UpToDate => {}
        PipelineOutcome::Failed { reason } => {
            tracing::error!(%symbol, %reason, "pipeline stopped after failed update");
        }
        PipelineOutcome::NoData => {
            tracing::info!(%symbol, "no raw data available; nothing published");
        }
        PipelineOutcome::Published(receipt) => {
            writeln!(
                out,
                "Published {} rows to {} (version {})",
                receipt.rows, receipt.feature_group, receipt.version
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurepipe_runner::PublishReceipt;

    fn btc() -> Symbol {
        Symbol::parse("BTC/USD").unwrap()
    }

    fn rendered(outcome: &PipelineOutcome) -> String {
        let mut buf = Vec::new();
        report(outcome, &btc(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn no_data_halts_silently() {
        assert_eq!(rendered(&PipelineOutcome::NoData), "");
        assert_eq!(rendered(&PipelineOutcome::UpToDate), "");
        assert_eq!(
            rendered(&PipelineOutcome::Failed {
                reason: "offline".into()
            }),
            ""
        );
    }

    #[test]
    fn publish_prints_summary() {
        let outcome = PipelineOutcome::Published(PublishReceipt {
            project_name: "crypto".into(),
            feature_group: "btc_features".into(),
            version: 1,
            rows: 30,
            job: None,
        });
        assert_eq!(
            rendered(&outcome),
            "Published 30 rows to btc_features (version 1)\n"
        );
    }

    #[test]
    fn cli_parses_init_flags() {
        let cli = Cli::try_parse_from(["featurepipe", "--init", "--days-before", "7"]).unwrap();
        assert!(cli.init);
        assert_eq!(cli.days_before, Some(7));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(Cli::try_parse_from(["featurepipe", "--days-before", "7"]).is_err());
    }
}
