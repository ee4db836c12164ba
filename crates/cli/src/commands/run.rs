//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::CompressorConfig;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub fn run_compression(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    info!(
        strategy = config.strategy.as_str(),
        limit = config.limit,
        window_length_s = config.window_length_s,
        hold_back_newest = config.hold_back_newest,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        compressor: config,
        input: args.input.clone(),
        reference: args.reference.clone(),
        output: args.output.clone(),
        evaluate: args.evaluate,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let stats = Pipeline::new(pipeline_config)
        .run()
        .context("Compression failed")?;
    stats.print_summary();

    info!("bwc finished");
    Ok(())
}

/// Apply command-line overrides on top of the file configuration
fn apply_overrides(config: &mut CompressorConfig, args: &RunArgs) {
    if let Some(limit) = args.limit {
        info!(limit, "Overriding limit from CLI");
        config.limit = limit;
    }
    if let Some(window) = args.window {
        info!(window_length_s = window, "Overriding window length from CLI");
        config.window_length_s = window;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
        info!(strategy = config.strategy.as_str(), "Overriding strategy from CLI");
    }
    if args.hold_back {
        config.hold_back_newest = true;
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &CompressorConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("  Strategy: {}", config.strategy.as_str());
    println!("  Limit: {}", config.limit);
    println!("  Window: {}s", config.window_length_s);
    println!("  Metric: {:?}", config.metric);
    println!("  Hold back newest: {}", config.hold_back_newest);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StrategyArg;
    use contracts::StrategyKind;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("c.toml"),
            input: PathBuf::from("in.jsonl"),
            output: None,
            reference: None,
            limit: None,
            window: None,
            strategy: None,
            hold_back: false,
            evaluate: false,
            dry_run: false,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let mut config = CompressorConfig::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.limit, CompressorConfig::default().limit);
        assert!(!config.hold_back_newest);
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = CompressorConfig::default();
        let args = RunArgs {
            limit: Some(7),
            window: Some(60.0),
            strategy: Some(StrategyArg::StTrace),
            hold_back: true,
            ..args()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.limit, 7);
        assert_eq!(config.window_length_s, 60.0);
        assert_eq!(config.strategy, StrategyKind::StTrace);
        assert!(config.hold_back_newest);
    }
}
