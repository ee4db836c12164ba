//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::CompressorConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    strategy: &'static str,
    limit: usize,
    window_length_s: f64,
    metric: String,
    hold_back_newest: bool,
    uses_queue: bool,
    requires_reference: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admission_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eval_delta_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dead_reckoning_trigger_m: Option<f64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &CompressorConfig) -> ConfigInfo {
    use contracts::StrategyKind;

    ConfigInfo {
        strategy: config.strategy.as_str(),
        limit: config.limit,
        window_length_s: config.window_length_s,
        metric: format!("{:?}", config.metric).to_lowercase(),
        hold_back_newest: config.hold_back_newest,
        uses_queue: config.strategy.uses_queue(),
        requires_reference: config.requires_reference(),
        admission_filter: (config.strategy == StrategyKind::StTrace)
            .then_some(config.admission_filter),
        eval_delta_s: (config.strategy == StrategyKind::StTraceOptimalRegular)
            .then_some(config.eval_delta_s)
            .flatten(),
        dead_reckoning_trigger_m: (config.strategy == StrategyKind::DeadReckoning)
            .then_some(config.dead_reckoning.threshold_m / 2.0),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== bwc Configuration ===\n");
    println!("Strategy: {}", info.strategy);
    println!("   ├─ Window: {}s", info.window_length_s);
    println!("   ├─ Metric: {}", info.metric);
    if info.uses_queue {
        println!("   ├─ Queue limit: {} points", info.limit);
        println!("   ├─ Hold back newest: {}", info.hold_back_newest);
    }
    if let Some(filter) = info.admission_filter {
        println!("   ├─ Admission filter: {}", filter);
    }
    if let Some(delta) = info.eval_delta_s {
        println!("   ├─ Replay sampling: every {}s", delta);
    }
    if let Some(trigger) = info.dead_reckoning_trigger_m {
        println!("   ├─ Divergence trigger: {} m", trigger);
    }
    println!("   └─ Requires reference: {}", info.requires_reference);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DeadReckoningConfig, StrategyKind};

    #[test]
    fn test_dead_reckoning_info() {
        let config = CompressorConfig {
            strategy: StrategyKind::DeadReckoning,
            dead_reckoning: DeadReckoningConfig { threshold_m: 30.0 },
            ..Default::default()
        };
        let info = build_config_info(&config);
        assert!(!info.uses_queue);
        assert_eq!(info.dead_reckoning_trigger_m, Some(15.0));
        assert_eq!(info.admission_filter, None);
    }

    #[test]
    fn test_regular_info_json() {
        let config = CompressorConfig {
            strategy: StrategyKind::StTraceOptimalRegular,
            eval_delta_s: Some(5.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&build_config_info(&config)).unwrap();
        assert!(json.contains("\"eval_delta_s\":5.0"));
        assert!(json.contains("\"requires_reference\":true"));
        assert!(json.contains("\"metric\":\"planar\""));
    }
}
