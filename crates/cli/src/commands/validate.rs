//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CompressorConfig, StrategyKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    strategy: String,
    limit: usize,
    window_length_s: f64,
    requires_reference: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    strategy: config.strategy.as_str().to_string(),
                    limit: config.limit,
                    window_length_s: config.window_length_s,
                    requires_reference: config.requires_reference(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &CompressorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.strategy != StrategyKind::StTrace && !config.admission_filter {
        warnings.push("admission_filter only applies to st_trace".to_string());
    }

    if config.strategy == StrategyKind::StTrace && config.hold_back_newest && config.admission_filter {
        warnings.push(
            "admission_filter is not applied while hold_back_newest is enabled".to_string(),
        );
    }

    if config.eval_delta_s.is_some() && config.strategy != StrategyKind::StTraceOptimalRegular {
        warnings.push("eval_delta_s only applies to st_trace_optimal_regular".to_string());
    }

    if config.requires_reference() {
        warnings.push(format!(
            "{} needs ground truth; `run` uses the input unless --reference is given",
            config.strategy.as_str()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Strategy: {}", summary.strategy);
            println!("  Limit: {}", summary.limit);
            println!("  Window: {}s", summary.window_length_s);
            println!("  Requires reference: {}", summary.requires_reference);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "does-not-exist.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "window_length_s = 60.0\nlimit = 5\nstrategy = \"squish\"\neval_delta_s = 3.0"
        )
        .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.warnings.map(|w| w.len()), Some(1));
    }
}
