//! Configuration validation
//!
//! Rules:
//! - derive checks on `CompressorConfig` (window > 0, limit >= 1, threshold > 0)
//! - cross-field strategy options (eval_delta_s, hold_back_newest)
//! - every numeric parameter is finite

use contracts::{CompressorConfig, ContractError};
use tracing::warn;

/// Validate a parsed configuration
///
/// Returns the first error found, or Ok(()).
pub fn validate(config: &CompressorConfig) -> Result<(), ContractError> {
    validate_finite(config)?;
    config.check()?;
    warn_ignored_options(config);
    Ok(())
}

/// Reject NaN and infinite parameters
fn validate_finite(config: &CompressorConfig) -> Result<(), ContractError> {
    if !config.window_length_s.is_finite() {
        return Err(ContractError::config_validation(
            "window_length_s",
            format!("must be finite, got {}", config.window_length_s),
        ));
    }
    if let Some(delta) = config.eval_delta_s {
        if !delta.is_finite() {
            return Err(ContractError::config_validation(
                "eval_delta_s",
                format!("must be finite, got {delta}"),
            ));
        }
    }
    if !config.dead_reckoning.threshold_m.is_finite() {
        return Err(ContractError::config_validation(
            "dead_reckoning.threshold_m",
            format!("must be finite, got {}", config.dead_reckoning.threshold_m),
        ));
    }
    Ok(())
}

/// Options that parse fine but have no effect on the selected strategy
fn warn_ignored_options(config: &CompressorConfig) {
    use contracts::StrategyKind;

    if config.eval_delta_s.is_some() && config.strategy != StrategyKind::StTraceOptimalRegular {
        warn!(
            strategy = config.strategy.as_str(),
            "eval_delta_s is only used by st_trace_optimal_regular"
        );
    }
}
