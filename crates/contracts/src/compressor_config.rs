//! Compressor configuration contracts shared across crates.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::ContractError;

/// Bandwidth-constrained compressor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_strategy_options"))]
pub struct CompressorConfig {
    /// Window length in seconds
    #[validate(range(exclusive_min = 0.0))]
    pub window_length_s: f64,

    /// Maximum number of points in the eviction structure, shared by all trajectories
    #[validate(range(min = 1))]
    pub limit: usize,

    /// Priority strategy
    pub strategy: StrategyKind,

    /// STTrace "interesting point" admission filter
    #[serde(default = "default_admission_filter")]
    pub admission_filter: bool,

    /// Replay sampling interval in seconds (STTrace-Optimal-Regular)
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub eval_delta_s: Option<f64>,

    /// Distance metric
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Withhold the newest point of each trajectory by one step (delay instrumentation)
    #[serde(default)]
    pub hold_back_newest: bool,

    /// Dead reckoning parameters
    #[serde(default)]
    #[validate(nested)]
    pub dead_reckoning: DeadReckoningConfig,
}

fn default_admission_filter() -> bool {
    true
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            window_length_s: 900.0,
            limit: 100,
            strategy: StrategyKind::default(),
            admission_filter: default_admission_filter(),
            eval_delta_s: None,
            metric: DistanceMetric::default(),
            hold_back_newest: false,
            dead_reckoning: DeadReckoningConfig::default(),
        }
    }
}

impl CompressorConfig {
    /// Run the field and cross-field checks, mapped onto [`ContractError`]
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(ContractError::from_validation)
    }

    /// Whether this configuration needs a ground-truth reference
    pub fn requires_reference(&self) -> bool {
        self.strategy.requires_reference()
    }
}

fn validate_strategy_options(config: &CompressorConfig) -> Result<(), ValidationError> {
    if config.strategy == StrategyKind::StTraceOptimalRegular && config.eval_delta_s.is_none() {
        return Err(ValidationError::new("eval_delta_s").with_message(Cow::Borrowed(
            "eval_delta_s is required for st_trace_optimal_regular",
        )));
    }
    if config.strategy == StrategyKind::DeadReckoning && config.hold_back_newest {
        return Err(ValidationError::new("hold_back_newest").with_message(Cow::Borrowed(
            "hold_back_newest is not applicable to dead_reckoning",
        )));
    }
    Ok(())
}

/// Dead reckoning configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeadReckoningConfig {
    /// Caller threshold in metres; divergence is tested against half of it
    #[validate(range(exclusive_min = 0.0))]
    pub threshold_m: f64,
}

impl Default for DeadReckoningConfig {
    fn default() -> Self {
        Self { threshold_m: 10.0 }
    }
}

/// Priority strategy selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Amortized error propagation
    #[default]
    Squish,
    /// Exact local SED recompute
    StTrace,
    /// Replay error sampled at the reference trajectory's own instants
    StTraceOptimal,
    /// Replay error sampled at a fixed interval
    StTraceOptimalRegular,
    /// Predictive, queue-free
    DeadReckoning,
}

impl StrategyKind {
    pub fn requires_reference(&self) -> bool {
        matches!(self, Self::StTraceOptimal | Self::StTraceOptimalRegular)
    }

    pub fn uses_queue(&self) -> bool {
        !matches!(self, Self::DeadReckoning)
    }

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Squish => "squish",
            Self::StTrace => "st_trace",
            Self::StTraceOptimal => "st_trace_optimal",
            Self::StTraceOptimalRegular => "st_trace_optimal_regular",
            Self::DeadReckoning => "dead_reckoning",
        }
    }
}

/// Distance metric selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance on projected metre coordinates
    #[default]
    Planar,
    /// Great-circle distance on longitude/latitude degrees
    Haversine,
}

impl ContractError {
    /// Flatten `validator` output into the first failing field, sorted by name
    pub fn from_validation(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, field_errors) in fields {
            if let Some(first) = field_errors.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", first.code));
                return Self::config_validation(field.to_string(), message);
            }
        }

        // nested struct failures are not listed in field_errors()
        Self::config_validation("config", errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CompressorConfig::default().check().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = CompressorConfig {
            window_length_s: 0.0,
            ..Default::default()
        };
        let err = config.check().unwrap_err().to_string();
        assert!(err.contains("window_length_s"), "got: {err}");
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = CompressorConfig {
            limit: 0,
            ..Default::default()
        };
        let err = config.check().unwrap_err().to_string();
        assert!(err.contains("limit"), "got: {err}");
    }

    #[test]
    fn test_regular_requires_eval_delta() {
        let config = CompressorConfig {
            strategy: StrategyKind::StTraceOptimalRegular,
            ..Default::default()
        };
        let err = config.check().unwrap_err().to_string();
        assert!(err.contains("eval_delta_s is required"), "got: {err}");

        let config = CompressorConfig {
            strategy: StrategyKind::StTraceOptimalRegular,
            eval_delta_s: Some(30.0),
            ..Default::default()
        };
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_negative_dead_reckoning_threshold_rejected() {
        let config = CompressorConfig {
            strategy: StrategyKind::DeadReckoning,
            dead_reckoning: DeadReckoningConfig { threshold_m: -1.0 },
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_hold_back_rejected_for_dead_reckoning() {
        let config = CompressorConfig {
            strategy: StrategyKind::DeadReckoning,
            hold_back_newest: true,
            ..Default::default()
        };
        let err = config.check().unwrap_err().to_string();
        assert!(err.contains("not applicable"), "got: {err}");
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&StrategyKind::StTraceOptimalRegular).unwrap();
        assert_eq!(json, "\"st_trace_optimal_regular\"");
        assert_eq!(StrategyKind::StTraceOptimalRegular.as_str(), "st_trace_optimal_regular");
    }

    #[test]
    fn test_admission_filter_defaults_on() {
        let config: CompressorConfig = serde_json::from_str(
            r#"{ "window_length_s": 60.0, "limit": 10, "strategy": "st_trace" }"#,
        )
        .unwrap();
        assert!(config.admission_filter);
        assert_eq!(config.metric, DistanceMetric::Planar);
    }
}
