//! Configuration parsing
//!
//! TOML (primary) and JSON.

use contracts::{CompressorConfig, ContractError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML configuration
pub fn parse_toml(content: &str) -> Result<CompressorConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON configuration
pub fn parse_json(content: &str) -> Result<CompressorConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<CompressorConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DistanceMetric, StrategyKind};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
window_length_s = 900.0
limit = 50
strategy = "st_trace"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.strategy, StrategyKind::StTrace);
        assert_eq!(config.limit, 50);
        assert!(config.admission_filter);
        assert!(!config.hold_back_newest);
    }

    #[test]
    fn test_parse_toml_nested_dead_reckoning() {
        let content = r#"
window_length_s = 60.0
limit = 10
strategy = "dead_reckoning"
metric = "haversine"

[dead_reckoning]
threshold_m = 25.0
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.metric, DistanceMetric::Haversine);
        assert_eq!(config.dead_reckoning.threshold_m, 25.0);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "window_length_s": 300.0,
            "limit": 20,
            "strategy": "st_trace_optimal_regular",
            "eval_delta_s": 10.0,
            "hold_back_newest": true
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().eval_delta_s, Some(10.0));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let content = r#"
window_length_s = 60.0
limit = 10
strategy = "douglas_peucker"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
