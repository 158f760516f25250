/// Run configuration: coverage strength, limits, and parallelism.
use serde::{Deserialize, Serialize};

use super::limits::RunLimits;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid run configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for one execution run.
///
/// Every field has a default, so a partial JSON document such as
/// `{"strength": 3}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Coverage strength (default: 2, pairwise).
    pub strength: usize,
    /// Stop after this many cases. None = run until coverage is complete.
    pub max_cases: Option<usize>,
    /// Stop once this many seconds have elapsed, checked between cases.
    pub max_wall_secs: Option<u64>,
    /// Execute cases across the rayon thread pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strength: 2,
            max_cases: None,
            max_wall_secs: None,
            parallel: false,
        }
    }
}

impl RunConfig {
    pub fn with_strength(strength: usize) -> Self {
        Self {
            strength,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits {
            max_cases: self.max_cases,
            max_wall_secs: self.max_wall_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.strength, 2);
        assert_eq!(config.max_cases, None);
        assert!(!config.parallel);
        assert_eq!(config.limits(), RunLimits::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = RunConfig::from_json(r#"{"strength": 3, "max_cases": 50}"#).unwrap();
        assert_eq!(config.strength, 3);
        assert_eq!(config.limits().max_cases, Some(50));
        assert_eq!(config.max_wall_secs, None);
        assert!(!config.parallel);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(RunConfig::from_json("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            RunConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(RunConfig::from_json(r#"{"strength": -1}"#).is_err());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = RunConfig {
            strength: 4,
            max_cases: Some(7),
            max_wall_secs: Some(30),
            parallel: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RunConfig::from_json(&json).unwrap(), config);
    }
}
