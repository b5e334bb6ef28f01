use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalysisError;

/// Backend used for the nearest wall vertex search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NearestStrategy {
    BruteForce,
    #[default]
    KdTree,
}

/// Tunable constants of the screw analysis.
///
/// Defaults are the empirical values for calcaneus meshes in millimetres.
/// Missing keys in a TOML file fall back to these defaults:
///
/// ```toml
/// probe_span = 100.0
/// probe_samples = 400
/// hit_tolerance = 3.0
/// skip_samples = 10
/// max_batch_screws = 48
/// nearest = "kd_tree"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Probes reach from `-probe_span` to `+probe_span` around each axis sample.
    pub probe_span: f64,
    pub probe_samples: usize,
    /// A wall counts as hit only if its nearest vertex is strictly closer.
    pub hit_tolerance: f64,
    /// Leading axis samples ignored by the summary (screw entry region).
    pub skip_samples: usize,
    pub max_batch_screws: usize,
    pub nearest: NearestStrategy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            probe_span: 100.0,
            probe_samples: 400,
            hit_tolerance: 3.0,
            skip_samples: 10,
            max_batch_screws: 48,
            nearest: NearestStrategy::KdTree,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(text).context("failed to parse analysis configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.probe_samples < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "probe_samples must be at least 2, got {}",
                self.probe_samples
            )));
        }
        if !self.probe_span.is_finite() || self.probe_span <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "probe_span must be positive, got {}",
                self.probe_span
            )));
        }
        if !self.hit_tolerance.is_finite() || self.hit_tolerance <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "hit_tolerance must be positive, got {}",
                self.hit_tolerance
            )));
        }
        if self.max_batch_screws == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_batch_screws must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults_match_calcaneus_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.probe_span, 100.0);
        assert_eq!(config.probe_samples, 400);
        assert_eq!(config.hit_tolerance, 3.0);
        assert_eq!(config.skip_samples, 10);
        assert_eq!(config.max_batch_screws, 48);
        assert_eq!(config.nearest, NearestStrategy::KdTree);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            "hit_tolerance = 2.5\nnearest = \"brute_force\"\n",
        )
        .unwrap();
        assert_eq!(config.hit_tolerance, 2.5);
        assert_eq!(config.nearest, NearestStrategy::BruteForce);
        assert_eq!(config.probe_samples, 400);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(AnalysisConfig::from_toml_str("probe_spam = 3.0").is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AnalysisConfig::from_toml_str("probe_samples = 1").is_err());
        assert!(AnalysisConfig::from_toml_str("probe_span = -5.0").is_err());
        assert!(AnalysisConfig::from_toml_str("hit_tolerance = 0.0").is_err());
        assert!(AnalysisConfig::from_toml_str("max_batch_screws = 0").is_err());
    }
}
