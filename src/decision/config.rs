//! Scoring configuration.
//!
//! The rubric's thresholds are data, not code.  Defaults:
//!
//! ```yaml
//! identity_bands: [1, 2, 3, 4]    # score = 1 + thresholds met
//! heuristic_bands: [1, 2, 3, 4]
//! memory_bands: [1, 2, 3, 4]
//! high_priority_rank: 2           # top-N values count as high priority
//! default_template_key: default
//! min_relevance: 2                # anchors need a layer score above this
//! moderate_floor: 12              # aggregate bands over 5..=25
//! high_floor: 18
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::output::ScoreBand;

/// Lowest and highest dimension score.
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Thresholds for the per-layer rubric and the aggregate bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub identity_bands: Vec<usize>,
    pub heuristic_bands: Vec<usize>,
    pub memory_bands: Vec<usize>,
    pub high_priority_rank: usize,
    pub default_template_key: String,
    pub min_relevance: u8,
    pub moderate_floor: u32,
    pub high_floor: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            identity_bands: vec![1, 2, 3, 4],
            heuristic_bands: vec![1, 2, 3, 4],
            memory_bands: vec![1, 2, 3, 4],
            high_priority_rank: 2,
            default_template_key: "default".to_string(),
            min_relevance: 2,
            moderate_floor: 12,
            high_floor: 18,
        }
    }
}

impl DecisionConfig {
    /// Parse and validate a YAML document. Missing keys take defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML file on disk.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check that the thresholds describe a usable rubric.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bands) in [
            ("identity_bands", &self.identity_bands),
            ("heuristic_bands", &self.heuristic_bands),
            ("memory_bands", &self.memory_bands),
        ] {
            if bands.len() > usize::from(MAX_SCORE - MIN_SCORE) {
                return Err(ConfigError::Invalid(format!(
                    "{} has more than {} thresholds",
                    name,
                    MAX_SCORE - MIN_SCORE
                )));
            }
            if bands.first() == Some(&0) || !bands.windows(2).all(|w| w[0] < w[1]) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be strictly ascending and start above zero",
                    name
                )));
            }
        }
        if self.high_priority_rank == 0 {
            return Err(ConfigError::Invalid(
                "high_priority_rank must be at least 1".to_string(),
            ));
        }
        if self.default_template_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_template_key must not be empty".to_string(),
            ));
        }
        if !(MIN_SCORE..MAX_SCORE).contains(&self.min_relevance) {
            return Err(ConfigError::Invalid(format!(
                "min_relevance must be in {}..{}",
                MIN_SCORE, MAX_SCORE
            )));
        }
        let (lo, hi) = Self::aggregate_range();
        if !(lo < self.moderate_floor && self.moderate_floor < self.high_floor && self.high_floor <= hi)
        {
            return Err(ConfigError::Invalid(format!(
                "need {} < moderate_floor < high_floor <= {}",
                lo, hi
            )));
        }
        Ok(())
    }

    /// Smallest and largest possible aggregate.
    pub fn aggregate_range() -> (u32, u32) {
        (5 * u32::from(MIN_SCORE), 5 * u32::from(MAX_SCORE))
    }

    /// Score for a count against ascending thresholds.
    pub fn band_score(bands: &[usize], count: usize) -> u8 {
        let met = bands.iter().filter(|&&t| count >= t).count();
        // validate() caps the band count, so this stays within MAX_SCORE.
        (MIN_SCORE as usize + met).min(MAX_SCORE as usize) as u8
    }

    /// Every band the aggregate falls in, lowest first.
    ///
    /// A floor is inclusive on both sides: an aggregate equal to
    /// `moderate_floor` is both Low and Moderate.
    pub fn bands_for(&self, aggregate: u32) -> Vec<ScoreBand> {
        let mut bands = Vec::with_capacity(2);
        if aggregate <= self.moderate_floor {
            bands.push(ScoreBand::Low);
        }
        if aggregate >= self.moderate_floor && aggregate <= self.high_floor {
            bands.push(ScoreBand::Moderate);
        }
        if aggregate >= self.high_floor {
            bands.push(ScoreBand::High);
        }
        bands
    }
}
