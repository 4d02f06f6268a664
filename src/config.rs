//! Configuration for fitting and parameter generation.
//!
//! Every struct here is `serde`-deserializable so callers can keep settings in
//! a JSON file next to their network definition.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Fallback policy
// ============================================================================

/// What a discrete table does with a parent assignment that has no data.
///
/// Applies at fit time (bucket with zero training rows) and at sampling time
/// (bucket absent from a sparse, manually attached table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Assign equal probability to every level.
    UniformFallback,
    /// Fail with `InsufficientData` (fit) or `UnseenCombination` (sample).
    #[default]
    Strict,
}

// ============================================================================
// Fitting
// ============================================================================

/// Settings for [`fit`](crate::fitter::fit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub policy: FallbackPolicy,
    /// Additive smoothing applied to every observed bucket's counts.
    pub pseudo_count: f64,
    /// Replace every discrete node's levels with the sorted distinct labels
    /// of its column before fitting.
    pub infer_levels: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::Strict,
            pseudo_count: 0.0,
            infer_levels: false,
        }
    }
}

impl FitConfig {
    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pseudo_count(mut self, pseudo_count: f64) -> Self {
        self.pseudo_count = pseudo_count;
        self
    }

    pub fn with_infer_levels(mut self, infer_levels: bool) -> Self {
        self.infer_levels = infer_levels;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pseudo_count.is_finite() || self.pseudo_count < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "pseudo_count must be finite and non-negative, got {}",
                self.pseudo_count
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Parameter generation
// ============================================================================

/// Dirichlet settings for random CPTs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteParameters {
    pub alpha: f64,
    /// Spread `alpha` across the levels (`alpha / levels` each) instead of
    /// using it per level.
    pub normalise_alpha: bool,
}

impl Default for DiscreteParameters {
    fn default() -> Self {
        Self { alpha: 20.0, normalise_alpha: true }
    }
}

/// Range of level counts for [`random_levels`](crate::parameters::random_levels).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelParameters {
    pub min_levels: usize,
    /// Inclusive upper bound.
    pub max_levels: usize,
}

impl Default for LevelParameters {
    fn default() -> Self {
        Self { min_levels: 2, max_levels: 3 }
    }
}

impl LevelParameters {
    pub fn validate(&self) -> Result<()> {
        if self.min_levels < 2 || self.max_levels < self.min_levels {
            return Err(Error::InvalidParameters(format!(
                "level range needs 2 <= min_levels <= max_levels, got {}..={}",
                self.min_levels, self.max_levels
            )));
        }
        Ok(())
    }
}

/// Settings for random linear-Gaussian parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianParameters {
    /// Candidate coefficients; each parent's weight is drawn uniformly.
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub noise_std: f64,
}

impl Default for GaussianParameters {
    fn default() -> Self {
        Self {
            weights: vec![-2.0, -0.5, 0.5, 2.0],
            intercept: 0.0,
            noise_std: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.policy, FallbackPolicy::Strict);
        assert_eq!(cfg.pseudo_count, 0.0);
        assert!(!cfg.infer_levels);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_level_range() {
        assert!(LevelParameters::default().validate().is_ok());
        assert!(LevelParameters { min_levels: 4, max_levels: 4 }.validate().is_ok());
        assert!(LevelParameters { min_levels: 1, max_levels: 3 }.validate().is_err());
        assert!(LevelParameters { min_levels: 3, max_levels: 2 }.validate().is_err());
        let lp: LevelParameters = serde_json::from_str(r#"{"max_levels":5}"#).unwrap();
        assert_eq!(lp, LevelParameters { min_levels: 2, max_levels: 5 });
    }

    #[test]
    fn test_negative_pseudo_count_rejected() {
        assert!(FitConfig::default().with_pseudo_count(-1.0).validate().is_err());
        assert!(FitConfig::default().with_pseudo_count(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let cfg: FitConfig = serde_json::from_str(r#"{"policy":"uniform_fallback"}"#).unwrap();
        assert_eq!(cfg.policy, FallbackPolicy::UniformFallback);
        assert_eq!(cfg.pseudo_count, 0.0);

        let gp: GaussianParameters = serde_json::from_str(r#"{"noise_std":0.5}"#).unwrap();
        assert_eq!(gp.weights.len(), 4);
        assert_eq!(gp.noise_std, 0.5);
    }
}
