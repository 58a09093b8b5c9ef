//! Ruleset configuration for the Glicko-2 engine

use crate::error::RatingError;
use serde::{Deserialize, Serialize};

/// Conversion factor between the external and the Glicko-2 scale. Fixed.
pub const GLICKO2_SCALE_FACTOR: f64 = 173.7178;

/// Rating difference for 10:1 expected odds on the legacy Elo scale. Fixed.
pub const RATING_INTERVAL: f64 = 400.0;

/// Rating of a new player. Fixed.
pub const DEFAULT_RATING: f64 = 1500.0;

/// Deviation of a new player. Fixed.
pub const DEFAULT_DEVIATION: f64 = 350.0;

pub const DEFAULT_VOLATILITY: f64 = 0.06;
pub const DEFAULT_SYSTEM_TAU: f64 = 0.2;
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.000_001;
pub const DEFAULT_MAX_SOLVER_ITERATIONS: usize = 1000;

/// Upper (exclusive) bound accepted for the system constant
pub const MAX_SYSTEM_TAU: f64 = 5.0;

/// Tunable options of a ruleset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesetConfig {
    /// Starting volatility of new players
    pub rating_volatility: f64,
    /// System constant constraining volatility change over time
    pub system_tau: f64,
    /// Stop criterion of the volatility solver
    pub convergence_tolerance: f64,
    /// Iteration cap of each volatility solver loop
    pub max_solver_iterations: usize,
    /// Whether slot order distinguishes otherwise identical matchups
    pub order_matters: bool,
    /// Whether identical matchups must always produce identical outcomes
    pub deterministic: bool,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            rating_volatility: DEFAULT_VOLATILITY,
            system_tau: DEFAULT_SYSTEM_TAU,
            convergence_tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            max_solver_iterations: DEFAULT_MAX_SOLVER_ITERATIONS,
            order_matters: false,
            deterministic: false,
        }
    }
}

impl RulesetConfig {
    /// Configuration for bots with fixed strategies
    pub fn deterministic() -> Self {
        Self {
            deterministic: true,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.system_tau.is_finite()
            || self.system_tau <= 0.0
            || self.system_tau >= MAX_SYSTEM_TAU
        {
            return Err(RatingError::ConfigurationError {
                message: format!(
                    "System tau must be in (0, {}), got {}",
                    MAX_SYSTEM_TAU, self.system_tau
                ),
            }
            .into());
        }

        if !(self.convergence_tolerance > 0.0
            && self.convergence_tolerance <= DEFAULT_CONVERGENCE_TOLERANCE)
        {
            return Err(RatingError::ConfigurationError {
                message: format!(
                    "Convergence tolerance must be in (0, {}], got {}",
                    DEFAULT_CONVERGENCE_TOLERANCE, self.convergence_tolerance
                ),
            }
            .into());
        }

        if !self.rating_volatility.is_finite() || self.rating_volatility <= 0.0 {
            return Err(RatingError::ConfigurationError {
                message: format!(
                    "Rating volatility must be positive, got {}",
                    self.rating_volatility
                ),
            }
            .into());
        }

        if self.max_solver_iterations == 0 {
            return Err(RatingError::ConfigurationError {
                message: "Max solver iterations must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_error(config: &RulesetConfig) -> Option<RatingError> {
        config
            .validate()
            .err()
            .and_then(|e| e.downcast_ref::<RatingError>().cloned())
    }

    #[test]
    fn test_fixed_constants() {
        assert_eq!(GLICKO2_SCALE_FACTOR, 173.7178);
        assert_eq!(RATING_INTERVAL, 400.0);
        assert_eq!(DEFAULT_RATING, 1500.0);
        assert_eq!(DEFAULT_DEVIATION, 350.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = RulesetConfig::default();
        assert_eq!(config.rating_volatility, 0.06);
        assert_eq!(config.system_tau, 0.2);
        assert_eq!(config.convergence_tolerance, 0.000_001);
        assert!(!config.deterministic);
        assert!(config.validate().is_ok());
        assert!(RulesetConfig::deterministic().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RulesetConfig::default();

        config.system_tau = 0.0;
        assert!(matches!(
            config_error(&config),
            Some(RatingError::ConfigurationError { .. })
        ));

        config.system_tau = 5.0;
        assert!(config_error(&config).is_some());

        config = RulesetConfig::default();
        config.convergence_tolerance = 0.0;
        assert!(config_error(&config).is_some());

        config.convergence_tolerance = 0.00001;
        assert!(config_error(&config).is_some());

        config.convergence_tolerance = 1e-9;
        assert!(config_error(&config).is_none());

        config = RulesetConfig::default();
        config.rating_volatility = -0.1;
        assert!(config_error(&config).is_some());

        config = RulesetConfig::default();
        config.max_solver_iterations = 0;
        assert!(config_error(&config).is_some());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: RulesetConfig =
            toml::from_str("system_tau = 0.5\ndeterministic = true").unwrap();
        assert_eq!(config.system_tau, 0.5);
        assert!(config.deterministic);
        assert_eq!(config.rating_volatility, DEFAULT_VOLATILITY);
    }
}
