//! Application configuration
//!
//! This module defines the configuration of the `bot-rating` binary, including
//! environment variable and TOML file loading and validation.

use crate::config::rating::RulesetConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub ruleset: RulesetConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "bot-rating".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Ruleset settings
        if let Ok(volatility) = env::var("RATING_VOLATILITY") {
            self.ruleset.rating_volatility = parse_var("RATING_VOLATILITY", &volatility)?;
        }
        if let Ok(tau) = env::var("SYSTEM_TAU") {
            self.ruleset.system_tau = parse_var("SYSTEM_TAU", &tau)?;
        }
        if let Ok(tolerance) = env::var("CONVERGENCE_TOLERANCE") {
            self.ruleset.convergence_tolerance = parse_var("CONVERGENCE_TOLERANCE", &tolerance)?;
        }
        if let Ok(iterations) = env::var("MAX_SOLVER_ITERATIONS") {
            self.ruleset.max_solver_iterations = parse_var("MAX_SOLVER_ITERATIONS", &iterations)?;
        }
        if let Ok(order_matters) = env::var("ORDER_MATTERS") {
            self.ruleset.order_matters = parse_var("ORDER_MATTERS", &order_matters)?;
        }
        if let Ok(deterministic) = env::var("DETERMINISTIC") {
            self.ruleset.deterministic = parse_var("DETERMINISTIC", &deterministic)?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.ruleset.validate()
}
