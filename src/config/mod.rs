//! Configuration management for the rating engine
//!
//! This module holds the fixed Glicko-2 constants, the tunable ruleset options
//! and the configuration of the command line tool.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use rating::RulesetConfig;
