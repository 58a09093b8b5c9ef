//! Rating pools
//!
//! A ruleset owns the configuration, players, games and bots of one rating
//! pool and closes its rating periods.

pub mod determinism;
pub mod manager;

// Re-export commonly used types
pub use determinism::DeterminismGuard;
pub use manager::{PeriodSummary, Ruleset, RulesetStats};
