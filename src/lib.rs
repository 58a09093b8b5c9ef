//! Bot Rating - Glicko-2 skill ratings for bots and humans
//!
//! This crate rates competitors from the outcomes of multi-player games in
//! batched rating periods, with versioned bot identities and optional
//! determinism checks for fixed-strategy bots.

pub mod bot;
pub mod config;
pub mod error;
pub mod game;
pub mod metrics;
pub mod rating;
pub mod ruleset;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use config::RulesetConfig;
pub use game::Game;
pub use rating::{Glicko2Calculator, RatingCalculator};
pub use ruleset::{PeriodSummary, Ruleset};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
