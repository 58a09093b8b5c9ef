//! Glicko-2 rating engine
//!
//! This module provides the scale conversions, the volatility solver, the
//! per-player update and the rating period batching, plus the reduction of
//! multi-player game results into pairwise comparisons.

pub mod calculator;
pub mod glicko2;
pub mod outcome;
pub mod period;
pub mod scale;
pub mod volatility;

// Re-export commonly used types
pub use calculator::RatingCalculator;
pub use glicko2::{Glicko2Calculator, Glicko2State};
pub use outcome::{aggregate_scores, pairwise_outcomes, race_outcomes, PairwiseOutcome};
pub use period::{update_ratings_for_period, Encounter, PeriodOutcomes, RatingSnapshot};
pub use volatility::{VolatilitySolution, VolatilitySolver};
