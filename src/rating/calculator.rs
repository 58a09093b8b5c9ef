//! Rating calculator trait
//!
//! This module defines the interface the ruleset uses to turn one rating
//! period into rating changes.

use crate::rating::period::{PeriodOutcomes, RatingSnapshot};
use crate::types::{Rating, RatingChange};

/// Trait for calculating rating changes at the close of a rating period
#[cfg_attr(test, mockall::automock)]
pub trait RatingCalculator: Send + Sync {
    /// Calculate the new rating of every player in `snapshot`
    ///
    /// # Arguments
    /// * `snapshot` - Pre-period rating of every participant; never modified
    /// * `outcomes` - Pairwise encounters of the period
    ///
    /// # Returns
    /// One change per snapshot entry, or the first error encountered. Nothing
    /// is applied by the calculator itself.
    fn rate_period(
        &self,
        snapshot: &RatingSnapshot,
        outcomes: &PeriodOutcomes,
    ) -> crate::error::Result<Vec<RatingChange>>;

    /// Get the initial rating for new players
    fn initial_rating(&self) -> Rating;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}
