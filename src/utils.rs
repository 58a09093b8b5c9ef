//! Utility functions for the rating engine

use crate::types::Rating;
use chrono::{DateTime, Utc};

/// Two-sided 95% quantile of the standard normal distribution
const CONFIDENCE_95: f64 = 1.96;

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// 95% confidence interval of a rating on the external scale
pub fn confidence_interval(rating: &Rating) -> (f64, f64) {
    let margin = CONFIDENCE_95 * rating.deviation;
    (rating.rating - margin, rating.rating + margin)
}
