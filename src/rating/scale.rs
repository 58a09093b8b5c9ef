//! Conversions between the external rating scale and the Glicko-2 scale
//!
//! Externally ratings are centered at 1500 with deviations in rating points;
//! internally the Glicko-2 procedure works on μ centered at 0 and φ in
//! units of `GLICKO2_SCALE_FACTOR` points.

use crate::config::rating::{DEFAULT_RATING, GLICKO2_SCALE_FACTOR, RATING_INTERVAL};
use std::f64::consts::PI;

pub fn to_internal_rating(rating: f64) -> f64 {
    (rating - DEFAULT_RATING) / GLICKO2_SCALE_FACTOR
}

pub fn to_external_rating(mu: f64) -> f64 {
    GLICKO2_SCALE_FACTOR * mu + DEFAULT_RATING
}

pub fn to_internal_deviation(deviation: f64) -> f64 {
    deviation / GLICKO2_SCALE_FACTOR
}

pub fn to_external_deviation(phi: f64) -> f64 {
    GLICKO2_SCALE_FACTOR * phi
}

/// Damping factor of an opponent's deviation. Decreasing in `phi`.
pub fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * (phi / PI).powi(2)).sqrt()
}

/// Expected score of a player at `mu` against an opponent at `mu_j`
/// whose damping factor `g_phi_j` is already computed.
pub fn expected_score(mu: f64, mu_j: f64, g_phi_j: f64) -> f64 {
    1.0 / (1.0 + (-g_phi_j * (mu - mu_j)).exp())
}

/// Legacy Elo-style expectation on the external scale
pub fn elo_expected_score(rating: f64, opponent_rating: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / RATING_INTERVAL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_default_rating_is_origin() {
        assert_eq!(to_internal_rating(1500.0), 0.0);
        assert_eq!(to_external_rating(0.0), 1500.0);
        assert_abs_diff_eq!(to_internal_deviation(350.0), 2.0147, epsilon = 1e-4);
    }

    #[test]
    fn test_paper_values() {
        // Opponents of the worked example in Glickman's Glicko-2 paper
        assert_abs_diff_eq!(to_internal_rating(1400.0), -0.5756, epsilon = 1e-4);
        assert_abs_diff_eq!(g(to_internal_deviation(30.0)), 0.9955, epsilon = 1e-4);
        assert_abs_diff_eq!(g(to_internal_deviation(100.0)), 0.9531, epsilon = 1e-4);
        assert_abs_diff_eq!(g(to_internal_deviation(300.0)), 0.7242, epsilon = 1e-4);

        let e = expected_score(
            to_internal_rating(1500.0),
            to_internal_rating(1400.0),
            g(to_internal_deviation(30.0)),
        );
        assert_abs_diff_eq!(e, 0.639, epsilon = 1e-3);
    }

    #[test]
    fn test_g_is_decreasing() {
        assert_eq!(g(0.0), 1.0);
        let mut last = g(0.0);
        for step in 1..=40 {
            let current = g(step as f64 * 0.05);
            assert!(current < last);
            last = current;
        }
    }

    #[test]
    fn test_expected_score_symmetry() {
        let g_phi = g(0.8);
        let a = expected_score(0.4, -0.3, g_phi);
        let b = expected_score(-0.3, 0.4, g_phi);
        assert_abs_diff_eq!(a + b, 1.0, epsilon = 1e-12);
        assert_eq!(expected_score(1.2, 1.2, g_phi), 0.5);
    }

    #[test]
    fn test_expected_score_is_stable_at_range_edges() {
        for &(mu, mu_j) in &[(-5.0, 5.0), (5.0, -5.0), (0.0, 5.0)] {
            for &phi in &[0.0, 1.0, 2.0] {
                let e = expected_score(mu, mu_j, g(phi));
                assert!(e.is_finite());
                assert!(e > 0.0 && e < 1.0);
            }
        }
    }

    #[test]
    fn test_elo_expected_score() {
        assert_eq!(elo_expected_score(1500.0, 1500.0), 0.5);
        assert_abs_diff_eq!(elo_expected_score(1900.0, 1500.0), 10.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            elo_expected_score(1623.0, 1480.0) + elo_expected_score(1480.0, 1623.0),
            1.0,
            epsilon = 1e-12
        );
    }

    proptest! {
        #[test]
        fn rating_round_trip(rating in 0.0f64..4000.0) {
            let back = to_external_rating(to_internal_rating(rating));
            prop_assert!((back - rating).abs() <= 1e-9);
        }

        #[test]
        fn deviation_round_trip(deviation in 0.0f64..4000.0) {
            let back = to_external_deviation(to_internal_deviation(deviation));
            prop_assert!((back - deviation).abs() <= 1e-9);
        }
    }
}
