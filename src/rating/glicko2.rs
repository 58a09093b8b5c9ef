//! Glicko-2 rating system implementation
//!
//! This module provides the concrete rating calculator: steps 2 to 8 of
//! Glickman's procedure, applied to every player of a rating period against
//! one immutable snapshot.

use crate::config::rating::RulesetConfig;
use crate::error::RatingError;
use crate::rating::calculator::RatingCalculator;
use crate::rating::period::{Encounter, PeriodOutcomes, RatingSnapshot};
use crate::rating::scale::{
    expected_score, g, to_external_deviation, to_external_rating, to_internal_deviation,
    to_internal_rating,
};
use crate::rating::volatility::VolatilitySolver;
use crate::types::{PlayerId, Rating, RatingChange};
use std::collections::BTreeMap;
use tracing::debug;

/// A rating triple on the Glicko-2 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glicko2State {
    pub mu: f64,
    pub phi: f64,
    pub sigma: f64,
}

impl From<Rating> for Glicko2State {
    fn from(rating: Rating) -> Self {
        Self {
            mu: to_internal_rating(rating.rating),
            phi: to_internal_deviation(rating.deviation),
            sigma: rating.volatility,
        }
    }
}

impl From<Glicko2State> for Rating {
    fn from(state: Glicko2State) -> Self {
        Self {
            rating: to_external_rating(state.mu),
            deviation: to_external_deviation(state.phi),
            volatility: state.sigma,
        }
    }
}

/// One encounter resolved against the snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentResult {
    pub mu: f64,
    pub g_phi: f64,
    pub score: f64,
}

/// Glicko-2 rating calculator
#[derive(Debug, Clone)]
pub struct Glicko2Calculator {
    config: RulesetConfig,
    solver: VolatilitySolver,
}

impl Glicko2Calculator {
    /// Create a new Glicko-2 calculator
    pub fn new(config: RulesetConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self {
            solver: VolatilitySolver::from_config(&config),
            config,
        })
    }

    pub fn solver(&self) -> &VolatilitySolver {
        &self.solver
    }

    /// Expected score of `player` against `opponent`, damped by the
    /// opponent's deviation
    pub fn expected_score(&self, player: &Rating, opponent: &Rating) -> f64 {
        let player = Glicko2State::from(*player);
        let opponent = Glicko2State::from(*opponent);
        expected_score(player.mu, opponent.mu, g(opponent.phi))
    }

    /// New state of one player after one rating period.
    ///
    /// Returns the solver iteration count, or `None` for an idle player whose
    /// deviation only decays.
    pub fn rate_player(
        &self,
        player_id: PlayerId,
        state: Glicko2State,
        results: &[OpponentResult],
    ) -> crate::error::Result<(Glicko2State, Option<usize>)> {
        if results.is_empty() {
            let phi = (state.phi.powi(2) + state.sigma.powi(2)).sqrt();
            return Ok((Glicko2State { phi, ..state }, None));
        }

        let mut variance_sum = 0.0;
        let mut improvement_sum = 0.0;
        for result in results {
            let expected = expected_score(state.mu, result.mu, result.g_phi);
            variance_sum += result.g_phi.powi(2) * expected * (1.0 - expected);
            improvement_sum += result.g_phi * (result.score - expected);
        }

        let v = 1.0 / variance_sum;
        if !v.is_finite() {
            return Err(RatingError::InternalConvergence {
                player_id,
                iterations: 0,
                reason: format!("estimated variance is not finite (Σ = {})", variance_sum),
            }
            .into());
        }
        let delta = v * improvement_sum;

        let solution = self
            .solver
            .solve(state.phi, state.sigma, v, delta)
            .map_err(|e| RatingError::InternalConvergence {
                player_id,
                iterations: e.iterations,
                reason: e.reason,
            })?;

        let pre_period_phi = (state.phi.powi(2) + solution.volatility.powi(2)).sqrt();
        let phi = 1.0 / (1.0 / pre_period_phi.powi(2) + 1.0 / v).sqrt();
        let mu = state.mu + phi.powi(2) * improvement_sum;

        Ok((
            Glicko2State {
                mu,
                phi,
                sigma: solution.volatility,
            },
            Some(solution.iterations),
        ))
    }

    fn resolve(
        player_id: PlayerId,
        encounters: &[Encounter],
        internal: &BTreeMap<PlayerId, (Glicko2State, f64)>,
    ) -> crate::error::Result<Vec<OpponentResult>> {
        encounters
            .iter()
            .map(|encounter| -> crate::error::Result<OpponentResult> {
                let (opponent, g_phi) = internal.get(&encounter.opponent).ok_or(
                    RatingError::PlayerNotFound {
                        player_id: encounter.opponent,
                    },
                )?;
                debug_assert_ne!(encounter.opponent, player_id);
                Ok(OpponentResult {
                    mu: opponent.mu,
                    g_phi: *g_phi,
                    score: encounter.score,
                })
            })
            .collect()
    }
}

impl RatingCalculator for Glicko2Calculator {
    fn rate_period(
        &self,
        snapshot: &RatingSnapshot,
        outcomes: &PeriodOutcomes,
    ) -> crate::error::Result<Vec<RatingChange>> {
        let internal: BTreeMap<PlayerId, (Glicko2State, f64)> = snapshot
            .iter()
            .map(|(&id, &rating)| {
                let state = Glicko2State::from(rating);
                (id, (state, g(state.phi)))
            })
            .collect();

        let mut changes = Vec::with_capacity(snapshot.len());
        for (&player_id, &old_rating) in snapshot {
            let encounters = outcomes.encounters(player_id);
            let results = Self::resolve(player_id, encounters, &internal)?;
            let (state, _) = internal[&player_id];
            let (new_state, solver_iterations) = self.rate_player(player_id, state, &results)?;
            let new_rating = Rating::from(new_state);

            debug!(
                "Player {}: {:.2}±{:.2} -> {:.2}±{:.2} over {} encounters",
                player_id,
                old_rating.rating,
                old_rating.deviation,
                new_rating.rating,
                new_rating.deviation,
                encounters.len()
            );

            changes.push(RatingChange {
                player_id,
                old_rating,
                new_rating,
                encounters: encounters.len(),
                solver_iterations,
            });
        }

        Ok(changes)
    }

    fn initial_rating(&self) -> Rating {
        Rating::with_volatility(self.config.rating_volatility)
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}
