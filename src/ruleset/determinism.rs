//! Outcome consistency for deterministic rulesets
//!
//! When every participant plays a fixed strategy, replaying a matchup must
//! reproduce its outcome. A disagreeing replay means the caller's data is
//! corrupt and is rejected before it reaches a rating period.

use crate::error::RatingError;
use crate::game::Game;
use crate::types::{GameId, GameOutcome, PlayerId};
use std::collections::HashMap;

/// Largest score difference still considered the same outcome
const SCORE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default)]
pub struct DeterminismGuard {
    order_matters: bool,
    seen: HashMap<Vec<PlayerId>, (GameId, GameOutcome)>,
}

impl DeterminismGuard {
    pub fn new(order_matters: bool) -> Self {
        Self {
            order_matters,
            seen: HashMap::new(),
        }
    }

    /// Check a finished game against earlier games of the same matchup
    pub fn check(&self, game: &Game) -> crate::error::Result<()> {
        let Some(outcome) = game.outcome() else {
            return Ok(());
        };
        let key = game.matchup_key(self.order_matters);

        if let Some((previous_game_id, previous)) = self.seen.get(&key) {
            if !outcomes_agree(previous, outcome) {
                return Err(RatingError::NonDeterministicResult {
                    game_id: game.id,
                    previous_game_id: *previous_game_id,
                    players: key,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Remember the outcome of a checked game
    pub fn record(&mut self, game: &Game) {
        if let Some(outcome) = game.outcome() {
            self.seen
                .entry(game.matchup_key(self.order_matters))
                .or_insert_with(|| (game.id, outcome.clone()));
        }
    }

    pub fn matchups(&self) -> usize {
        self.seen.len()
    }
}

fn outcomes_agree(a: &GameOutcome, b: &GameOutcome) -> bool {
    match (a, b) {
        (GameOutcome::Scores(a), GameOutcome::Scores(b)) => {
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|((id_a, score_a), (id_b, score_b))| {
                    id_a == id_b && (score_a - score_b).abs() <= SCORE_EPSILON
                })
        }
        (GameOutcome::Ranked(a), GameOutcome::Ranked(b)) => normalized(a) == normalized(b),
        _ => false,
    }
}

/// Order within a rank carries no meaning
fn normalized(ranks: &[Vec<PlayerId>]) -> Vec<Vec<PlayerId>> {
    ranks
        .iter()
        .map(|rank| {
            let mut rank = rank.clone();
            rank.sort_unstable();
            rank
        })
        .collect()
}
