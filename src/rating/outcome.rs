//! Reduction of finished games to pairwise comparisons
//!
//! Glicko-2 rates head-to-head results. A game with more than two players is
//! decomposed into one independent comparison per unordered pair, weighted by
//! the pair's relative score. Ranked races are decomposed into wins and draws
//! instead; which of the two applies is chosen when the game is finished.

use crate::error::RatingError;
use crate::types::{GameId, GameOutcome, GameResult, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of one pair within one game, from `player`'s point of view.
/// The opponent's view is the complement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseOutcome {
    pub game_id: GameId,
    pub player: PlayerId,
    pub opponent: PlayerId,
    pub score: f64,
}

impl PairwiseOutcome {
    /// The same comparison seen by the opponent
    pub fn reversed(&self) -> Self {
        Self {
            game_id: self.game_id,
            player: self.opponent,
            opponent: self.player,
            score: 1.0 - self.score,
        }
    }
}

/// Turn one score per slot into the mean score of each distinct player.
pub fn aggregate_scores(
    game_id: GameId,
    slots: &[PlayerId],
    scores: &[f64],
) -> crate::error::Result<GameResult> {
    if slots.len() != scores.len() {
        return Err(RatingError::InvalidResult {
            game_id,
            reason: format!("expected {} scores, got {}", slots.len(), scores.len()),
        }
        .into());
    }

    let mut totals: BTreeMap<PlayerId, (f64, usize)> = BTreeMap::new();
    for (&player_id, &score) in slots.iter().zip(scores) {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(RatingError::InvalidResult {
                game_id,
                reason: format!("score {} for player {} is outside [0, 1]", score, player_id),
            }
            .into());
        }
        let entry = totals.entry(player_id).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    Ok(totals
        .into_iter()
        .map(|(player_id, (total, count))| (player_id, total / count as f64))
        .collect())
}

/// Relative score of every unordered pair of a scored game
pub fn pairwise_outcomes(
    game_id: GameId,
    result: &GameResult,
) -> crate::error::Result<Vec<PairwiseOutcome>> {
    let entries: Vec<(PlayerId, f64)> = result.iter().map(|(&id, &score)| (id, score)).collect();
    let mut outcomes = Vec::with_capacity(entries.len() * entries.len().saturating_sub(1) / 2);

    for (i, &(player_a, score_a)) in entries.iter().enumerate() {
        for &(player_b, score_b) in &entries[i + 1..] {
            let total = score_a + score_b;
            if total <= 0.0 {
                return Err(RatingError::DegenerateOutcome {
                    game_id,
                    player_a,
                    player_b,
                }
                .into());
            }
            outcomes.push(PairwiseOutcome {
                game_id,
                player: player_a,
                opponent: player_b,
                score: score_a / total,
            });
        }
    }

    Ok(outcomes)
}

/// Wins and draws of a race given as ranks, best first.
///
/// Every player beats everyone ranked below and draws with everyone sharing
/// the same rank.
pub fn race_outcomes(
    game_id: GameId,
    ranks: &[Vec<PlayerId>],
) -> crate::error::Result<Vec<PairwiseOutcome>> {
    let mut seen = BTreeSet::new();
    for &player_id in ranks.iter().flatten() {
        if !seen.insert(player_id) {
            return Err(RatingError::InvalidResult {
                game_id,
                reason: format!("player {} is ranked more than once", player_id),
            }
            .into());
        }
    }

    let mut outcomes = Vec::new();
    for (rank_index, rank) in ranks.iter().enumerate() {
        for (i, &player) in rank.iter().enumerate() {
            for &opponent in &rank[i + 1..] {
                outcomes.push(PairwiseOutcome {
                    game_id,
                    player,
                    opponent,
                    score: 0.5,
                });
            }
            for &opponent in ranks[rank_index + 1..].iter().flatten() {
                outcomes.push(PairwiseOutcome {
                    game_id,
                    player,
                    opponent,
                    score: 1.0,
                });
            }
        }
    }

    Ok(outcomes)
}

/// Pairwise comparisons of any finished game outcome
pub fn outcome_pairs(
    game_id: GameId,
    outcome: &GameOutcome,
) -> crate::error::Result<Vec<PairwiseOutcome>> {
    match outcome {
        GameOutcome::Scores(result) => pairwise_outcomes(game_id, result),
        GameOutcome::Ranked(ranks) => race_outcomes(game_id, ranks),
    }
}
