//! Game lifecycle
//!
//! A game is created with its slot list, started once and finished once with
//! an outcome. Finished games are immutable and feed the rating period.

use crate::error::RatingError;
use crate::rating::outcome::{aggregate_scores, pairwise_outcomes};
use crate::types::{GameId, GameOutcome, GameStatus, PlayerId};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Participants by slot; a player may hold several slots
    pub players: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    outcome: Option<GameOutcome>,
}

impl Game {
    /// Create a game that has not started yet
    pub fn new(id: GameId, players: Vec<PlayerId>) -> crate::error::Result<Self> {
        let distinct: BTreeSet<PlayerId> = players.iter().copied().collect();
        if players.len() < 2 || distinct.len() < 2 {
            return Err(RatingError::InvalidGame {
                reason: format!(
                    "a game needs at least two distinct players, got {:?}",
                    players
                ),
            }
            .into());
        }

        Ok(Self {
            id,
            players,
            created_at: current_timestamp(),
            started_at: None,
            finished_at: None,
            outcome: None,
        })
    }

    pub fn status(&self) -> GameStatus {
        match (self.started_at, self.finished_at) {
            (_, Some(_)) => GameStatus::Finished,
            (Some(_), None) => GameStatus::InProgress,
            (None, None) => GameStatus::Created,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    /// Distinct participants in ascending id order
    pub fn distinct_players(&self) -> Vec<PlayerId> {
        let distinct: BTreeSet<PlayerId> = self.players.iter().copied().collect();
        distinct.into_iter().collect()
    }

    /// Key under which identical matchups are compared
    pub fn matchup_key(&self, order_matters: bool) -> Vec<PlayerId> {
        if order_matters {
            self.players.clone()
        } else {
            let mut key = self.players.clone();
            key.sort_unstable();
            key
        }
    }

    pub fn start(&mut self) -> crate::error::Result<DateTime<Utc>> {
        if self.started_at.is_some() {
            return Err(self.transition_error("game already started"));
        }

        let now = current_timestamp();
        self.started_at = Some(now);
        debug!("Game {} started", self.id);
        Ok(now)
    }

    /// Finish with one relative score per slot.
    ///
    /// Rejects results where two players both scored zero, since their
    /// relative score is undefined; the game then stays in progress.
    pub fn finish(&mut self, scores: &[f64]) -> crate::error::Result<DateTime<Utc>> {
        self.ensure_in_progress()?;
        let result = aggregate_scores(self.id, &self.players, scores)?;
        pairwise_outcomes(self.id, &result)?;
        Ok(self.complete(GameOutcome::Scores(result)))
    }

    /// Finish with a finishing order, best first, ties sharing a rank
    pub fn finish_ranked(
        &mut self,
        ranks: Vec<Vec<PlayerId>>,
    ) -> crate::error::Result<DateTime<Utc>> {
        self.ensure_in_progress()?;

        let ranked: Vec<PlayerId> = ranks.iter().flatten().copied().collect();
        let ranked_set: BTreeSet<PlayerId> = ranked.iter().copied().collect();
        let expected: BTreeSet<PlayerId> = self.players.iter().copied().collect();
        if ranked.len() != ranked_set.len()
            || ranked_set != expected
            || ranks.iter().any(Vec::is_empty)
        {
            return Err(RatingError::InvalidResult {
                game_id: self.id,
                reason: format!(
                    "ranks {:?} must list each of {:?} exactly once",
                    ranks, expected
                ),
            }
            .into());
        }

        Ok(self.complete(GameOutcome::Ranked(ranks)))
    }

    fn ensure_in_progress(&self) -> crate::error::Result<()> {
        match self.status() {
            GameStatus::InProgress => Ok(()),
            GameStatus::Finished => Err(self.transition_error("game already finished")),
            GameStatus::Created => Err(self.transition_error("game has not started")),
        }
    }

    fn complete(&mut self, outcome: GameOutcome) -> DateTime<Utc> {
        let now = current_timestamp();
        self.outcome = Some(outcome);
        self.finished_at = Some(now);
        debug!("Game {} finished", self.id);
        now
    }

    fn transition_error(&self, transition: &str) -> anyhow::Error {
        RatingError::InvalidStateTransition {
            game_id: self.id,
            transition: transition.to_string(),
        }
        .into()
    }
}
