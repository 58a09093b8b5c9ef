//! Rating period batching
//!
//! A rating period is the set of games finished since the last update. All
//! of them are applied in one pass computed from a single pre-period
//! snapshot, and the new ratings are written back only once every player has
//! been rated.

use crate::error::RatingError;
use crate::game::Game;
use crate::rating::calculator::RatingCalculator;
use crate::rating::outcome::{outcome_pairs, PairwiseOutcome};
use crate::types::{GameId, Player, PlayerId, Rating, RatingChange};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Pre-period rating of every player taking part in an update
pub type RatingSnapshot = BTreeMap<PlayerId, Rating>;

/// One comparison from a player's point of view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encounter {
    pub opponent: PlayerId,
    pub score: f64,
}

/// Encounters of every player over one rating period
#[derive(Debug, Clone, Default)]
pub struct PeriodOutcomes {
    encounters: BTreeMap<PlayerId, Vec<Encounter>>,
    games: BTreeSet<GameId>,
}

impl PeriodOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the outcomes of finished games
    pub fn from_games<'a>(
        games: impl IntoIterator<Item = &'a Game>,
    ) -> crate::error::Result<Self> {
        let mut outcomes = Self::new();
        for game in games {
            outcomes.add_game(game)?;
        }
        Ok(outcomes)
    }

    /// Record both sides of a pairwise comparison
    pub fn add_pair(&mut self, outcome: PairwiseOutcome) {
        self.games.insert(outcome.game_id);
        for side in [outcome, outcome.reversed()] {
            self.encounters
                .entry(side.player)
                .or_default()
                .push(Encounter {
                    opponent: side.opponent,
                    score: side.score,
                });
        }
    }

    /// Record every pairwise comparison of a finished game
    pub fn add_game(&mut self, game: &Game) -> crate::error::Result<()> {
        let outcome = game.outcome().ok_or_else(|| RatingError::InvalidStateTransition {
            game_id: game.id,
            transition: format!("cannot rate a game in state {}", game.status()),
        })?;

        let pairs = outcome_pairs(game.id, outcome)?;
        self.games.insert(game.id);
        for pair in pairs {
            self.add_pair(pair);
        }
        Ok(())
    }

    pub fn encounters(&self, player_id: PlayerId) -> &[Encounter] {
        self.encounters
            .get(&player_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Players with at least one encounter
    pub fn participants(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.encounters.keys().copied()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }
}

/// Rate every player over the given finished games and commit the new ratings.
///
/// Players without games in the batch get the idle deviation decay. On error
/// no player is modified.
pub fn update_ratings_for_period<'p, 'g>(
    calculator: &dyn RatingCalculator,
    players: impl IntoIterator<Item = &'p mut Player>,
    games: impl IntoIterator<Item = &'g Game>,
) -> crate::error::Result<Vec<RatingChange>> {
    let mut players: Vec<&mut Player> = players.into_iter().collect();
    let outcomes = PeriodOutcomes::from_games(games)?;

    let snapshot: RatingSnapshot = players.iter().map(|p| (p.id, p.rating)).collect();
    if let Some(missing) = outcomes.participants().find(|id| !snapshot.contains_key(id)) {
        return Err(RatingError::PlayerNotFound { player_id: missing }.into());
    }

    debug!(
        "Rating period: {} games, {} players, {} with encounters",
        outcomes.game_count(),
        snapshot.len(),
        outcomes.participants().count()
    );

    let changes = calculator.rate_period(&snapshot, &outcomes)?;

    let index: HashMap<PlayerId, usize> = players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();
    for change in &changes {
        if !index.contains_key(&change.player_id) {
            return Err(RatingError::PlayerNotFound {
                player_id: change.player_id,
            }
            .into());
        }
    }

    for change in &changes {
        players[index[&change.player_id]].rating = change.new_rating;
    }

    info!(
        "Committed rating period: {} games, {} rating changes",
        outcomes.game_count(),
        changes.len()
    );

    Ok(changes)
}
