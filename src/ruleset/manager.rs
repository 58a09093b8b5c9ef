//! Ruleset implementation owning every player, game and bot of one rating pool
//!
//! This module provides the `Ruleset`, the explicit context through which
//! players and bot versions are registered, games are played, and rating
//! periods are closed. It holds no global state; separate rulesets are fully
//! independent.

use crate::bot::Bot;
use crate::config::RulesetConfig;
use crate::error::{RatingError, Result};
use crate::game::Game;
use crate::metrics::MetricsCollector;
use crate::rating::calculator::RatingCalculator;
use crate::rating::glicko2::Glicko2Calculator;
use crate::rating::period::update_ratings_for_period;
use crate::ruleset::determinism::DeterminismGuard;
use crate::types::{
    BotIdentity, BotVersion, GameId, LineageId, Player, PlayerId, Rating, RatingChange,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of closing one rating period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Sequence number of the closed period, starting at 1
    pub period: u64,
    /// Games rated in this period
    pub games: Vec<GameId>,
    /// One change per rated player
    pub changes: Vec<RatingChange>,
}

/// Statistics about ruleset contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetStats {
    /// Total player records, superseded bot versions included
    pub players: usize,
    /// Players still eligible for new games
    pub active_players: usize,
    /// Registered bot lineages
    pub bots: usize,
    /// Games in any state
    pub games: usize,
    /// Finished games waiting for the next period close
    pub pending_games: usize,
    /// Rating periods closed so far
    pub periods_closed: u64,
}

/// A self-contained rating pool
pub struct Ruleset {
    config: RulesetConfig,
    calculator: Arc<dyn RatingCalculator>,
    players: BTreeMap<PlayerId, Player>,
    games: BTreeMap<GameId, Game>,
    bots: HashMap<LineageId, Bot>,
    /// Finished games of the open period, in finishing order
    pending: Vec<GameId>,
    /// Present only when the ruleset is deterministic
    determinism: Option<DeterminismGuard>,
    next_player_id: PlayerId,
    next_game_id: GameId,
    periods_closed: u64,
    metrics: Arc<MetricsCollector>,
}

impl Ruleset {
    /// Create a ruleset rated with Glicko-2
    pub fn new(config: RulesetConfig) -> Result<Self> {
        let calculator = Arc::new(Glicko2Calculator::new(config.clone())?);
        let metrics = Arc::new(MetricsCollector::new()?);
        Self::with_calculator(config, calculator, metrics)
    }

    /// Create a ruleset with a custom calculator and metrics collector
    pub fn with_calculator(
        config: RulesetConfig,
        calculator: Arc<dyn RatingCalculator>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        config.validate()?;

        let determinism = config
            .deterministic
            .then(|| DeterminismGuard::new(config.order_matters));

        info!(
            "Created ruleset (tau {}, deterministic {}, order matters {})",
            config.system_tau, config.deterministic, config.order_matters
        );

        Ok(Self {
            config,
            calculator,
            players: BTreeMap::new(),
            games: BTreeMap::new(),
            bots: HashMap::new(),
            pending: Vec::new(),
            determinism,
            next_player_id: 1,
            next_game_id: 1,
            periods_closed: 0,
            metrics,
        })
    }

    /// Register a player with the ruleset's initial rating
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let rating = self.calculator.initial_rating();
        self.insert_player(name.into(), rating, None)
    }

    /// Register a player carrying over an existing rating
    pub fn add_player_with_rating(
        &mut self,
        name: impl Into<String>,
        rating: Rating,
    ) -> Result<PlayerId> {
        let result = validate_rating(&rating);
        self.track(result)?;
        Ok(self.insert_player(name.into(), rating, None))
    }

    /// Register a new bot lineage with its first version
    pub fn add_bot(&mut self, name: impl Into<String>, version: BotVersion) -> LineageId {
        let name = name.into();
        let lineage = Uuid::new_v4();
        let identity = BotIdentity {
            lineage,
            version,
            predecessor: None,
        };
        let rating = self.calculator.initial_rating();
        let player_id = self.insert_player(release_name(&name, version), rating, Some(identity));

        info!("Registered bot {} ({}) as player {}", name, version, player_id);
        self.bots
            .insert(lineage, Bot::new(lineage, name, version, player_id));
        lineage
    }

    /// Release a new version of a bot.
    ///
    /// The new version is a fresh player starting from the initial rating; the
    /// previous version keeps its rating and stops taking part in new games.
    pub fn release_bot_version(
        &mut self,
        lineage: LineageId,
        version: BotVersion,
    ) -> Result<PlayerId> {
        let result = self.release(lineage, version);
        self.track(result)
    }

    fn release(&mut self, lineage: LineageId, version: BotVersion) -> Result<PlayerId> {
        let bot = self
            .bots
            .get(&lineage)
            .ok_or(RatingError::BotNotFound { lineage })?;
        bot.validate_next(version)?;

        let predecessor = bot.current().player_id;
        let name = release_name(&bot.name, version);
        let identity = BotIdentity {
            lineage,
            version,
            predecessor: Some(predecessor),
        };
        let rating = self.calculator.initial_rating();
        let player_id = self.insert_player(name, rating, Some(identity));

        if let Some(previous) = self.players.get_mut(&predecessor) {
            previous.superseded_by = Some(player_id);
        }
        if let Some(bot) = self.bots.get_mut(&lineage) {
            bot.push_release(version, player_id)?;
        }

        info!(
            "Released version {} of bot {}: player {} supersedes {}",
            version, lineage, player_id, predecessor
        );
        Ok(player_id)
    }

    /// Create a game for the given slots, optionally starting it right away
    pub fn create_game(
        &mut self,
        players: Vec<PlayerId>,
        start_immediately: bool,
    ) -> Result<GameId> {
        let result = self.build_game(players, start_immediately);
        let game = self.track(result)?;
        let game_id = game.id;

        for player_id in game.distinct_players() {
            if let Some(player) = self.players.get_mut(&player_id) {
                player.games.push(game_id);
            }
        }

        debug!("Created game {} with slots {:?}", game_id, game.players);
        self.games.insert(game_id, game);
        self.next_game_id += 1;
        Ok(game_id)
    }

    fn build_game(&self, players: Vec<PlayerId>, start_immediately: bool) -> Result<Game> {
        for &player_id in &players {
            let player = self
                .players
                .get(&player_id)
                .ok_or(RatingError::PlayerNotFound { player_id })?;
            if let Some(successor) = player.superseded_by {
                return Err(RatingError::InvalidGame {
                    reason: format!(
                        "player {} has been superseded by {}",
                        player_id, successor
                    ),
                }
                .into());
            }
        }

        let mut game = Game::new(self.next_game_id, players)?;
        if start_immediately {
            game.start()?;
        }
        Ok(game)
    }

    pub fn start_game(&mut self, game_id: GameId) -> Result<()> {
        let result = match self.games.get_mut(&game_id) {
            Some(game) => game.start().map(|_| ()),
            None => Err(RatingError::GameNotFound { game_id }.into()),
        };
        self.track(result)
    }

    /// Finish a game with one relative score per slot
    pub fn finish_game(&mut self, game_id: GameId, scores: &[f64]) -> Result<()> {
        let result = self.finish_with(game_id, |game| game.finish(scores).map(|_| ()));
        self.track(result)
    }

    /// Finish a game with a finishing order, best first, ties sharing a rank
    pub fn finish_game_ranked(&mut self, game_id: GameId, ranks: Vec<Vec<PlayerId>>) -> Result<()> {
        let result = self.finish_with(game_id, |game| game.finish_ranked(ranks).map(|_| ()));
        self.track(result)
    }

    /// Finish a copy first so a rejected outcome leaves the stored game untouched
    fn finish_with(
        &mut self,
        game_id: GameId,
        finish: impl FnOnce(&mut Game) -> Result<()>,
    ) -> Result<()> {
        let mut game = self
            .games
            .get(&game_id)
            .cloned()
            .ok_or(RatingError::GameNotFound { game_id })?;
        finish(&mut game)?;

        if let Some(guard) = self.determinism.as_mut() {
            guard.check(&game)?;
            guard.record(&game);
        }

        self.games.insert(game_id, game);
        self.pending.push(game_id);
        self.metrics.record_game_finished(self.pending.len());
        debug!(
            "Game {} finished, {} games pending",
            game_id,
            self.pending.len()
        );
        Ok(())
    }

    /// Rate every game finished since the last close and commit the results.
    ///
    /// Players without games in the period get the idle deviation increase.
    /// Superseded bot versions are left alone unless they still have games in
    /// the period. On error no rating changes and the period stays open.
    pub fn close_period_and_update(&mut self) -> Result<PeriodSummary> {
        let timer = self.metrics.start_timer();
        let result = self.rate_pending();
        let changes = self.track(result)?;

        let games = std::mem::take(&mut self.pending);
        self.periods_closed += 1;

        let idle = changes.iter().filter(|c| c.encounters == 0).count();
        self.metrics.record_period_closed(
            changes.len() - idle,
            idle,
            changes.iter().filter_map(|c| c.solver_iterations),
            timer.stop(),
        );

        info!(
            "Closed rating period {}: {} games, {} active and {} idle players",
            self.periods_closed,
            games.len(),
            changes.len() - idle,
            idle
        );

        Ok(PeriodSummary {
            period: self.periods_closed,
            games,
            changes,
        })
    }

    fn rate_pending(&mut self) -> Result<Vec<RatingChange>> {
        let mut batch = Vec::with_capacity(self.pending.len());
        let mut participants = BTreeSet::new();
        for &game_id in &self.pending {
            let game = self
                .games
                .get(&game_id)
                .ok_or(RatingError::GameNotFound { game_id })?;
            participants.extend(game.distinct_players());
            batch.push(game);
        }

        let rated = self
            .players
            .values_mut()
            .filter(|player| player.is_active() || participants.contains(&player.id));

        update_ratings_for_period(self.calculator.as_ref(), rated, batch)
    }

    /// Count failures by kind before handing them back
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            let kind = error
                .downcast_ref::<RatingError>()
                .map(RatingError::kind)
                .unwrap_or("other");
            self.metrics.record_error(kind);
            warn!("Ruleset operation failed: {}", error);
        }
        result
    }

    fn insert_player(
        &mut self,
        name: String,
        rating: Rating,
        bot: Option<BotIdentity>,
    ) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let mut player = Player::new(id, name, rating);
        player.bot = bot;
        debug!("Added player {} ({})", id, player.name);
        self.players.insert(id, player);
        id
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// Every player record in id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.games.get(&game_id)
    }

    pub fn bot(&self, lineage: LineageId) -> Option<&Bot> {
        self.bots.get(&lineage)
    }

    pub fn pending_games(&self) -> &[GameId] {
        &self.pending
    }

    pub fn config(&self) -> &RulesetConfig {
        &self.config
    }

    pub fn calculator(&self) -> &dyn RatingCalculator {
        self.calculator.as_ref()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn stats(&self) -> RulesetStats {
        RulesetStats {
            players: self.players.len(),
            active_players: self.players.values().filter(|p| p.is_active()).count(),
            bots: self.bots.len(),
            games: self.games.len(),
            pending_games: self.pending.len(),
            periods_closed: self.periods_closed,
        }
    }
}

fn release_name(bot: &str, version: BotVersion) -> String {
    format!("{}@{}", bot, version)
}

fn validate_rating(rating: &Rating) -> Result<()> {
    let reason = if !rating.rating.is_finite() {
        format!("rating must be finite, got {}", rating.rating)
    } else if !rating.deviation.is_finite() || rating.deviation < 0.0 {
        format!("deviation must be finite and non-negative, got {}", rating.deviation)
    } else if !rating.volatility.is_finite() || rating.volatility <= 0.0 {
        format!("volatility must be finite and positive, got {}", rating.volatility)
    } else {
        return Ok(());
    };
    Err(RatingError::InvalidRating { reason }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::calculator::MockRatingCalculator;
    use crate::types::GameStatus;

    fn ruleset() -> Ruleset {
        Ruleset::new(RulesetConfig::default()).unwrap()
    }

    fn mocked(calculator: MockRatingCalculator) -> Ruleset {
        Ruleset::with_calculator(
            RulesetConfig::default(),
            Arc::new(calculator),
            Arc::new(MetricsCollector::new().unwrap()),
        )
        .unwrap()
    }

    fn error_of<T: std::fmt::Debug>(result: Result<T>) -> RatingError {
        result
            .unwrap_err()
            .downcast_ref::<RatingError>()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RulesetConfig {
            system_tau: 0.0,
            ..RulesetConfig::default()
        };
        assert!(Ruleset::new(config).is_err());
    }

    #[test]
    fn test_players_get_sequential_ids() {
        let mut ruleset = ruleset();
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");
        assert_eq!((a, b), (1, 2));
        assert_eq!(ruleset.player(a).unwrap().rating, Rating::default());
        assert_eq!(ruleset.stats().players, 2);
    }

    #[test]
    fn test_add_player_with_invalid_rating() {
        let mut ruleset = ruleset();
        let negative = Rating {
            deviation: -1.0,
            ..Rating::default()
        };
        assert!(matches!(
            error_of(ruleset.add_player_with_rating("a", negative)),
            RatingError::InvalidRating { .. }
        ));

        let nan = Rating {
            rating: f64::NAN,
            ..Rating::default()
        };
        assert!(ruleset.add_player_with_rating("b", nan).is_err());
        assert_eq!(ruleset.stats().players, 0);
        assert_eq!(
            ruleset
                .metrics()
                .period()
                .errors_total
                .with_label_values(&["invalid_rating"])
                .get(),
            2
        );
    }

    #[test]
    fn test_game_lifecycle_through_ruleset() {
        let mut ruleset = ruleset();
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");

        let game = ruleset.create_game(vec![a, b], false).unwrap();
        assert_eq!(ruleset.game(game).unwrap().status(), GameStatus::Created);
        assert_eq!(ruleset.player(a).unwrap().games, vec![game]);

        assert!(matches!(
            error_of(ruleset.finish_game(game, &[1.0, 0.0])),
            RatingError::InvalidStateTransition { .. }
        ));
        ruleset.start_game(game).unwrap();
        ruleset.finish_game(game, &[1.0, 0.0]).unwrap();
        assert_eq!(ruleset.pending_games(), &[game]);

        assert!(matches!(
            error_of(ruleset.finish_game(game, &[0.0, 1.0])),
            RatingError::InvalidStateTransition { .. }
        ));
        assert_eq!(ruleset.pending_games().len(), 1);
    }

    #[test]
    fn test_unknown_ids() {
        let mut ruleset = ruleset();
        let a = ruleset.add_player("a");
        assert_eq!(
            error_of(ruleset.create_game(vec![a, 99], true)),
            RatingError::PlayerNotFound { player_id: 99 }
        );
        assert_eq!(
            error_of(ruleset.start_game(5)),
            RatingError::GameNotFound { game_id: 5 }
        );
        assert_eq!(ruleset.stats().games, 0);
    }

    #[test]
    fn test_close_period_rates_and_clears_batch() {
        let mut ruleset = ruleset();
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");
        let idle = ruleset.add_player("idle");

        let game = ruleset.create_game(vec![a, b], true).unwrap();
        ruleset.finish_game(game, &[1.0, 0.0]).unwrap();

        let summary = ruleset.close_period_and_update().unwrap();
        assert_eq!(summary.period, 1);
        assert_eq!(summary.games, vec![game]);
        assert_eq!(summary.changes.len(), 3);
        assert!(ruleset.pending_games().is_empty());

        assert!(ruleset.player(a).unwrap().rating.rating > 1500.0);
        assert!(ruleset.player(b).unwrap().rating.rating < 1500.0);
        assert!(ruleset.player(idle).unwrap().rating.deviation > 350.0);
        assert_eq!(ruleset.stats().periods_closed, 1);
    }

    #[test]
    fn test_failing_calculator_commits_nothing() {
        let mut calculator = MockRatingCalculator::new();
        calculator
            .expect_initial_rating()
            .returning(Rating::default);
        calculator.expect_rate_period().times(1).returning(|_, _| {
            Err(RatingError::InternalConvergence {
                player_id: 1,
                iterations: 1000,
                reason: "iteration cap reached".to_string(),
            }
            .into())
        });

        let mut ruleset = mocked(calculator);
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");
        let game = ruleset.create_game(vec![a, b], true).unwrap();
        ruleset.finish_game(game, &[1.0, 0.0]).unwrap();

        assert!(matches!(
            error_of(ruleset.close_period_and_update()),
            RatingError::InternalConvergence { player_id: 1, .. }
        ));
        assert!(ruleset.players().all(|p| p.rating == Rating::default()));
        assert_eq!(ruleset.pending_games(), &[game]);
        assert_eq!(ruleset.stats().periods_closed, 0);
    }

    #[test]
    fn test_calculator_result_is_committed() {
        let new_rating = Rating {
            rating: 1600.0,
            deviation: 200.0,
            volatility: 0.06,
        };

        let mut calculator = MockRatingCalculator::new();
        calculator
            .expect_initial_rating()
            .returning(Rating::default);
        calculator
            .expect_rate_period()
            .returning(move |snapshot, outcomes| {
                Ok(snapshot
                    .iter()
                    .map(|(&player_id, &old_rating)| RatingChange {
                        player_id,
                        old_rating,
                        new_rating,
                        encounters: outcomes.encounters(player_id).len(),
                        solver_iterations: Some(3),
                    })
                    .collect())
            });

        let mut ruleset = mocked(calculator);
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");
        let game = ruleset.create_game(vec![a, b], true).unwrap();
        ruleset.finish_game(game, &[0.5, 0.5]).unwrap();

        let summary = ruleset.close_period_and_update().unwrap();
        assert!(summary.changes.iter().all(|c| c.encounters == 1));
        assert!(ruleset.players().all(|p| p.rating == new_rating));
    }

    #[test]
    fn test_bot_release_supersedes_previous_version() {
        let mut ruleset = ruleset();
        let human = ruleset.add_player("human");
        let lineage = ruleset.add_bot("greedy", BotVersion::new(1, 0, 0));
        let v1 = ruleset.bot(lineage).unwrap().current().player_id;

        let game = ruleset.create_game(vec![human, v1], true).unwrap();
        ruleset.finish_game(game, &[0.0, 1.0]).unwrap();
        ruleset.close_period_and_update().unwrap();
        let v1_rating = ruleset.player(v1).unwrap().rating;
        assert!(v1_rating.rating > 1500.0);

        let v2 = ruleset
            .release_bot_version(lineage, BotVersion::new(1, 1, 0))
            .unwrap();
        let released = ruleset.player(v2).unwrap();
        assert_eq!(released.rating, Rating::default());
        assert_eq!(released.bot.as_ref().unwrap().predecessor, Some(v1));
        assert_eq!(released.name, "greedy@1.1.0");
        assert_eq!(ruleset.player(v1).unwrap().superseded_by, Some(v2));

        // The superseded version can no longer play and keeps its rating
        assert!(ruleset.create_game(vec![human, v1], true).is_err());
        ruleset.close_period_and_update().unwrap();
        assert_eq!(ruleset.player(v1).unwrap().rating, v1_rating);
        assert!(ruleset.player(v2).unwrap().rating.deviation > 350.0);
    }

    #[test]
    fn test_bot_release_errors() {
        let mut ruleset = ruleset();
        let lineage = ruleset.add_bot("greedy", BotVersion::new(1, 0, 0));

        assert!(matches!(
            error_of(ruleset.release_bot_version(lineage, BotVersion::new(1, 0, 0))),
            RatingError::InvalidBotVersion { .. }
        ));
        let unknown = Uuid::new_v4();
        assert_eq!(
            error_of(ruleset.release_bot_version(unknown, BotVersion::new(2, 0, 0))),
            RatingError::BotNotFound { lineage: unknown }
        );
        assert_eq!(ruleset.stats().players, 1);
    }

    #[test]
    fn test_superseded_version_with_pending_games_is_rated() {
        let mut ruleset = ruleset();
        let human = ruleset.add_player("human");
        let lineage = ruleset.add_bot("greedy", BotVersion::new(1, 0, 0));
        let v1 = ruleset.bot(lineage).unwrap().current().player_id;

        let game = ruleset.create_game(vec![human, v1], true).unwrap();
        ruleset.finish_game(game, &[0.0, 1.0]).unwrap();
        ruleset
            .release_bot_version(lineage, BotVersion::new(2, 0, 0))
            .unwrap();

        let summary = ruleset.close_period_and_update().unwrap();
        assert!(summary.changes.iter().any(|c| c.player_id == v1));
        assert!(ruleset.player(v1).unwrap().rating.rating > 1500.0);
    }

    #[test]
    fn test_deterministic_conflict_keeps_game_open() {
        let mut ruleset = Ruleset::new(RulesetConfig::deterministic()).unwrap();
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");

        let first = ruleset.create_game(vec![a, b], true).unwrap();
        ruleset.finish_game(first, &[1.0, 0.0]).unwrap();

        let second = ruleset.create_game(vec![b, a], true).unwrap();
        assert!(matches!(
            error_of(ruleset.finish_game(second, &[1.0, 0.0])),
            RatingError::NonDeterministicResult {
                previous_game_id,
                ..
            } if previous_game_id == first
        ));
        assert_eq!(
            ruleset.game(second).unwrap().status(),
            GameStatus::InProgress
        );
        ruleset.finish_game(second, &[0.0, 1.0]).unwrap();
        assert_eq!(ruleset.pending_games().len(), 2);
    }

    #[test]
    fn test_degenerate_finish_is_rejected_and_period_still_closes() {
        let mut ruleset = ruleset();
        let a = ruleset.add_player("a");
        let b = ruleset.add_player("b");
        let game = ruleset.create_game(vec![a, b], true).unwrap();

        assert!(matches!(
            error_of(ruleset.finish_game(game, &[0.0, 0.0])),
            RatingError::DegenerateOutcome { .. }
        ));
        assert!(ruleset.pending_games().is_empty());
        assert_eq!(
            ruleset.game(game).unwrap().status(),
            GameStatus::InProgress
        );

        ruleset.finish_game(game, &[1.0, 0.0]).unwrap();
        let summary = ruleset.close_period_and_update().unwrap();
        assert_eq!(summary.games, vec![game]);
        assert!(ruleset.pending_games().is_empty());
        assert!(ruleset.player(a).unwrap().rating.rating > 1500.0);
    }
}
