//! Test fixtures and helpers for integration testing

use bot_rating::config::RulesetConfig;
use bot_rating::{GameId, PlayerId, Rating, RatingError, Ruleset};

/// Ruleset with default configuration
pub fn ruleset() -> Ruleset {
    Ruleset::new(RulesetConfig::default()).expect("default config is valid")
}

/// Ruleset with a custom system constant
pub fn ruleset_with_tau(system_tau: f64) -> Ruleset {
    Ruleset::new(RulesetConfig {
        system_tau,
        ..RulesetConfig::default()
    })
    .expect("tau is valid")
}

pub fn rating(rating: f64, deviation: f64, volatility: f64) -> Rating {
    Rating {
        rating,
        deviation,
        volatility,
    }
}

/// Create, start and finish a game in one go
pub fn play(ruleset: &mut Ruleset, players: &[PlayerId], scores: &[f64]) -> GameId {
    let game = ruleset
        .create_game(players.to_vec(), true)
        .expect("game can be created");
    ruleset
        .finish_game(game, scores)
        .expect("game can be finished");
    game
}

/// Create, start and finish a game by finishing order
pub fn play_ranked(ruleset: &mut Ruleset, ranks: Vec<Vec<PlayerId>>) -> GameId {
    let players: Vec<PlayerId> = ranks.iter().flatten().copied().collect();
    let game = ruleset
        .create_game(players, true)
        .expect("game can be created");
    ruleset
        .finish_game_ranked(game, ranks)
        .expect("game can be finished");
    game
}

pub fn current_rating(ruleset: &Ruleset, player_id: PlayerId) -> Rating {
    ruleset.player(player_id).expect("player exists").rating
}

/// Extract the rating error behind an anyhow error
pub fn rating_error(error: anyhow::Error) -> RatingError {
    error
        .downcast_ref::<RatingError>()
        .cloned()
        .unwrap_or_else(|| panic!("not a rating error: {}", error))
}
