//! Error types for the rating engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the crate. Every variant is a local logic error: the engine does no
//! I/O, so nothing here is retryable.

use crate::types::{GameId, LineageId, PlayerId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RatingError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error(
        "Degenerate outcome in game {game_id}: players {player_a} and {player_b} both scored zero"
    )]
    DegenerateOutcome {
        game_id: GameId,
        player_a: PlayerId,
        player_b: PlayerId,
    },

    #[error(
        "Non-deterministic result in game {game_id}: matchup {players:?} \
         differs from game {previous_game_id}"
    )]
    NonDeterministicResult {
        game_id: GameId,
        previous_game_id: GameId,
        players: Vec<PlayerId>,
    },

    #[error(
        "Volatility solver failed for player {player_id} after {iterations} iterations: {reason}"
    )]
    InternalConvergence {
        player_id: PlayerId,
        iterations: usize,
        reason: String,
    },

    #[error("Invalid state transition for game {game_id}: {transition}")]
    InvalidStateTransition { game_id: GameId, transition: String },

    #[error("Invalid result for game {game_id}: {reason}")]
    InvalidResult { game_id: GameId, reason: String },

    #[error("Invalid rating: {reason}")]
    InvalidRating { reason: String },

    #[error("Invalid game: {reason}")]
    InvalidGame { reason: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: GameId },

    #[error("Bot lineage not found: {lineage}")]
    BotNotFound { lineage: LineageId },

    #[error("Invalid version for bot {lineage}: {reason}")]
    InvalidBotVersion { lineage: LineageId, reason: String },
}

impl RatingError {
    /// Short machine-friendly name of the error kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            RatingError::ConfigurationError { .. } => "configuration",
            RatingError::DegenerateOutcome { .. } => "degenerate_outcome",
            RatingError::NonDeterministicResult { .. } => "non_deterministic_result",
            RatingError::InternalConvergence { .. } => "internal_convergence",
            RatingError::InvalidStateTransition { .. } => "invalid_state_transition",
            RatingError::InvalidResult { .. } => "invalid_result",
            RatingError::InvalidRating { .. } => "invalid_rating",
            RatingError::InvalidGame { .. } => "invalid_game",
            RatingError::PlayerNotFound { .. } => "player_not_found",
            RatingError::GameNotFound { .. } => "game_not_found",
            RatingError::BotNotFound { .. } => "bot_not_found",
            RatingError::InvalidBotVersion { .. } => "invalid_bot_version",
        }
    }
}
