//! Common types used throughout the rating engine

use crate::config::rating::{DEFAULT_DEVIATION, DEFAULT_RATING, DEFAULT_VOLATILITY};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillratings::glicko2::Glicko2Rating;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for players and bot versions
pub type PlayerId = u64;

/// Unique identifier for games
pub type GameId = u64;

/// Key shared by every version of the same bot
pub type LineageId = Uuid;

/// Relative score per distinct player of one finished game
pub type GameResult = BTreeMap<PlayerId, f64>;

/// Rating triple on the external (1500-centered) scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            deviation: DEFAULT_DEVIATION,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

impl Rating {
    /// Default rating and deviation with a ruleset-specific starting volatility
    pub fn with_volatility(volatility: f64) -> Self {
        Self {
            volatility,
            ..Self::default()
        }
    }
}

impl From<Glicko2Rating> for Rating {
    fn from(rating: Glicko2Rating) -> Self {
        Self {
            rating: rating.rating,
            deviation: rating.deviation,
            volatility: rating.volatility,
        }
    }
}

impl From<Rating> for Glicko2Rating {
    fn from(rating: Rating) -> Self {
        Self {
            rating: rating.rating,
            deviation: rating.deviation,
            volatility: rating.volatility,
        }
    }
}

/// Version tag of a bot variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl BotVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for BotVersion {
    fn default() -> Self {
        Self::new(0, 1, 0)
    }
}

impl std::fmt::Display for BotVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identity of a player that is one version of a bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub lineage: LineageId,
    pub version: BotVersion,
    /// Player record of the previous version, if any
    pub predecessor: Option<PlayerId>,
}

/// A rated participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub rating: Rating,
    pub games: Vec<GameId>,
    pub bot: Option<BotIdentity>,
    /// Set once a newer bot version replaces this record
    pub superseded_by: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, rating: Rating) -> Self {
        Self {
            id,
            name: name.into(),
            rating,
            games: Vec::new(),
            bot: None,
            superseded_by: None,
            created_at: current_timestamp(),
        }
    }

    /// Superseded bot versions keep their last rating as history
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// How a finished game was decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Mean relative score per distinct player
    Scores(GameResult),
    /// Finishing order, best first; players sharing a rank tied
    Ranked(Vec<Vec<PlayerId>>),
}

/// Lifecycle state of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Created,
    InProgress,
    Finished,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Created => write!(f, "Created"),
            GameStatus::InProgress => write!(f, "InProgress"),
            GameStatus::Finished => write!(f, "Finished"),
        }
    }
}

/// Rating change information for a player over one rating period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub old_rating: Rating,
    pub new_rating: Rating,
    /// Number of (opponent, score) comparisons applied
    pub encounters: usize,
    /// Volatility solver iterations; `None` for an idle period
    pub solver_iterations: Option<usize>,
}

impl RatingChange {
    pub fn rating_delta(&self) -> f64 {
        self.new_rating.rating - self.old_rating.rating
    }
}
