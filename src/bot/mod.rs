//! Bot lineages
//!
//! A bot is a sequence of released versions. Releasing a version creates a
//! fresh player record instead of rewriting the previous one, so the rating
//! history of older versions stays intact.

pub mod lineage;

// Re-export commonly used types
pub use lineage::{Bot, BotRelease};
