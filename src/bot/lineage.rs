//! Versioned bot identities
//!
//! Every released version of a bot is its own player record with its own
//! rating. The bot itself only keeps the ordered list of those records under
//! one lineage key.

use crate::error::RatingError;
use crate::types::{BotVersion, LineageId, PlayerId};
use serde::{Deserialize, Serialize};

/// One released version and the player record rating it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotRelease {
    pub version: BotVersion,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub lineage: LineageId,
    pub name: String,
    releases: Vec<BotRelease>,
}

impl Bot {
    pub fn new(
        lineage: LineageId,
        name: impl Into<String>,
        version: BotVersion,
        player_id: PlayerId,
    ) -> Self {
        Self {
            lineage,
            name: name.into(),
            releases: vec![BotRelease { version, player_id }],
        }
    }

    /// Latest release; a bot always has at least one
    pub fn current(&self) -> BotRelease {
        self.releases[self.releases.len() - 1]
    }

    pub fn releases(&self) -> &[BotRelease] {
        &self.releases
    }

    pub fn player_for(&self, version: BotVersion) -> Option<PlayerId> {
        self.releases
            .iter()
            .find(|release| release.version == version)
            .map(|release| release.player_id)
    }

    /// Check that `version` may follow the current release
    pub fn validate_next(&self, version: BotVersion) -> crate::error::Result<()> {
        let current = self.current().version;
        if version <= current {
            return Err(RatingError::InvalidBotVersion {
                lineage: self.lineage,
                reason: format!("version {} does not follow {}", version, current),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn push_release(
        &mut self,
        version: BotVersion,
        player_id: PlayerId,
    ) -> crate::error::Result<()> {
        self.validate_next(version)?;
        self.releases.push(BotRelease { version, player_id });
        Ok(())
    }
}
