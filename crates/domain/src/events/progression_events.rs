//! Outcomes of mutating a player's progression.

use serde::{Deserialize, Serialize};

use crate::entities::Achievement;
use crate::{RewardId, StoryId};

/// What a progression mutation actually changed.
///
/// The `Already*` variants mean nothing changed and no write is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionUpdate {
    RewardGranted {
        reward_id: RewardId,
        quantity: u32,
        xp_gained: i64,
    },
    CharacterMet {
        name: String,
        achievements: Vec<Achievement>,
    },
    CharacterAlreadyKnown {
        name: String,
    },
    StoryCompleted {
        story_id: StoryId,
        xp_gained: i64,
        level: u32,
        achievements: Vec<Achievement>,
    },
    StoryAlreadyCompleted {
        story_id: StoryId,
    },
    XpAdjusted {
        from: i64,
        to: i64,
    },
}

impl ProgressionUpdate {
    /// True when the progression changed and must be persisted.
    pub fn is_change(&self) -> bool {
        match self {
            Self::CharacterAlreadyKnown { .. } | Self::StoryAlreadyCompleted { .. } => false,
            Self::XpAdjusted { from, to } => from != to,
            _ => true,
        }
    }
}
