//! Rewards granted by steps, hotspots and apps.

use serde::{Deserialize, Serialize};

use crate::{RewardId, StoryId};

/// A reward row: an inventory item worth some experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: RewardId,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<String>,
    /// Experience points added when granted.
    pub value: i64,
    pub origin_story: Option<StoryId>,
}

impl Reward {
    pub fn new(id: RewardId, name: impl Into<String>, value: i64) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            kind: None,
            value,
            origin_story: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
