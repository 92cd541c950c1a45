//! Stories and their unlock rules.

use serde::{Deserialize, Serialize};

use crate::{LocationId, PlayerProgression, ResourceId, StoryId};

/// A playable story, as listed on the map and story menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub description: String,
    /// Story that must be finished before this one opens.
    pub depends_on: Option<StoryId>,
    pub location: Option<LocationId>,
    pub cover_image: Option<ResourceId>,
    pub order: Option<u32>,
}

impl Story {
    pub fn new(id: StoryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            depends_on: None,
            location: None,
            cover_image: None,
            order: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependency(mut self, story: StoryId) -> Self {
        self.depends_on = Some(story);
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// A story stays locked until its dependency has been visited.
    pub fn is_locked_for(&self, progression: &PlayerProgression) -> bool {
        match self.depends_on {
            Some(dependency) => !progression.has_visited(dependency),
            None => false,
        }
    }
}
