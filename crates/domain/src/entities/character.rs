//! Characters a player can get to know.

use serde::{Deserialize, Serialize};

use crate::{CharacterId, StoryId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub origin_story: Option<StoryId>,
}

impl Character {
    pub fn new(id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            image: None,
            role: None,
            origin_story: None,
        }
    }
}
