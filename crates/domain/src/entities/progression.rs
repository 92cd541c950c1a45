//! Durable per-player progression facts.
//!
//! Facts are append-only: stories, characters and inventory entries are never
//! removed, and each mutation reports what actually changed so callers can
//! skip redundant writes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::ProgressionUpdate;
use crate::{DomainError, Reward, RewardId, StoryId, UserId};

/// Experience granted the first time a story is completed.
pub const STORY_COMPLETION_XP: i64 = 25;

/// One stack of a granted reward in the player's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub reward_id: RewardId,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub value: i64,
    pub quantity: u32,
    pub origin_story: Option<StoryId>,
    pub obtained_at: DateTime<Utc>,
}

/// Milestones unlocked at most once per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    PrimeraHistoria,
    ExploradorNovato,
    NarradorExperto,
    ResistenteVeterano,
    SocialiteUrbano,
    ExploradorUrbano,
}

impl Achievement {
    pub const ALL: [Achievement; 6] = [
        Self::PrimeraHistoria,
        Self::ExploradorNovato,
        Self::NarradorExperto,
        Self::ResistenteVeterano,
        Self::SocialiteUrbano,
        Self::ExploradorUrbano,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimeraHistoria => "primera_historia",
            Self::ExploradorNovato => "explorador_novato",
            Self::NarradorExperto => "narrador_experto",
            Self::ResistenteVeterano => "resistente_veterano",
            Self::SocialiteUrbano => "socialite_urbano",
            Self::ExploradorUrbano => "explorador_urbano",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == code)
    }

    fn is_earned_by(&self, progression: &PlayerProgression) -> bool {
        match self {
            Self::PrimeraHistoria => !progression.completed.is_empty(),
            Self::ExploradorNovato => progression.completed.len() >= 5,
            Self::NarradorExperto => progression.completed.len() >= 10,
            Self::ResistenteVeterano => progression.level() >= 5,
            Self::SocialiteUrbano => progression.known_characters.len() >= 5,
            Self::ExploradorUrbano => progression.visited.len() >= 10,
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level for an experience total: `floor(sqrt(xp / 100)) + 1`.
pub fn level_for_xp(xp: i64) -> u32 {
    let xp = xp.max(0) as f64;
    (xp / 100.0).sqrt().floor() as u32 + 1
}

/// Experience total at which `level` is left behind.
pub fn xp_for_next_level(level: u32) -> i64 {
    i64::from(level) * i64::from(level) * 100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgression {
    pub user_id: UserId,
    pub xp: i64,
    pub visited: BTreeSet<StoryId>,
    pub completed: BTreeSet<StoryId>,
    pub known_characters: BTreeSet<String>,
    pub inventory: Vec<InventoryItem>,
    pub achievements: BTreeSet<Achievement>,
}

impl PlayerProgression {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            xp: 0,
            visited: BTreeSet::new(),
            completed: BTreeSet::new(),
            known_characters: BTreeSet::new(),
            inventory: Vec::new(),
            achievements: BTreeSet::new(),
        }
    }

    pub fn with_xp(mut self, xp: i64) -> Self {
        self.xp = xp.max(0);
        self
    }

    pub fn level(&self) -> u32 {
        level_for_xp(self.xp)
    }

    pub fn has_visited(&self, story: StoryId) -> bool {
        self.visited.contains(&story) || self.completed.contains(&story)
    }

    pub fn has_completed(&self, story: StoryId) -> bool {
        self.completed.contains(&story)
    }

    pub fn knows(&self, character_name: &str) -> bool {
        self.known_characters.contains(character_name)
    }

    /// Names of everything in the inventory, for app inventory checks.
    pub fn inventory_names(&self) -> Vec<String> {
        self.inventory.iter().map(|item| item.name.clone()).collect()
    }

    /// Adds a reward to the inventory (stacking duplicates) and its value to XP.
    ///
    /// The story the reward was earned in, if any, is marked visited.
    pub fn grant_reward(
        &mut self,
        reward: &Reward,
        story: Option<StoryId>,
        now: DateTime<Utc>,
    ) -> ProgressionUpdate {
        let quantity = match self.inventory.iter_mut().find(|i| i.reward_id == reward.id) {
            Some(existing) => {
                existing.quantity += 1;
                existing.quantity
            }
            None => {
                self.inventory.push(InventoryItem {
                    reward_id: reward.id,
                    name: reward.name.clone(),
                    description: reward.description.clone(),
                    kind: reward.kind.clone(),
                    value: reward.value,
                    quantity: 1,
                    origin_story: reward.origin_story,
                    obtained_at: now,
                });
                1
            }
        };
        self.xp = (self.xp + reward.value).max(0);
        if let Some(story) = story {
            self.visited.insert(story);
        }
        ProgressionUpdate::RewardGranted {
            reward_id: reward.id,
            quantity,
            xp_gained: reward.value,
        }
    }

    /// Records that the player met a character. Repeat meetings are no-ops.
    pub fn know_character(&mut self, name: impl Into<String>) -> ProgressionUpdate {
        let name = name.into();
        if self.known_characters.insert(name.clone()) {
            let achievements = self.unlock_achievements();
            ProgressionUpdate::CharacterMet { name, achievements }
        } else {
            ProgressionUpdate::CharacterAlreadyKnown { name }
        }
    }

    /// Marks a story complete, once.
    ///
    /// Only the first completion grants [`STORY_COMPLETION_XP`] and can unlock
    /// achievements; later calls report `StoryAlreadyCompleted`.
    pub fn complete_story(&mut self, story: StoryId) -> ProgressionUpdate {
        self.visited.insert(story);
        if !self.completed.insert(story) {
            return ProgressionUpdate::StoryAlreadyCompleted { story_id: story };
        }
        self.xp += STORY_COMPLETION_XP;
        let achievements = self.unlock_achievements();
        ProgressionUpdate::StoryCompleted {
            story_id: story,
            xp_gained: STORY_COMPLETION_XP,
            level: self.level(),
            achievements,
        }
    }

    /// Applies a signed XP change (app costs and fines), never going below zero.
    pub fn apply_xp_delta(&mut self, delta: i64) -> ProgressionUpdate {
        let from = self.xp;
        self.xp = (self.xp + delta).max(0);
        ProgressionUpdate::XpAdjusted { from, to: self.xp }
    }

    /// Spends XP on an in-game purchase. Rejected if the balance is short.
    pub fn spend_xp(&mut self, amount: i64) -> Result<ProgressionUpdate, DomainError> {
        if amount > self.xp {
            return Err(DomainError::insufficient(
                "experience",
                self.xp as f64,
                amount as f64,
            ));
        }
        Ok(self.apply_xp_delta(-amount))
    }

    fn unlock_achievements(&mut self) -> Vec<Achievement> {
        let earned: Vec<Achievement> = Achievement::ALL
            .into_iter()
            .filter(|a| !self.achievements.contains(a) && a.is_earned_by(self))
            .collect();
        self.achievements.extend(earned.iter().copied());
        earned
    }
}
