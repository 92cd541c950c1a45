//! Entities loaded from the hosted backend.

mod character;
mod media;
mod progression;
mod step;
mod story;
mod reward;

pub use character::Character;
pub use media::{MediaKind, MediaResource};
pub use progression::{
    level_for_xp, xp_for_next_level, Achievement, InventoryItem, PlayerProgression,
    STORY_COMPLETION_XP,
};
pub use reward::Reward;
pub use step::{BranchChoice, BranchOption, NarrativeStep, StepKind};
pub use story::Story;
