//! Repository port traits for the hosted row store.

use async_trait::async_trait;
use resistencia_domain::*;

use super::error::RepoError;
use super::types::InteractionRecord;

// =============================================================================
// Story content (read-only during play)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryRepo: Send + Sync {
    async fn get(&self, id: StoryId) -> Result<Option<Story>, RepoError>;
    async fn list(&self) -> Result<Vec<Story>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepRepo: Send + Sync {
    /// All steps of a story, in any order.
    async fn list_for_story(&self, story_id: StoryId) -> Result<Vec<NarrativeStep>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaRepo: Send + Sync {
    async fn get(&self, id: ResourceId) -> Result<Option<MediaResource>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardRepo: Send + Sync {
    async fn get(&self, id: RewardId) -> Result<Option<Reward>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
}

// =============================================================================
// Player state
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressionRepo: Send + Sync {
    /// `None` for players who never earned anything.
    async fn get(&self, user_id: UserId) -> Result<Option<PlayerProgression>, RepoError>;
    /// Inserts or replaces the player's row.
    async fn save(&self, progression: &PlayerProgression) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionLogRepo: Send + Sync {
    async fn record(&self, interaction: &InteractionRecord) -> Result<(), RepoError>;
}
