//! Player progression use cases.
//!
//! Every write is a read-modify-write of the player's profile row. Writes for
//! one player go through a per-user async mutex so concurrent grants never
//! overwrite each other; unchanged profiles are not written back.

use std::sync::Arc;

use dashmap::DashMap;
use resistencia_domain::{
    CharacterId, DomainError, PlayerProgression, ProgressionUpdate, RewardId, StoryId, UserId,
};
use resistencia_shared::{InventoryEntry, PlayerStats};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{
    CharacterRepo, ClockPort, ProgressionRepo, RepoError, RewardRepo,
};

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// What an embedded app is told about the player.
pub fn player_stats(progression: &PlayerProgression) -> PlayerStats {
    PlayerStats {
        xp: progression.xp,
        inventario: progression
            .inventory
            .iter()
            .map(|item| InventoryEntry::Item {
                nombre: item.name.clone(),
            })
            .collect(),
    }
}

pub struct ProgressionOps {
    progression: Arc<dyn ProgressionRepo>,
    rewards: Arc<dyn RewardRepo>,
    characters: Arc<dyn CharacterRepo>,
    clock: Arc<dyn ClockPort>,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl ProgressionOps {
    pub fn new(
        progression: Arc<dyn ProgressionRepo>,
        rewards: Arc<dyn RewardRepo>,
        characters: Arc<dyn CharacterRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            progression,
            rewards,
            characters,
            clock,
            locks: DashMap::new(),
        }
    }

    /// The player's progression. Players without a profile row start fresh.
    pub async fn get(&self, user_id: UserId) -> Result<PlayerProgression, ProgressionError> {
        Ok(self
            .progression
            .get(user_id)
            .await?
            .unwrap_or_else(|| PlayerProgression::new(user_id)))
    }

    /// Grants a reward by id. Unknown rewards are skipped.
    pub async fn grant_reward(
        &self,
        user_id: UserId,
        reward_id: RewardId,
        story: Option<StoryId>,
    ) -> Result<Option<ProgressionUpdate>, ProgressionError> {
        let Some(reward) = self.rewards.get(reward_id).await? else {
            tracing::warn!(user_id = %user_id, reward_id = %reward_id, "Reward not found, skipping grant");
            return Ok(None);
        };
        let now = self.clock.now();
        let update = self
            .mutate(user_id, |p| Ok(p.grant_reward(&reward, story, now)))
            .await?;
        tracing::info!(
            user_id = %user_id,
            reward_id = %reward_id,
            reward = %reward.name,
            xp_gained = reward.value,
            "Reward granted"
        );
        Ok(Some(update))
    }

    /// Records that the player met a character. Unknown characters are skipped.
    pub async fn know_character(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<Option<ProgressionUpdate>, ProgressionError> {
        let Some(character) = self.characters.get(character_id).await? else {
            tracing::warn!(user_id = %user_id, character_id = %character_id, "Character not found");
            return Ok(None);
        };
        let update = self
            .mutate(user_id, |p| Ok(p.know_character(character.name.clone())))
            .await?;
        if update.is_change() {
            tracing::info!(user_id = %user_id, character = %character.name, "Character met");
        }
        Ok(Some(update))
    }

    pub async fn complete_story(
        &self,
        user_id: UserId,
        story: StoryId,
    ) -> Result<ProgressionUpdate, ProgressionError> {
        let update = self.mutate(user_id, |p| Ok(p.complete_story(story))).await?;
        if let ProgressionUpdate::StoryCompleted {
            xp_gained,
            level,
            achievements,
            ..
        } = &update
        {
            tracing::info!(
                user_id = %user_id,
                story_id = %story,
                xp_gained,
                level,
                achievements = ?achievements,
                "Story completed"
            );
        }
        Ok(update)
    }

    /// Applies an app result in one write: the signed XP change (clamped at
    /// zero), then each reward. Unknown rewards are skipped.
    pub async fn apply_app_result(
        &self,
        user_id: UserId,
        xp_delta: i64,
        rewards: &[RewardId],
        story: Option<StoryId>,
    ) -> Result<Vec<ProgressionUpdate>, ProgressionError> {
        let mut known = Vec::with_capacity(rewards.len());
        for reward_id in rewards {
            match self.rewards.get(*reward_id).await? {
                Some(reward) => known.push(reward),
                None => tracing::warn!(
                    user_id = %user_id,
                    reward_id = %reward_id,
                    "Reward not found, skipping grant"
                ),
            }
        }
        let now = self.clock.now();

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut progression = self.get(user_id).await?;
        let mut updates = Vec::with_capacity(known.len() + 1);
        if xp_delta != 0 {
            updates.push(progression.apply_xp_delta(xp_delta));
        }
        for reward in &known {
            updates.push(progression.grant_reward(reward, story, now));
        }
        if updates.iter().any(ProgressionUpdate::is_change) {
            self.progression.save(&progression).await?;
            tracing::info!(
                user_id = %user_id,
                xp_delta,
                rewards = ?known.iter().map(|r| r.id).collect::<Vec<_>>(),
                xp = progression.xp,
                "App result applied"
            );
        }
        Ok(updates)
    }

    /// Spends XP, failing without a write if the balance is short.
    pub async fn spend_xp(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<ProgressionUpdate, ProgressionError> {
        self.mutate(user_id, |p| p.spend_xp(amount)).await
    }

    async fn mutate<F>(&self, user_id: UserId, f: F) -> Result<ProgressionUpdate, ProgressionError>
    where
        F: FnOnce(&mut PlayerProgression) -> Result<ProgressionUpdate, DomainError>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut progression = self.get(user_id).await?;
        let update = f(&mut progression)?;
        if update.is_change() {
            self.progression.save(&progression).await?;
        } else {
            tracing::debug!(user_id = %user_id, update = ?update, "Progression unchanged, skipping write");
        }
        Ok(update)
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.locks.entry(user_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockCharacterRepo, MockProgressionRepo, MockRewardRepo};
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use resistencia_domain::{Character, Reward};

    fn ops(
        progression: MockProgressionRepo,
        rewards: MockRewardRepo,
        characters: MockCharacterRepo,
    ) -> ProgressionOps {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ProgressionOps::new(
            Arc::new(progression),
            Arc::new(rewards),
            Arc::new(characters),
            Arc::new(FixedClock(now)),
        )
    }

    #[tokio::test]
    async fn missing_profile_starts_fresh() {
        let user = UserId::new();
        let mut repo = MockProgressionRepo::new();
        repo.expect_get().with(eq(user)).returning(|_| Ok(None));

        let ops = ops(repo, MockRewardRepo::new(), MockCharacterRepo::new());
        let progression = ops.get(user).await.unwrap();
        assert_eq!(progression.xp, 0);
        assert_eq!(progression.user_id, user);
    }

    #[tokio::test]
    async fn granting_a_reward_saves_inventory_and_xp() {
        let user = UserId::new();
        let mut repo = MockProgressionRepo::new();
        repo.expect_get().returning(|_| Ok(None));
        repo.expect_save()
            .withf(|p| {
                p.xp == 10
                    && p.inventory.len() == 1
                    && p.inventory[0].obtained_at == Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                    && p.has_visited(StoryId::new(2))
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut rewards = MockRewardRepo::new();
        rewards
            .expect_get()
            .with(eq(RewardId::new(4)))
            .returning(|id| Ok(Some(Reward::new(id, "Spray de Pintura", 10))));

        let ops = ops(repo, rewards, MockCharacterRepo::new());
        let update = ops
            .grant_reward(user, RewardId::new(4), Some(StoryId::new(2)))
            .await
            .unwrap();
        assert!(matches!(update, Some(ProgressionUpdate::RewardGranted { quantity: 1, .. })));
    }

    #[tokio::test]
    async fn app_result_is_written_once() {
        let user = UserId::new();
        let mut repo = MockProgressionRepo::new();
        repo.expect_get()
            .returning(move |_| Ok(Some(PlayerProgression::new(user).with_xp(100))));
        repo.expect_save()
            .withf(|p| {
                p.xp == 100 - 50 + 10
                    && p.inventory.len() == 1
                    && p.inventory[0].reward_id == RewardId::new(4)
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut rewards = MockRewardRepo::new();
        rewards
            .expect_get()
            .with(eq(RewardId::new(4)))
            .returning(|id| Ok(Some(Reward::new(id, "Spray de Pintura", 10))));
        rewards
            .expect_get()
            .with(eq(RewardId::new(99)))
            .returning(|_| Ok(None));

        let ops = ops(repo, rewards, MockCharacterRepo::new());
        let updates = ops
            .apply_app_result(user, -50, &[RewardId::new(4), RewardId::new(99)], None)
            .await
            .unwrap();
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates[0], ProgressionUpdate::XpAdjusted { from: 100, to: 50 }));
    }

    #[tokio::test]
    async fn unknown_reward_is_skipped() {
        let mut rewards = MockRewardRepo::new();
        rewards.expect_get().returning(|_| Ok(None));

        let ops = ops(MockProgressionRepo::new(), rewards, MockCharacterRepo::new());
        let update = ops
            .grant_reward(UserId::new(), RewardId::new(99), None)
            .await
            .unwrap();
        assert!(update.is_none());
    }

    #[tokio::test]
    async fn known_character_is_not_written_again() {
        let user = UserId::new();
        let mut known = PlayerProgression::new(user);
        known.know_character("Lupe");

        let mut repo = MockProgressionRepo::new();
        repo.expect_get()
            .returning(move |_| Ok(Some(known.clone())));
        repo.expect_save().never();

        let mut characters = MockCharacterRepo::new();
        characters
            .expect_get()
            .returning(|id| Ok(Some(Character::new(id, "Lupe"))));

        let ops = ops(repo, MockRewardRepo::new(), characters);
        let update = ops.know_character(user, CharacterId::new(1)).await.unwrap();
        assert!(matches!(update, Some(ProgressionUpdate::CharacterAlreadyKnown { .. })));
    }

    #[tokio::test]
    async fn overspending_is_rejected_without_a_write() {
        let user = UserId::new();
        let mut repo = MockProgressionRepo::new();
        repo.expect_get()
            .returning(move |_| Ok(Some(PlayerProgression::new(user).with_xp(30))));
        repo.expect_save().never();

        let ops = ops(repo, MockRewardRepo::new(), MockCharacterRepo::new());
        let result = ops.spend_xp(user, 50).await;
        assert!(matches!(
            result,
            Err(ProgressionError::Domain(DomainError::Insufficient { .. }))
        ));
    }

    #[tokio::test]
    async fn save_failure_surfaces() {
        let user = UserId::new();
        let mut repo = MockProgressionRepo::new();
        repo.expect_get().returning(|_| Ok(None));
        repo.expect_save()
            .returning(|_| Err(RepoError::database("progression_save", "503")));

        let ops = ops(repo, MockRewardRepo::new(), MockCharacterRepo::new());
        let result = ops.complete_story(user, StoryId::new(1)).await;
        assert!(matches!(result, Err(ProgressionError::Repo(_))));
    }

    #[test]
    fn player_stats_lists_inventory_names() {
        let mut progression = PlayerProgression::new(UserId::new()).with_xp(120);
        progression.grant_reward(
            &Reward::new(RewardId::new(4), "Spray de Pintura", 0),
            None,
            Utc::now(),
        );

        let stats = player_stats(&progression);
        assert_eq!(stats.xp, 120);
        assert_eq!(stats.inventory_names(), vec!["Spray de Pintura".to_string()]);
    }
}
