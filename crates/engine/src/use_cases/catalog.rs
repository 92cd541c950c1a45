//! Story listing with per-player lock state.

use std::sync::Arc;

use resistencia_domain::{Story, UserId};

use crate::infrastructure::ports::StoryRepo;

use super::progression::{ProgressionError, ProgressionOps};

#[derive(Debug, Clone, PartialEq)]
pub struct StoryEntry {
    pub story: Story,
    /// The story it depends on has not been visited yet.
    pub locked: bool,
    pub completed: bool,
}

pub struct StoryCatalog {
    stories: Arc<dyn StoryRepo>,
    progression: Arc<ProgressionOps>,
}

impl StoryCatalog {
    pub fn new(stories: Arc<dyn StoryRepo>, progression: Arc<ProgressionOps>) -> Self {
        Self {
            stories,
            progression,
        }
    }

    pub async fn list_for(&self, user_id: UserId) -> Result<Vec<StoryEntry>, ProgressionError> {
        let stories = self.stories.list().await?;
        let progression = self.progression.get(user_id).await?;
        Ok(stories
            .into_iter()
            .map(|story| StoryEntry {
                locked: story.is_locked_for(&progression),
                completed: progression.has_completed(story.id),
                story,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::ports::{
        MockCharacterRepo, MockProgressionRepo, MockRewardRepo, MockStoryRepo,
    };
    use resistencia_domain::{PlayerProgression, StoryId};

    #[tokio::test]
    async fn dependent_story_is_locked_until_its_dependency_is_done() {
        let user = UserId::new();
        let mut stories = MockStoryRepo::new();
        stories.expect_list().returning(|| {
            Ok(vec![
                Story::new(StoryId::new(1), "La marcha").with_order(0),
                Story::new(StoryId::new(2), "El mural")
                    .with_order(1)
                    .with_dependency(StoryId::new(1)),
                Story::new(StoryId::new(3), "La radio")
                    .with_order(2)
                    .with_dependency(StoryId::new(2)),
            ])
        });

        let mut repo = MockProgressionRepo::new();
        repo.expect_get().returning(move |_| {
            let mut p = PlayerProgression::new(user);
            p.complete_story(StoryId::new(1));
            Ok(Some(p))
        });
        let progression = Arc::new(ProgressionOps::new(
            Arc::new(repo),
            Arc::new(MockRewardRepo::new()),
            Arc::new(MockCharacterRepo::new()),
            Arc::new(SystemClock::new()),
        ));

        let catalog = StoryCatalog::new(Arc::new(stories), progression);
        let entries = catalog.list_for(user).await.unwrap();

        let flags: Vec<(bool, bool)> = entries.iter().map(|e| (e.locked, e.completed)).collect();
        assert_eq!(flags, vec![(false, true), (false, false), (true, false)]);
    }
}
