//! Application state and composition.

use std::sync::Arc;

use resistencia_domain::PaintRules;

use crate::infrastructure::{
    backend::BackendRepositories,
    ports::{
        CharacterRepo, ClockPort, InteractionLogRepo, MediaRepo, ProgressionRepo, RewardRepo,
        StepRepo, StoryRepo,
    },
};
use crate::stores::{PaintSessions, PlaySessions};
use crate::use_cases::{
    PaintUseCases, PlayUseCases, ProgressionOps, ResolveMedia, StoryCatalog,
};

/// Main application state.
///
/// Holds all use cases. Live sessions are owned by their use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
}

/// Port traits the use cases are built from.
pub struct Repositories {
    pub story: Arc<dyn StoryRepo>,
    pub step: Arc<dyn StepRepo>,
    pub media: Arc<dyn MediaRepo>,
    pub reward: Arc<dyn RewardRepo>,
    pub character: Arc<dyn CharacterRepo>,
    pub progression: Arc<dyn ProgressionRepo>,
    pub interaction: Arc<dyn InteractionLogRepo>,
}

impl From<BackendRepositories> for Repositories {
    fn from(repos: BackendRepositories) -> Self {
        Self {
            story: repos.story,
            step: repos.step,
            media: repos.media,
            reward: repos.reward,
            character: repos.character,
            progression: repos.progression,
            interaction: repos.interaction,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub catalog: Arc<StoryCatalog>,
    pub progression: Arc<ProgressionOps>,
    pub play: Arc<PlayUseCases>,
    pub paint: Arc<PaintUseCases>,
}

impl App {
    pub fn new(repos: Repositories, paint_rules: PaintRules, clock: Arc<dyn ClockPort>) -> Self {
        let progression = Arc::new(ProgressionOps::new(
            repos.progression,
            repos.reward,
            repos.character,
            clock.clone(),
        ));
        let media = Arc::new(ResolveMedia::new(repos.media));

        let catalog = Arc::new(StoryCatalog::new(repos.story.clone(), progression.clone()));
        let play = Arc::new(PlayUseCases::new(
            repos.story,
            repos.step,
            media,
            progression.clone(),
            repos.interaction,
            clock,
            Arc::new(PlaySessions::new()),
        ));
        let paint = Arc::new(PaintUseCases::new(
            progression.clone(),
            Arc::new(PaintSessions::new()),
            paint_rules,
        ));

        Self {
            use_cases: UseCases {
                catalog,
                progression,
                play,
                paint,
            },
        }
    }
}
