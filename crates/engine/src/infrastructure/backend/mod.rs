//! Hosted row store adapter (PostgREST dialect).

mod client;
mod repos;
mod rows;

use std::sync::Arc;

pub use client::BackendClient;
pub use repos::{
    BackendCharacterRepo, BackendInteractionLogRepo, BackendMediaRepo, BackendProgressionRepo,
    BackendRewardRepo, BackendStepRepo, BackendStoryRepo,
};

/// Every repository the engine needs, sharing one HTTP client.
pub struct BackendRepositories {
    pub story: Arc<BackendStoryRepo>,
    pub step: Arc<BackendStepRepo>,
    pub media: Arc<BackendMediaRepo>,
    pub reward: Arc<BackendRewardRepo>,
    pub character: Arc<BackendCharacterRepo>,
    pub progression: Arc<BackendProgressionRepo>,
    pub interaction: Arc<BackendInteractionLogRepo>,
}

impl BackendRepositories {
    pub fn new(client: BackendClient) -> Self {
        Self {
            story: Arc::new(BackendStoryRepo::new(client.clone())),
            step: Arc::new(BackendStepRepo::new(client.clone())),
            media: Arc::new(BackendMediaRepo::new(client.clone())),
            reward: Arc::new(BackendRewardRepo::new(client.clone())),
            character: Arc::new(BackendCharacterRepo::new(client.clone())),
            progression: Arc::new(BackendProgressionRepo::new(client.clone())),
            interaction: Arc::new(BackendInteractionLogRepo::new(client)),
        }
    }
}
