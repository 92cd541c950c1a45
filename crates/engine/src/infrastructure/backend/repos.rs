//! Port implementations over the PostgREST client.

use async_trait::async_trait;
use resistencia_domain::{
    Character, CharacterId, MediaResource, NarrativeStep, PlayerProgression, ResourceId, Reward,
    RewardId, Story, StoryId, UserId,
};

use super::client::BackendClient;
use super::rows::{
    CharacterRow, InteractionRow, MediaRow, ProgressionRow, RewardRow, StepRow, StoryRow,
    CHARACTER_TABLE, INTERACTION_TABLE, MEDIA_TABLE, PROGRESSION_TABLE, REWARD_TABLE,
    STEP_TABLE, STORY_TABLE,
};
use crate::infrastructure::ports::{
    CharacterRepo, InteractionLogRepo, InteractionRecord, MediaRepo, ProgressionRepo, RepoError,
    RewardRepo, StepRepo, StoryRepo,
};

pub struct BackendStoryRepo {
    client: BackendClient,
}

impl BackendStoryRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoryRepo for BackendStoryRepo {
    async fn get(&self, id: StoryId) -> Result<Option<Story>, RepoError> {
        let row: Option<StoryRow> = self
            .client
            .select_one("story_get", STORY_TABLE, &[("id_historia", id.to_string())])
            .await?;
        Ok(row.map(Story::from))
    }

    async fn list(&self) -> Result<Vec<Story>, RepoError> {
        let rows: Vec<StoryRow> = self
            .client
            .select("story_list", STORY_TABLE, &[], Some("orden.asc"))
            .await?;
        Ok(rows.into_iter().map(Story::from).collect())
    }
}

pub struct BackendStepRepo {
    client: BackendClient,
}

impl BackendStepRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepRepo for BackendStepRepo {
    async fn list_for_story(&self, story_id: StoryId) -> Result<Vec<NarrativeStep>, RepoError> {
        let rows: Vec<StepRow> = self
            .client
            .select(
                "step_list_for_story",
                STEP_TABLE,
                &[("id_historia", story_id.to_string())],
                Some("orden.asc"),
            )
            .await?;
        rows.into_iter().map(NarrativeStep::try_from).collect()
    }
}

pub struct BackendMediaRepo {
    client: BackendClient,
}

impl BackendMediaRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaRepo for BackendMediaRepo {
    async fn get(&self, id: ResourceId) -> Result<Option<MediaResource>, RepoError> {
        let row: Option<MediaRow> = self
            .client
            .select_one("media_get", MEDIA_TABLE, &[("id_recurso", id.to_string())])
            .await?;
        row.map(MediaResource::try_from).transpose()
    }
}

pub struct BackendRewardRepo {
    client: BackendClient,
}

impl BackendRewardRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RewardRepo for BackendRewardRepo {
    async fn get(&self, id: RewardId) -> Result<Option<Reward>, RepoError> {
        let row: Option<RewardRow> = self
            .client
            .select_one("reward_get", REWARD_TABLE, &[("id_recompensa", id.to_string())])
            .await?;
        Ok(row.map(Reward::from))
    }
}

pub struct BackendCharacterRepo {
    client: BackendClient,
}

impl BackendCharacterRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CharacterRepo for BackendCharacterRepo {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        let row: Option<CharacterRow> = self
            .client
            .select_one(
                "character_get",
                CHARACTER_TABLE,
                &[("id_personaje", id.to_string())],
            )
            .await?;
        Ok(row.map(Character::from))
    }
}

pub struct BackendProgressionRepo {
    client: BackendClient,
}

impl BackendProgressionRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressionRepo for BackendProgressionRepo {
    async fn get(&self, user_id: UserId) -> Result<Option<PlayerProgression>, RepoError> {
        let row: Option<ProgressionRow> = self
            .client
            .select_one(
                "progression_get",
                PROGRESSION_TABLE,
                &[("user_id", user_id.to_string())],
            )
            .await?;
        Ok(row.map(PlayerProgression::from))
    }

    async fn save(&self, progression: &PlayerProgression) -> Result<(), RepoError> {
        let row = ProgressionRow::from(progression);
        self.client
            .upsert("progression_save", PROGRESSION_TABLE, "user_id", &row)
            .await
    }
}

pub struct BackendInteractionLogRepo {
    client: BackendClient,
}

impl BackendInteractionLogRepo {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InteractionLogRepo for BackendInteractionLogRepo {
    async fn record(&self, interaction: &InteractionRecord) -> Result<(), RepoError> {
        let row = InteractionRow::from(interaction);
        self.client
            .insert("interaction_record", INTERACTION_TABLE, &row)
            .await
    }
}
