//! Story play use cases.
//!
//! A live play session wraps the domain [`PlaySession`] with the bits only the
//! engine cares about: which steps already paid out their arrival rewards and
//! which step last received an app result.
//!
//! Every call locks the session, applies one domain transition, releases the
//! lock and then settles the resulting events:
//! - `StepLoading` resolves the step's media outside the lock and applies it
//!   under the ticket it was issued for, so a slow load for a step the player
//!   already left is discarded
//! - arrivals, discoveries, branch rewards and endings become progression
//!   writes
//!
//! App results are the exception: the session stays locked while their XP and
//! rewards are written, and the transition is only committed once the writes
//! succeed. A failed write leaves the app waiting for the same result again.
//!
//! Progression write failures surface to the caller. A story completion that
//! failed to save is retried on the next read. The interaction log is
//! best-effort.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use resistencia_domain::{
    AppHost, BranchChoice, DomainError, NarrativeStep, PlayEvent, PlaySession, PlaySessionId,
    PlayState, RewardId, StepId, StepTicket, StoryId, UserId,
};
use resistencia_shared::{AppInitMessage, AppResultMessage, ProtocolError};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::infrastructure::ports::{
    ClockPort, InteractionKind, InteractionLogRepo, InteractionRecord, RepoError, StepRepo,
    StoryRepo,
};
use crate::stores::PlaySessions;

use super::media::ResolveMedia;
use super::progression::{player_stats, ProgressionError, ProgressionOps};

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error("Play session not found: {0}")]
    SessionNotFound(PlaySessionId),
    #[error("Story not found: {0}")]
    StoryNotFound(StoryId),
    #[error("Story {0} is locked")]
    StoryLocked(StoryId),
    #[error("Invalid app result: {0}")]
    InvalidAppResult(#[from] ProtocolError),
    #[error("An app result was already applied to this step")]
    DuplicateAppResult,
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Progression(#[from] ProgressionError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct LivePlay {
    session: PlaySession,
    language: String,
    arrived: HashSet<StepId>,
    /// Step load whose own app already reported.
    answered_app: Option<StepTicket>,
}

impl LivePlay {
    fn new(session: PlaySession, language: &str) -> Self {
        Self {
            session,
            language: language.to_string(),
            arrived: HashSet::new(),
            answered_app: None,
        }
    }

    pub fn session(&self) -> &PlaySession {
        &self.session
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn step(&self, id: StepId) -> Option<NarrativeStep> {
        self.session.steps().iter().find(|s| s.id == id).cloned()
    }
}

/// A snapshot of the session after a call, with the events it produced.
#[derive(Debug, Clone)]
pub struct PlayView {
    pub session: PlaySession,
    /// Language hotspot titles are shown in.
    pub language: String,
    /// Message for the embedded app waiting on a result: the step's own or
    /// the one an interactive hotspot opened.
    pub app_init: Option<AppInitMessage>,
    pub events: Vec<PlayEvent>,
}

pub struct PlayUseCases {
    stories: Arc<dyn StoryRepo>,
    steps: Arc<dyn StepRepo>,
    media: Arc<ResolveMedia>,
    progression: Arc<ProgressionOps>,
    interactions: Arc<dyn InteractionLogRepo>,
    clock: Arc<dyn ClockPort>,
    sessions: Arc<PlaySessions>,
}

impl PlayUseCases {
    pub fn new(
        stories: Arc<dyn StoryRepo>,
        steps: Arc<dyn StepRepo>,
        media: Arc<ResolveMedia>,
        progression: Arc<ProgressionOps>,
        interactions: Arc<dyn InteractionLogRepo>,
        clock: Arc<dyn ClockPort>,
        sessions: Arc<PlaySessions>,
    ) -> Self {
        Self {
            stories,
            steps,
            media,
            progression,
            interactions,
            clock,
            sessions,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts a story at its first step and loads that step's media.
    pub async fn open(
        &self,
        user_id: UserId,
        story_id: StoryId,
        language: &str,
    ) -> Result<PlayView, PlayError> {
        let story = self
            .stories
            .get(story_id)
            .await?
            .ok_or(PlayError::StoryNotFound(story_id))?;
        let progression = self.progression.get(user_id).await?;
        if story.is_locked_for(&progression) {
            return Err(PlayError::StoryLocked(story_id));
        }

        let steps = self.steps.list_for_story(story_id).await?;
        let session = PlaySession::new(PlaySessionId::new(), user_id, story_id, steps)?;
        let id = session.id();
        let first = PlayEvent::StepLoading {
            step: session.current_step().id,
            ticket: session.ticket(),
        };
        let handle = self.sessions.insert(id, LivePlay::new(session, language));
        tracing::info!(
            session_id = %id,
            user_id = %user_id,
            story_id = %story_id,
            title = %story.title,
            "Play session opened"
        );

        let events = match self.settle(&handle, vec![first]).await {
            Ok(events) => events,
            Err(e) => {
                self.sessions.remove(&id);
                return Err(e);
            }
        };
        self.view(&handle, events).await
    }

    /// Current state. A step still loading (say, after a failed media fetch)
    /// is loaded again, and an ending that failed to save is saved again.
    pub async fn get(&self, id: PlaySessionId) -> Result<PlayView, PlayError> {
        let handle = self.handle(id)?;
        let pending = {
            let live = handle.lock().await;
            let session = &live.session;
            match session.state() {
                PlayState::Loading => vec![PlayEvent::StepLoading {
                    step: session.current_step().id,
                    ticket: session.ticket(),
                }],
                PlayState::Ended if session.completion_pending() => vec![PlayEvent::Ended {
                    story: session.story_id(),
                    next_story: session.next_story(),
                }],
                _ => Vec::new(),
            }
        };
        let events = self.settle(&handle, pending).await?;
        self.view(&handle, events).await
    }

    /// Tears the session down, dropping its scene.
    pub fn close(&self, id: PlaySessionId) -> Result<(), PlayError> {
        if !self.sessions.remove(&id) {
            return Err(PlayError::SessionNotFound(id));
        }
        tracing::info!(session_id = %id, "Play session closed");
        Ok(())
    }

    /// Drops sessions left idle for `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_idle(max_idle);
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle play sessions");
        }
        evicted
    }

    // =========================================================================
    // Gate signals
    // =========================================================================

    pub async fn geometry_loaded(
        &self,
        id: PlaySessionId,
        parts: &[String],
    ) -> Result<PlayView, PlayError> {
        self.signal(id, |session| session.scene_geometry_loaded(parts))
            .await
    }

    pub async fn scene_tick(
        &self,
        id: PlaySessionId,
        parts: &[String],
        top_hit: Option<&str>,
    ) -> Result<PlayView, PlayError> {
        self.signal(id, |session| session.scene_tick(parts, top_hit))
            .await
    }

    pub async fn activate_hotspot(
        &self,
        id: PlaySessionId,
        mesh_name: &str,
    ) -> Result<PlayView, PlayError> {
        self.signal(id, |session| session.hotspot_activated(mesh_name))
            .await
    }

    pub async fn media_ended(&self, id: PlaySessionId) -> Result<PlayView, PlayError> {
        self.signal(id, |session| Ok(session.media_ended())).await
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub async fn advance(
        &self,
        id: PlaySessionId,
        choice: &BranchChoice,
    ) -> Result<PlayView, PlayError> {
        let handle = self.handle(id)?;
        let (user_id, from, events) = {
            let mut live = handle.lock().await;
            let from = live.session.current_step().id;
            let events = live.session.advance(choice)?;
            (live.session.user_id(), from, events)
        };

        if *choice != BranchChoice::Default {
            tracing::info!(session_id = %id, step_id = %from, choice = ?choice, "Branch chosen");
            self.record(user_id, from, InteractionKind::Decision).await;
        }

        let events = self.settle(&handle, events).await?;
        self.view(&handle, events).await
    }

    /// Applies an embedded app's result message.
    ///
    /// The XP delta and the reward the app's host pays for the status are
    /// written together: a hotspot's own reward, or the reward on the branch
    /// the status selects. Rewards the message names are never granted on
    /// their own; the init message already told the app which ones its host
    /// pays.
    ///
    /// A step's app answers once per load. The transition is only committed
    /// once the write succeeds.
    pub async fn app_result(&self, id: PlaySessionId, raw: Value) -> Result<PlayView, PlayError> {
        let message = AppResultMessage::from_value(raw)?;
        let status = message.status();
        let handle = self.handle(id)?;

        let (user_id, step_id, paid, events) = {
            let mut live = handle.lock().await;
            live.session.check_app_result()?;
            let ticket = live.session.ticket();
            let step_app = matches!(live.session.app_host(), Some(AppHost::Step(_)));
            if step_app && live.answered_app == Some(ticket) {
                return Err(PlayError::DuplicateAppResult);
            }

            let mut next = live.session.clone();
            let events = next.app_completed(status)?;
            let user_id = next.user_id();
            let story_id = next.story_id();
            let step_id = live.session.current_step().id;

            tracing::info!(
                session_id = %id,
                step_id = %step_id,
                app = %message.app_name,
                status = status.as_str(),
                xp_delta = message.xp_delta(),
                reward_id = ?message.reward_id(),
                "App result received"
            );

            let (paid, rest): (Vec<_>, Vec<_>) = events.into_iter().partition(|e| {
                matches!(
                    e,
                    PlayEvent::HotspotAppRewarded { .. } | PlayEvent::BranchRewarded { .. }
                )
            });
            let rewards: Vec<RewardId> = paid
                .iter()
                .filter_map(|e| match e {
                    PlayEvent::HotspotAppRewarded { reward, .. }
                    | PlayEvent::BranchRewarded { reward } => Some(*reward),
                    _ => None,
                })
                .collect();
            self.progression
                .apply_app_result(user_id, message.xp_delta(), &rewards, Some(story_id))
                .await?;

            live.session = next;
            if step_app {
                live.answered_app = Some(ticket);
            }
            (user_id, step_id, paid, rest)
        };

        self.record(user_id, step_id, InteractionKind::AppResult)
            .await;

        let settled = self.settle(&handle, events).await?;
        self.view(&handle, paid.into_iter().chain(settled).collect())
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn handle(&self, id: PlaySessionId) -> Result<Arc<Mutex<LivePlay>>, PlayError> {
        self.sessions.get(&id).ok_or(PlayError::SessionNotFound(id))
    }

    async fn signal<F>(&self, id: PlaySessionId, f: F) -> Result<PlayView, PlayError>
    where
        F: FnOnce(&mut PlaySession) -> Result<Vec<PlayEvent>, DomainError>,
    {
        let handle = self.handle(id)?;
        let events = {
            let mut live = handle.lock().await;
            f(&mut live.session)?
        };
        let events = self.settle(&handle, events).await?;
        self.view(&handle, events).await
    }

    /// Carries out the effects of `events`, including any they lead to.
    async fn settle(
        &self,
        handle: &Arc<Mutex<LivePlay>>,
        events: Vec<PlayEvent>,
    ) -> Result<Vec<PlayEvent>, PlayError> {
        let (session_id, user_id, story_id) = {
            let live = handle.lock().await;
            (
                live.session.id(),
                live.session.user_id(),
                live.session.story_id(),
            )
        };

        let mut pending: VecDeque<PlayEvent> = events.into();
        let mut settled = Vec::with_capacity(pending.len());
        while let Some(event) = pending.pop_front() {
            match &event {
                PlayEvent::StepLoading { step, ticket } => {
                    pending.extend(self.load_step(handle, *step, *ticket).await?);
                }
                PlayEvent::StepActivated { step, gate } => {
                    tracing::debug!(session_id = %session_id, step_id = %step, gate = ?gate, "Step activated");
                    self.arrive(handle, user_id, story_id, *step).await?;
                }
                PlayEvent::StaleResultDiscarded { ticket } => {
                    tracing::debug!(session_id = %session_id, ticket = %ticket, "Discarded stale step load");
                }
                PlayEvent::HotspotDiscovered {
                    region,
                    reward,
                    character,
                    discovered,
                    total,
                } => {
                    tracing::info!(
                        session_id = %session_id,
                        region = %region,
                        discovered,
                        total,
                        "Hotspot discovered"
                    );
                    if let Some(character) = character {
                        self.progression.know_character(user_id, *character).await?;
                    }
                    if let Some(reward) = reward {
                        self.progression
                            .grant_reward(user_id, *reward, Some(story_id))
                            .await?;
                    }
                }
                PlayEvent::BranchRewarded { reward } => {
                    self.progression
                        .grant_reward(user_id, *reward, Some(story_id))
                        .await?;
                }
                PlayEvent::Ended { story, next_story } => {
                    let claimed = handle.lock().await.session.claim_completion();
                    if let Some(completed) = claimed {
                        let saved = self.progression.complete_story(user_id, completed).await;
                        let mut live = handle.lock().await;
                        match saved {
                            Ok(_) => live.session.completion_recorded(),
                            Err(e) => {
                                live.session.completion_failed();
                                return Err(e.into());
                            }
                        }
                    }
                    tracing::info!(
                        session_id = %session_id,
                        story_id = %story,
                        next_story = ?next_story,
                        "Story ended"
                    );
                }
                _ => {}
            }
            settled.push(event);
        }
        Ok(settled)
    }

    async fn load_step(
        &self,
        handle: &Arc<Mutex<LivePlay>>,
        step_id: StepId,
        ticket: StepTicket,
    ) -> Result<Vec<PlayEvent>, PlayError> {
        let Some(step) = handle.lock().await.step(step_id) else {
            tracing::warn!(step_id = %step_id, "Loading a step the story does not have");
            return Ok(Vec::new());
        };

        let media = self.media.for_step(&step).await?;

        let mut live = handle.lock().await;
        if live.session.ticket() == ticket && live.session.state() != PlayState::Loading {
            tracing::debug!(step_id = %step_id, ticket = %ticket, "Step already active, dropping duplicate load");
            return Ok(Vec::new());
        }
        Ok(live.session.activate_step(ticket, media)?)
    }

    /// Logs the arrival and, the first time per session, applies the step's
    /// character and reward.
    async fn arrive(
        &self,
        handle: &Arc<Mutex<LivePlay>>,
        user_id: UserId,
        story_id: StoryId,
        step_id: StepId,
    ) -> Result<(), PlayError> {
        let step = {
            let mut live = handle.lock().await;
            if live.arrived.insert(step_id) {
                live.step(step_id)
            } else {
                None
            }
        };
        self.record(user_id, step_id, InteractionKind::Navigation)
            .await;

        let Some(step) = step else {
            return Ok(());
        };
        if let Some(character) = step.character {
            self.progression.know_character(user_id, character).await?;
        }
        if let Some(reward) = step.reward {
            self.progression
                .grant_reward(user_id, reward, Some(story_id))
                .await?;
        }
        Ok(())
    }

    async fn record(&self, user_id: UserId, step_id: StepId, kind: InteractionKind) {
        let record = InteractionRecord {
            user_id,
            step_id,
            kind,
            at: self.clock.now(),
        };
        if let Err(e) = self.interactions.record(&record).await {
            tracing::warn!(
                user_id = %user_id,
                step_id = %step_id,
                kind = kind.as_str(),
                error = %e,
                "Failed to record interaction"
            );
        }
    }

    async fn view(
        &self,
        handle: &Arc<Mutex<LivePlay>>,
        events: Vec<PlayEvent>,
    ) -> Result<PlayView, PlayError> {
        let (session, language) = {
            let live = handle.lock().await;
            (live.session.clone(), live.language().to_string())
        };

        // Step apps are paid through their branches, so their init names no
        // rewards. Hotspot apps are told what their region pays.
        let app = match session.app_host() {
            Some(AppHost::Step(app)) => Some((app.app_data(), None, None)),
            Some(AppHost::Hotspot(region)) => Some((
                region.app_data(),
                region.success_reward.map(|r| r.as_i64()),
                region.failure_reward.map(|r| r.as_i64()),
            )),
            None => None,
        };
        let app_init = match app {
            Some((app_data, success, failure)) => {
                let progression = self.progression.get(session.user_id()).await?;
                Some(
                    AppInitMessage::new(app_data, player_stats(&progression), &language)
                        .with_rewards(success, failure),
                )
            }
            None => None,
        };

        Ok(PlayView {
            session,
            language,
            app_init,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::ports::{
        MockCharacterRepo, MockInteractionLogRepo, MockMediaRepo, MockProgressionRepo,
        MockRewardRepo, MockStepRepo, MockStoryRepo,
    };
    use mockall::predicate::eq;
    use resistencia_domain::{
        AppStatus, BranchOption, MediaKind, MediaResource, ResourceId, Reward, StepGate, StepKind,
        Story,
    };
    use resistencia_shared::AppSdk;
    use serde_json::json;

    const STORY: StoryId = StoryId::new(1);

    struct Mocks {
        stories: MockStoryRepo,
        steps: MockStepRepo,
        media: MockMediaRepo,
        progression: MockProgressionRepo,
        rewards: MockRewardRepo,
    }

    impl Mocks {
        fn new(steps: Vec<NarrativeStep>) -> Self {
            let mut stories = MockStoryRepo::new();
            stories
                .expect_get()
                .with(eq(STORY))
                .returning(|id| Ok(Some(Story::new(id, "La marcha"))));
            let mut step_repo = MockStepRepo::new();
            step_repo
                .expect_list_for_story()
                .returning(move |_| Ok(steps.clone()));
            let mut progression = MockProgressionRepo::new();
            progression.expect_get().returning(|_| Ok(None));
            let mut rewards = MockRewardRepo::new();
            rewards
                .expect_get()
                .returning(|id| Ok(Some(Reward::new(id, format!("Recompensa {}", id), 5))));
            Self {
                stories,
                steps: step_repo,
                media: MockMediaRepo::new(),
                progression,
                rewards,
            }
        }

        fn build(self) -> PlayUseCases {
            let mut interactions = MockInteractionLogRepo::new();
            interactions.expect_record().returning(|_| Ok(()));
            let clock = Arc::new(SystemClock::new());
            let progression = Arc::new(ProgressionOps::new(
                Arc::new(self.progression),
                Arc::new(self.rewards),
                Arc::new(MockCharacterRepo::new()),
                clock.clone(),
            ));
            PlayUseCases::new(
                Arc::new(self.stories),
                Arc::new(self.steps),
                Arc::new(ResolveMedia::new(Arc::new(self.media))),
                progression,
                Arc::new(interactions),
                clock,
                Arc::new(PlaySessions::new()),
            )
        }
    }

    fn step(id: i64, order: u32, kind: StepKind) -> NarrativeStep {
        NarrativeStep::new(StepId::new(id), STORY, order, kind)
    }

    #[tokio::test]
    async fn linear_story_completes_once() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
            step(2, 1, StepKind::Narrative),
        ]);
        mocks
            .progression
            .expect_save()
            .withf(|p| p.has_completed(STORY) && p.xp == 25)
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "es").await.unwrap();
        assert_eq!(view.session.state(), PlayState::StepActive);
        assert!(matches!(view.events[0], PlayEvent::StepLoading { .. }));

        let view = play
            .advance(view.session.id(), &BranchChoice::Default)
            .await
            .unwrap();
        assert_eq!(view.session.state(), PlayState::Ended);
        assert!(view
            .events
            .iter()
            .any(|e| matches!(e, PlayEvent::Ended { story, .. } if *story == STORY)));
    }

    #[tokio::test]
    async fn locked_story_cannot_be_opened() {
        let mut stories = MockStoryRepo::new();
        stories.expect_get().returning(|id| {
            Ok(Some(
                Story::new(id, "El mural").with_dependency(StoryId::new(9)),
            ))
        });
        let mut mocks = Mocks::new(vec![step(1, 0, StepKind::Narrative)]);
        mocks.stories = stories;
        let play = mocks.build();

        let result = play.open(UserId::new(), STORY, "es").await;
        assert!(matches!(result, Err(PlayError::StoryLocked(id)) if id == STORY));
    }

    #[tokio::test]
    async fn arrival_grants_step_character_and_reward() {
        let mut mocks = Mocks::new(vec![step(1, 0, StepKind::Narrative)
            .with_reward(RewardId::new(4))
            .with_next(StepId::new(2))]);
        mocks
            .progression
            .expect_save()
            .withf(|p| p.inventory.len() == 1 && p.has_visited(STORY))
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "es").await.unwrap();
        // Re-reading the session does not grant again
        play.get(view.session.id()).await.unwrap();
    }

    #[tokio::test]
    async fn hotspots_gate_and_reward_discovery() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::Narrative)
                .with_resource(ResourceId::new(7))
                .with_next(StepId::new(2)),
            step(2, 1, StepKind::Narrative).with_next(StepId::new(3)),
        ]);
        mocks.media.expect_get().returning(|id| {
            Ok(Some(
                MediaResource::new(id, MediaKind::Model3d, "casa.glb").with_metadata(
                    r#"[{"meshName":"Puerta","contentType":"image","url":"p.jpg","recompensaId":4}]"#,
                ),
            ))
        });
        mocks
            .progression
            .expect_save()
            .withf(|p| p.inventory.iter().any(|i| i.reward_id == RewardId::new(4)))
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "es").await.unwrap();
        let id = view.session.id();
        assert_eq!(view.session.gate(), StepGate::Hotspots);
        assert!(!view.session.can_advance());

        play.geometry_loaded(id, &["Puerta".to_string()])
            .await
            .unwrap();
        let view = play.activate_hotspot(id, "Puerta").await.unwrap();
        assert!(view.session.can_advance());
        assert!(view
            .events
            .iter()
            .any(|e| matches!(e, PlayEvent::GateSatisfied { .. })));
    }

    fn app_resource(id: ResourceId) -> MediaResource {
        MediaResource::new(id, MediaKind::App, "graffiti.html").with_metadata(
            r#"{"appConfig":{"timeLimit":30},"flowConfig":{"opciones_siguientes_json":[
                {"texto":"success","siguiente_paso_id":2,"recompensaId":26},
                {"texto":"failure","siguiente_paso_id":3}
            ]}}"#,
        )
    }

    fn result_message(status: &str, xp_delta: i64) -> Value {
        json!({
            "source": "ResistenciaApp",
            "appName": "GraffitiCamioneta",
            "type": "app-result",
            "status": status,
            "xpDelta": xp_delta,
            "recompensaId": 30,
            "message": "done"
        })
    }

    fn app_step_story() -> Vec<NarrativeStep> {
        vec![
            step(1, 0, StepKind::App).with_resource(ResourceId::new(5)),
            step(2, 1, StepKind::Narrative).with_next(StepId::new(3)),
            step(3, 2, StepKind::Narrative),
        ]
    }

    #[tokio::test]
    async fn app_result_applies_xp_and_branch_reward_together() {
        let mut mocks = Mocks::new(app_step_story());
        mocks
            .media
            .expect_get()
            .returning(|id| Ok(Some(app_resource(id))));
        // 150 from the app, 5 from reward 26
        mocks
            .progression
            .expect_save()
            .withf(|p| {
                p.xp == 155
                    && p.inventory.len() == 1
                    && p.inventory[0].reward_id == RewardId::new(26)
            })
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "en").await.unwrap();
        assert_eq!(view.session.gate(), StepGate::App);
        let init = view.app_init.unwrap();
        assert_eq!(init.app_data, r#"{"timeLimit":30}"#);
        assert_eq!(init.success_recompensa_id, None);
        assert_eq!(init.failure_recompensa_id, None);
        assert_eq!(init.cc, "en");

        // The reward the message names is not the host's to pay
        let view = play
            .app_result(view.session.id(), result_message("success", 150))
            .await
            .unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(2));
        assert_eq!(view.session.state(), PlayState::StepActive);
        assert!(view.app_init.is_none());
        assert!(view
            .events
            .contains(&PlayEvent::BranchRewarded { reward: RewardId::new(26) }));
    }

    #[tokio::test]
    async fn app_step_reward_is_granted_once_when_the_app_echoes_its_init() {
        let mut mocks = Mocks::new(app_step_story());
        mocks
            .media
            .expect_get()
            .returning(|id| Ok(Some(app_resource(id))));
        mocks
            .progression
            .expect_save()
            .withf(|p| {
                p.inventory.len() == 1
                    && p.inventory[0].reward_id == RewardId::new(26)
                    && p.inventory[0].quantity == 1
            })
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "es").await.unwrap();
        let mut sdk = AppSdk::new("GraffitiCamioneta");
        sdk.receive_init(view.app_init.as_ref().unwrap());
        let result = sdk.send_result(AppStatus::Success, 0, "").unwrap();

        let view = play
            .app_result(view.session.id(), serde_json::to_value(&result).unwrap())
            .await
            .unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(2));
    }

    #[tokio::test]
    async fn failed_app_result_write_leaves_the_app_waiting() {
        let mut mocks = Mocks::new(app_step_story());
        mocks
            .media
            .expect_get()
            .returning(|id| Ok(Some(app_resource(id))));
        let saved = Arc::new(AtomicUsize::new(0));
        let counter = saved.clone();
        mocks.progression.expect_save().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepoError::http("503"))
            } else {
                Ok(())
            }
        });
        let play = mocks.build();

        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();
        let result = play.app_result(id, result_message("success", 150)).await;
        assert!(matches!(result, Err(PlayError::Progression(_))));

        let view = play.get(id).await.unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(1));
        assert_eq!(view.session.gate(), StepGate::App);
        assert!(view.app_init.is_some());

        let view = play.app_result(id, result_message("success", 150)).await.unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(2));
        assert_eq!(saved.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn interactive_hotspot_runs_its_app_and_follows_the_step_branch() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::Decision)
                .with_resource(ResourceId::new(7))
                .with_branches(vec![
                    BranchOption::new("success", Some(StepId::new(2))),
                    BranchOption::new("failure", Some(StepId::new(3))),
                ]),
            step(2, 1, StepKind::Narrative).with_next(StepId::new(3)),
            step(3, 2, StepKind::Narrative),
        ]);
        mocks.media.expect_get().returning(|id| {
            Ok(Some(
                MediaResource::new(id, MediaKind::Model3d, "plaza.glb").with_metadata(
                    r#"[{"meshName":"bidek","contentType":"interactive","url":"alquiler.html",
                         "rentalAppConfig":{"bikes":3},
                         "successRecompensaId":26,"failureRecompensaId":27},
                        {"meshName":"mural","contentType":"image","url":"m.jpg"}]"#,
                ),
            ))
        });
        mocks
            .progression
            .expect_save()
            .withf(|p| {
                p.inventory.len() == 1
                    && p.inventory[0].reward_id == RewardId::new(26)
                    && p.inventory[0].quantity == 1
            })
            .times(1)
            .returning(|_| Ok(()));
        let play = mocks.build();

        let view = play.open(UserId::new(), STORY, "es").await.unwrap();
        let id = view.session.id();
        assert!(view.app_init.is_none());
        play.geometry_loaded(id, &["bidek".to_string(), "mural".to_string()])
            .await
            .unwrap();

        // No app runs until the region is activated
        let result = play.app_result(id, result_message("success", 0)).await;
        assert!(matches!(result, Err(PlayError::Domain(_))));

        let view = play.activate_hotspot(id, "bidek").await.unwrap();
        let init = view.app_init.unwrap();
        assert_eq!(init.app_data, r#"{"bikes":3}"#);
        assert_eq!(init.success_recompensa_id, Some(26));
        assert_eq!(init.failure_recompensa_id, Some(27));

        let mut sdk = AppSdk::new("AlquilerBicis");
        sdk.receive_init(&init);
        let result = sdk.send_result(AppStatus::Success, 0, "").unwrap();
        let view = play
            .app_result(id, serde_json::to_value(&result).unwrap())
            .await
            .unwrap();

        assert!(view.events.iter().any(|e| matches!(
            e,
            PlayEvent::HotspotAppRewarded { reward, .. } if *reward == RewardId::new(26)
        )));
        assert_eq!(view.session.current_step().id, StepId::new(2));
        assert!(view.app_init.is_none());
    }

    #[tokio::test]
    async fn second_app_result_for_a_step_is_rejected() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::App)
                .with_resource(ResourceId::new(5))
                .with_next(StepId::new(2)),
            step(2, 1, StepKind::Narrative),
        ]);
        mocks.media.expect_get().returning(|id| {
            Ok(Some(MediaResource::new(id, MediaKind::App, "app.html")))
        });
        mocks.progression.expect_save().returning(|_| Ok(()));
        let play = mocks.build();

        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();
        let view = play
            .app_result(id, result_message("failure", -50))
            .await
            .unwrap();
        assert!(view.session.can_advance());

        let again = play.app_result(id, result_message("failure", -50)).await;
        assert!(matches!(again, Err(PlayError::DuplicateAppResult)));
    }

    #[tokio::test]
    async fn malformed_app_result_is_rejected() {
        let play = Mocks::new(vec![step(1, 0, StepKind::Narrative)]).build();
        let result = play
            .app_result(PlaySessionId::new(), json!({"source": "Otro", "type": "app-result"}))
            .await;
        assert!(matches!(result, Err(PlayError::InvalidAppResult(_))));
    }

    #[tokio::test]
    async fn failed_step_load_is_retried_on_get() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
            step(2, 1, StepKind::Narrative)
                .with_resource(ResourceId::new(8))
                .with_next(StepId::new(3)),
        ]);
        let calls = AtomicUsize::new(0);
        mocks.media.expect_get().returning(move |id| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepoError::http("timeout"))
            } else {
                Ok(Some(MediaResource::new(id, MediaKind::Image, "foto.jpg")))
            }
        });
        let play = mocks.build();

        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();
        let result = play.advance(id, &BranchChoice::Default).await;
        assert!(matches!(result, Err(PlayError::Repo(RepoError::Http(_)))));

        let view = play.get(id).await.unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(2));
        assert_eq!(view.session.state(), PlayState::StepActive);
    }

    #[tokio::test]
    async fn failed_completion_write_is_retried_on_get() {
        let mut mocks = Mocks::new(vec![
            step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
            step(2, 1, StepKind::Narrative),
        ]);
        let saved = Arc::new(AtomicUsize::new(0));
        let counter = saved.clone();
        mocks.progression.expect_save().returning(move |p| {
            assert!(p.has_completed(STORY));
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepoError::http("503"))
            } else {
                Ok(())
            }
        });
        let play = mocks.build();

        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();
        let result = play.advance(id, &BranchChoice::Default).await;
        assert!(matches!(result, Err(PlayError::Progression(_))));

        let view = play.get(id).await.unwrap();
        assert_eq!(view.session.state(), PlayState::Ended);
        assert!(!view.session.completion_pending());
        assert_eq!(saved.load(Ordering::SeqCst), 2);

        play.get(id).await.unwrap();
        assert_eq!(saved.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closed_session_is_gone() {
        let play = Mocks::new(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))])
            .build();
        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();

        play.close(id).unwrap();
        assert!(matches!(play.get(id).await, Err(PlayError::SessionNotFound(_))));
        assert!(matches!(play.close(id), Err(PlayError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn decision_without_choice_is_a_domain_error() {
        let play = Mocks::new(vec![
            step(1, 0, StepKind::Decision).with_branches(vec![
                resistencia_domain::BranchOption::new("Quedarse", Some(StepId::new(2))),
            ]),
            step(2, 1, StepKind::Narrative).with_next(StepId::new(3)),
        ])
        .build();
        let id = play.open(UserId::new(), STORY, "es").await.unwrap().session.id();

        let result = play.advance(id, &BranchChoice::Default).await;
        assert!(matches!(result, Err(PlayError::Domain(DomainError::Constraint(_)))));

        let view = play.advance(id, &BranchChoice::Index(0)).await.unwrap();
        assert_eq!(view.session.current_step().id, StepId::new(2));
    }
}
