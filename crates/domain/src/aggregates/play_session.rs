//! Play session - one player's pass through one story
//!
//! ```text
//! Loading --activate_step--> StepActive | AdvanceBlocked | Ended
//! AdvanceBlocked --gate satisfied--> StepActive | Ended
//! StepActive --advance--> Loading (next step) | Ended
//! ```
//!
//! Loading a step's media happens outside the session. Each load is issued a
//! [`StepTicket`]; a result carrying an older ticket belongs to a step the
//! player already left and is discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::{PlayEvent, SceneEvent};
use crate::value_objects::{
    AppStatus, AppStepConfig, HotspotContentType, HotspotRegion, HotspotRegistry, MeshName,
};
use crate::{
    BranchChoice, BranchOption, DomainError, MediaKind, MediaResource, NarrativeStep,
    PlaySessionId, StepId, StepKind, StoryId, UserId,
};

use super::HotspotScene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Loading,
    StepActive,
    AdvanceBlocked,
    Ended,
}

/// What must happen before the active step lets the player advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepGate {
    Open,
    /// Every configured hotspot must be discovered.
    Hotspots,
    /// Video or audio must play to the end.
    Playback,
    /// An embedded app must report its result.
    App,
}

/// Generation token for a step load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepTicket(u64);

impl StepTicket {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionRecord {
    Pending,
    /// Handed out; the write has not been confirmed yet.
    Claimed,
    Recorded,
}

/// Where the embedded app the player is running lives.
#[derive(Debug, Clone, Copy)]
pub enum AppHost<'a> {
    /// The step itself is an app.
    Step(&'a AppStepConfig),
    /// An interactive hotspot opened an app over the scene.
    Hotspot(&'a HotspotRegion),
}

/// A step's resolved media, ready to be applied to the session.
#[derive(Debug, Clone, Default)]
pub struct StepMedia {
    resource: Option<MediaResource>,
    scene: Option<HotspotScene>,
    app: Option<AppStepConfig>,
}

impl StepMedia {
    /// No media: the step is ungated.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds the scene or app config a resource calls for.
    ///
    /// Bad metadata degrades instead of failing: a 3D model gets a scene with
    /// no regions and an app gets no branches. The parse error is returned
    /// alongside so the caller can report it.
    pub fn resolve(
        resource: Option<MediaResource>,
        step_kind: StepKind,
    ) -> (Self, Option<DomainError>) {
        let Some(resource) = resource else {
            return (Self::none(), None);
        };
        let mut degraded = None;
        let mut media = Self::default();

        if resource.kind == MediaKind::Model3d {
            let registry = match resource.metadata() {
                Some(raw) if !raw.trim().is_empty() => HotspotRegistry::parse(raw)
                    .unwrap_or_else(|e| {
                        degraded = Some(e);
                        HotspotRegistry::empty()
                    }),
                _ => HotspotRegistry::empty(),
            };
            media.scene = Some(HotspotScene::new(registry));
        }

        if step_kind == StepKind::App || resource.kind == MediaKind::App {
            let config = match resource.metadata() {
                Some(raw) if !raw.trim().is_empty() => {
                    AppStepConfig::parse(raw).unwrap_or_else(|e| {
                        degraded = Some(e);
                        AppStepConfig::default()
                    })
                }
                _ => AppStepConfig::default(),
            };
            media.app = Some(config);
        }

        media.resource = Some(resource);
        (media, degraded)
    }

    pub fn resource(&self) -> Option<&MediaResource> {
        self.resource.as_ref()
    }

    pub fn scene(&self) -> Option<&HotspotScene> {
        self.scene.as_ref()
    }

    pub fn app(&self) -> Option<&AppStepConfig> {
        self.app.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct PlaySession {
    id: PlaySessionId,
    user_id: UserId,
    story_id: StoryId,
    steps: Vec<NarrativeStep>,
    current: usize,
    state: PlayState,
    ticket: StepTicket,
    gate: StepGate,
    media: StepMedia,
    next_story: Option<StoryId>,
    completion: Option<CompletionRecord>,
    /// Interactive region whose app is open.
    open_app: Option<MeshName>,
}

impl PlaySession {
    /// Starts a session at the lowest-ordered step, waiting for its media.
    pub fn new(
        id: PlaySessionId,
        user_id: UserId,
        story_id: StoryId,
        mut steps: Vec<NarrativeStep>,
    ) -> Result<Self, DomainError> {
        if steps.is_empty() {
            return Err(DomainError::validation(format!(
                "story {} has no steps",
                story_id
            )));
        }
        steps.sort_by_key(|s| s.order);
        Ok(Self {
            id,
            user_id,
            story_id,
            steps,
            current: 0,
            state: PlayState::Loading,
            ticket: StepTicket::new(1),
            gate: StepGate::Open,
            media: StepMedia::none(),
            next_story: None,
            completion: None,
            open_app: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> PlaySessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn story_id(&self) -> StoryId {
        self.story_id
    }

    pub fn steps(&self) -> &[NarrativeStep] {
        &self.steps
    }

    pub fn current_step(&self) -> &NarrativeStep {
        &self.steps[self.current]
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn ticket(&self) -> StepTicket {
        self.ticket
    }

    pub fn gate(&self) -> StepGate {
        self.gate
    }

    pub fn media(&self) -> &StepMedia {
        &self.media
    }

    pub fn scene(&self) -> Option<&HotspotScene> {
        self.media.scene.as_ref()
    }

    pub fn can_advance(&self) -> bool {
        self.state == PlayState::StepActive
    }

    /// Story an ending step points to, once the session has ended.
    /// The app waiting for a result, if any. An open hotspot app takes
    /// precedence over the step's own.
    pub fn app_host(&self) -> Option<AppHost<'_>> {
        if matches!(self.state, PlayState::Loading | PlayState::Ended) {
            return None;
        }
        let hotspot = self.open_app.as_ref().and_then(|name| {
            self.media
                .scene
                .as_ref()
                .and_then(|scene| scene.region(name.as_str()))
        });
        match hotspot {
            Some(region) => Some(AppHost::Hotspot(region)),
            None => self.media.app.as_ref().map(AppHost::Step),
        }
    }

    pub fn next_story(&self) -> Option<StoryId> {
        self.next_story
    }

    pub fn hotspot_progress(&self) -> Option<(usize, usize)> {
        self.scene()
            .map(|scene| (scene.discovered_count(), scene.total_regions()))
    }

    // =========================================================================
    // Step lifecycle
    // =========================================================================

    /// Applies resolved media for the step `ticket` was issued for.
    pub fn activate_step(
        &mut self,
        ticket: StepTicket,
        media: StepMedia,
    ) -> Result<Vec<PlayEvent>, DomainError> {
        if ticket != self.ticket {
            return Ok(vec![PlayEvent::StaleResultDiscarded { ticket }]);
        }
        if self.state != PlayState::Loading {
            return Err(DomainError::invalid_state_transition(format!(
                "step {} is already active",
                self.current_step().id
            )));
        }

        let gate = Self::gate_for(self.current_step(), &media);
        self.gate = gate;
        self.media = media;
        let step = self.current_step().id;
        let mut events = vec![PlayEvent::StepActivated {
            step,
            gate: self.gate,
        }];

        if self.gate == StepGate::Open {
            if self.current_step().is_terminal() {
                events.push(self.end());
            } else {
                self.state = PlayState::StepActive;
            }
        } else {
            self.state = PlayState::AdvanceBlocked;
        }
        Ok(events)
    }

    /// Moves on from the active step.
    pub fn advance(&mut self, choice: &BranchChoice) -> Result<Vec<PlayEvent>, DomainError> {
        match self.state {
            PlayState::StepActive => {}
            PlayState::AdvanceBlocked => {
                return Err(DomainError::invalid_state_transition(format!(
                    "step {} is waiting on {:?}",
                    self.current_step().id,
                    self.gate
                )))
            }
            other => {
                return Err(DomainError::invalid_state_transition(format!(
                    "cannot advance while {:?}",
                    other
                )))
            }
        }

        let step = self.current_step();
        if step.kind == StepKind::Ending {
            return Ok(vec![self.end()]);
        }

        let (next, reward) = match choice {
            BranchChoice::Default => {
                if step.default_next.is_none() && step.is_decision() {
                    return Err(DomainError::constraint(format!(
                        "decision step {} needs a branch choice",
                        step.id
                    )));
                }
                (step.default_next, None)
            }
            _ => {
                match choice.select(self.branches()) {
                    Some(b) => (b.next, b.reward),
                    None => {
                        return Err(DomainError::constraint(format!(
                            "step {} has no branch for {:?}",
                            step.id, choice
                        )))
                    }
                }
            }
        };

        let mut events = Vec::new();
        if let Some(reward) = reward {
            events.push(PlayEvent::BranchRewarded { reward });
        }
        events.extend(self.follow(next));
        Ok(events)
    }

    // =========================================================================
    // Gate signals
    // =========================================================================

    /// Polling tick forwarded to the 3D scene.
    pub fn scene_tick<S: AsRef<str>>(
        &mut self,
        geometry: &[S],
        top_hit: Option<&str>,
    ) -> Result<Vec<PlayEvent>, DomainError> {
        let scene = self.scene_mut()?;
        Ok(wrap_scene(scene.tick(geometry, top_hit)))
    }

    /// Load completion forwarded to the 3D scene.
    pub fn scene_geometry_loaded<S: AsRef<str>>(
        &mut self,
        geometry: &[S],
    ) -> Result<Vec<PlayEvent>, DomainError> {
        let scene = self.scene_mut()?;
        Ok(wrap_scene(scene.geometry_loaded(geometry)))
    }

    /// Explicit activation of the current top hit in the 3D scene.
    pub fn hotspot_activated(&mut self, top_hit: &str) -> Result<Vec<PlayEvent>, DomainError> {
        let scene = self.scene_mut()?;
        let scene_events = scene.activate(top_hit);
        let discovered = scene.discovered_count();
        let total = scene.total_regions();
        let complete = scene.all_discovered();

        let mut events = Vec::new();
        for event in scene_events {
            if let SceneEvent::Activated {
                region,
                content_type,
                ..
            } = &event
            {
                self.open_app = match content_type {
                    HotspotContentType::Interactive => Some(region.clone()),
                    _ => None,
                };
            }
            if let SceneEvent::Discovered {
                region,
                reward,
                character,
            } = &event
            {
                events.push(PlayEvent::HotspotDiscovered {
                    region: region.clone(),
                    reward: *reward,
                    character: *character,
                    discovered,
                    total,
                });
            }
            events.push(PlayEvent::Scene { event });
        }

        if self.gate == StepGate::Hotspots && complete {
            events.extend(self.satisfy_gate());
        }
        Ok(events)
    }

    /// Video or audio playback reached its end.
    pub fn media_ended(&mut self) -> Vec<PlayEvent> {
        if self.gate == StepGate::Playback {
            self.satisfy_gate()
        } else {
            Vec::new()
        }
    }

    /// Fails unless an app is waiting for a result.
    pub fn check_app_result(&self) -> Result<(), DomainError> {
        if matches!(self.state, PlayState::Loading | PlayState::Ended) {
            return Err(DomainError::invalid_state_transition(format!(
                "no active step to receive an app result while {:?}",
                self.state
            )));
        }
        if self.app_host().is_none() {
            return Err(DomainError::invalid_state_transition(format!(
                "step {} has no embedded app running",
                self.current_step().id
            )));
        }
        Ok(())
    }

    /// An embedded app reported its result.
    ///
    /// A step app opens its gate and follows the app config branch labelled
    /// with the status. A hotspot app closes, pays the region's reward for the
    /// status and follows the step's own branch with that label.
    pub fn app_completed(&mut self, status: AppStatus) -> Result<Vec<PlayEvent>, DomainError> {
        self.check_app_result()?;
        let label = BranchChoice::Label(status.as_str().to_string());

        let hotspot = match self.app_host() {
            Some(AppHost::Hotspot(region)) => {
                Some((region.name.clone(), region.reward_for(status)))
            }
            _ => None,
        };

        let mut events = Vec::new();
        let branch = match hotspot {
            Some((region, reward)) => {
                if let Some(reward) = reward {
                    events.push(PlayEvent::HotspotAppRewarded { region, reward });
                }
                self.open_app = None;
                label.select(&self.current_step().branches).cloned()
            }
            None => {
                let branch = label.select(self.branches()).cloned();
                if self.gate == StepGate::App {
                    events.extend(self.satisfy_gate());
                }
                branch
            }
        };
        if self.state == PlayState::Ended {
            return Ok(events);
        }
        if let Some(branch) = branch {
            if let Some(reward) = branch.reward {
                events.push(PlayEvent::BranchRewarded { reward });
            }
            events.extend(self.follow(branch.next));
        }
        Ok(events)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// The story to record as completed, claimed once after the session ends.
    ///
    /// The claim stays open until [`Self::completion_recorded`] confirms the
    /// write or [`Self::completion_failed`] hands it back for a retry.
    pub fn claim_completion(&mut self) -> Option<StoryId> {
        match self.completion {
            Some(CompletionRecord::Pending) => {
                self.completion = Some(CompletionRecord::Claimed);
                Some(self.story_id)
            }
            _ => None,
        }
    }

    pub fn completion_recorded(&mut self) {
        if self.completion == Some(CompletionRecord::Claimed) {
            self.completion = Some(CompletionRecord::Recorded);
        }
    }

    pub fn completion_failed(&mut self) {
        if self.completion == Some(CompletionRecord::Claimed) {
            self.completion = Some(CompletionRecord::Pending);
        }
    }

    /// True while the ended story still has to be recorded.
    pub fn completion_pending(&self) -> bool {
        self.completion == Some(CompletionRecord::Pending)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn gate_for(step: &NarrativeStep, media: &StepMedia) -> StepGate {
        if step.kind == StepKind::App && media.app.is_some() {
            return StepGate::App;
        }
        if let Some(scene) = &media.scene {
            if scene.total_regions() > 0 {
                return StepGate::Hotspots;
            }
        }
        match &media.resource {
            Some(resource) if resource.kind.is_timed() => StepGate::Playback,
            _ => StepGate::Open,
        }
    }

    /// Branches of the active step. App steps take theirs from the app config.
    fn branches(&self) -> &[BranchOption] {
        match self.media.app.as_ref() {
            Some(app) if self.current_step().kind == StepKind::App => app.branches(),
            _ => &self.current_step().branches,
        }
    }

    fn scene_mut(&mut self) -> Result<&mut HotspotScene, DomainError> {
        if matches!(self.state, PlayState::Loading | PlayState::Ended) {
            return Err(DomainError::invalid_state_transition(format!(
                "no active scene while {:?}",
                self.state
            )));
        }
        let step = self.steps[self.current].id;
        self.media.scene.as_mut().ok_or_else(|| {
            DomainError::invalid_state_transition(format!("step {} has no 3D scene", step))
        })
    }

    fn satisfy_gate(&mut self) -> Vec<PlayEvent> {
        if self.state != PlayState::AdvanceBlocked {
            return Vec::new();
        }
        let step = self.current_step().id;
        let mut events = vec![PlayEvent::GateSatisfied { step }];
        if self.current_step().is_terminal() {
            events.push(self.end());
        } else {
            self.state = PlayState::StepActive;
        }
        events
    }

    /// Loads `next`, or ends the story if it is missing or unknown.
    fn follow(&mut self, next: Option<StepId>) -> Vec<PlayEvent> {
        let index = next.and_then(|id| self.steps.iter().position(|s| s.id == id));
        let Some(index) = index else {
            return vec![self.end()];
        };
        let from = self.current_step().id;
        self.current = index;
        self.state = PlayState::Loading;
        self.ticket = self.ticket.next();
        self.gate = StepGate::Open;
        self.media = StepMedia::none();
        self.open_app = None;
        let to = self.current_step().id;
        vec![
            PlayEvent::Advanced { from, to },
            PlayEvent::StepLoading {
                step: to,
                ticket: self.ticket,
            },
        ]
    }

    fn end(&mut self) -> PlayEvent {
        let step = self.current_step();
        let next_story = match step.kind {
            StepKind::Ending => step.default_next.map(|id| StoryId::new(id.as_i64())),
            _ => None,
        };
        self.next_story = next_story;
        self.state = PlayState::Ended;
        if self.completion.is_none() {
            self.completion = Some(CompletionRecord::Pending);
        }
        PlayEvent::Ended {
            story: self.story_id,
            next_story: self.next_story,
        }
    }
}

fn wrap_scene(events: Vec<SceneEvent>) -> Vec<PlayEvent> {
    events
        .into_iter()
        .map(|event| PlayEvent::Scene { event })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceId, RewardId};

    const STORY: StoryId = StoryId::new(10);

    fn step(id: i64, order: u32, kind: StepKind) -> NarrativeStep {
        NarrativeStep::new(StepId::new(id), STORY, order, kind)
    }

    fn session(steps: Vec<NarrativeStep>) -> PlaySession {
        PlaySession::new(PlaySessionId::new(), UserId::new(), STORY, steps).unwrap()
    }

    fn activate(s: &mut PlaySession, resource: Option<MediaResource>) -> Vec<PlayEvent> {
        let kind = s.current_step().kind;
        let (media, _) = StepMedia::resolve(resource, kind);
        s.activate_step(s.ticket(), media).unwrap()
    }

    fn model(metadata: &str) -> MediaResource {
        MediaResource::new(ResourceId::new(1), MediaKind::Model3d, "scene.glb")
            .with_metadata(metadata)
    }

    const TWO_HOTSPOTS: &str = r#"[
        {"meshName":"A","contentType":"image","url":"a.jpg","recompensaId":4},
        {"meshName":"B","contentType":"video","url":"b.mp4"}
    ]"#;

    mod lifecycle {
        use super::*;

        #[test]
        fn empty_story_is_rejected() {
            let result = PlaySession::new(PlaySessionId::new(), UserId::new(), STORY, vec![]);
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }

        #[test]
        fn starts_at_lowest_order() {
            let s = session(vec![
                step(2, 1, StepKind::Narrative),
                step(1, 0, StepKind::Narrative),
            ]);
            assert_eq!(s.current_step().id, StepId::new(1));
            assert_eq!(s.state(), PlayState::Loading);
        }

        #[test]
        fn linear_story_ends_and_completes_once() {
            let mut s = session(vec![
                step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
                step(2, 1, StepKind::Narrative),
            ]);
            activate(&mut s, None);
            assert_eq!(s.state(), PlayState::StepActive);

            let events = s.advance(&BranchChoice::Default).unwrap();
            assert!(events.contains(&PlayEvent::Advanced {
                from: StepId::new(1),
                to: StepId::new(2)
            }));
            assert_eq!(s.state(), PlayState::Loading);

            let events = activate(&mut s, None);
            assert!(events.contains(&PlayEvent::Ended {
                story: STORY,
                next_story: None
            }));
            assert_eq!(s.claim_completion(), Some(STORY));
            assert_eq!(s.claim_completion(), None);
            s.completion_recorded();
            assert!(!s.completion_pending());
        }

        #[test]
        fn failed_completion_write_can_be_claimed_again() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative)]);
            activate(&mut s, None);
            assert!(s.completion_pending());

            assert_eq!(s.claim_completion(), Some(STORY));
            assert!(!s.completion_pending());
            s.completion_failed();
            assert!(s.completion_pending());

            assert_eq!(s.claim_completion(), Some(STORY));
            s.completion_recorded();
            s.completion_failed();
            assert_eq!(s.claim_completion(), None);
        }

        #[test]
        fn ending_step_names_next_story() {
            let mut s = session(vec![step(1, 0, StepKind::Ending).with_next(StepId::new(77))]);
            activate(&mut s, None);
            assert_eq!(s.state(), PlayState::Ended);
            assert_eq!(s.next_story(), Some(StoryId::new(77)));
        }

        #[test]
        fn unknown_next_step_ends_the_story() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(99))]);
            activate(&mut s, None);
            s.advance(&BranchChoice::Default).unwrap();
            assert_eq!(s.state(), PlayState::Ended);
        }

        #[test]
        fn stale_ticket_is_discarded() {
            let mut s = session(vec![
                step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
                step(2, 1, StepKind::Narrative).with_next(StepId::new(3)),
                step(3, 2, StepKind::Narrative),
            ]);
            let old = s.ticket();
            activate(&mut s, None);
            s.advance(&BranchChoice::Default).unwrap();

            let events = s.activate_step(old, StepMedia::none()).unwrap();
            assert_eq!(events, vec![PlayEvent::StaleResultDiscarded { ticket: old }]);
            assert_eq!(s.state(), PlayState::Loading);
            assert_eq!(s.current_step().id, StepId::new(2));
        }

        #[test]
        fn activating_twice_is_invalid() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))]);
            activate(&mut s, None);
            assert!(s.activate_step(s.ticket(), StepMedia::none()).is_err());
        }
    }

    mod gates {
        use super::*;

        #[test]
        fn hotspots_block_until_all_are_discovered() {
            let mut s = session(vec![
                step(1, 0, StepKind::Narrative).with_next(StepId::new(2)),
                step(2, 1, StepKind::Narrative),
            ]);
            activate(&mut s, Some(model(TWO_HOTSPOTS)));
            assert_eq!(s.gate(), StepGate::Hotspots);
            assert_eq!(s.state(), PlayState::AdvanceBlocked);
            assert!(s.advance(&BranchChoice::Default).is_err());

            s.scene_tick(&["A", "B"], None).unwrap();
            let events = s.hotspot_activated("A").unwrap();
            assert!(events.contains(&PlayEvent::HotspotDiscovered {
                region: "A".into(),
                reward: Some(RewardId::new(4)),
                character: None,
                discovered: 1,
                total: 2,
            }));
            assert!(!s.can_advance());

            // Re-activation never counts twice
            s.hotspot_activated("A").unwrap();
            assert_eq!(s.hotspot_progress(), Some((1, 2)));

            let events = s.hotspot_activated("B").unwrap();
            assert!(events.contains(&PlayEvent::GateSatisfied { step: StepId::new(1) }));
            assert!(s.can_advance());
        }

        #[test]
        fn malformed_hotspots_leave_step_ungated() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))]);
            let (media, degraded) =
                StepMedia::resolve(Some(model("{broken")), StepKind::Narrative);
            assert!(matches!(degraded, Some(DomainError::Parse(_))));

            s.activate_step(s.ticket(), media).unwrap();
            assert_eq!(s.gate(), StepGate::Open);
            assert!(s.can_advance());
        }

        #[test]
        fn timed_media_waits_for_playback_end() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))]);
            let video = MediaResource::new(ResourceId::new(3), MediaKind::Video, "v.mp4");
            activate(&mut s, Some(video));
            assert_eq!(s.state(), PlayState::AdvanceBlocked);

            s.media_ended();
            assert!(s.can_advance());
            assert!(s.media_ended().is_empty());
        }

        #[test]
        fn gated_terminal_step_ends_when_satisfied() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative)]);
            let audio = MediaResource::new(ResourceId::new(3), MediaKind::Audio, "a.mp3");
            activate(&mut s, Some(audio));
            assert_eq!(s.state(), PlayState::AdvanceBlocked);

            let events = s.media_ended();
            assert!(matches!(events.last(), Some(PlayEvent::Ended { .. })));
            assert_eq!(s.claim_completion(), Some(STORY));
        }

        #[test]
        fn scene_calls_without_a_scene_are_invalid() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))]);
            assert!(s.hotspot_activated("A").is_err());
            activate(&mut s, None);
            assert!(s.hotspot_activated("A").is_err());
        }
    }

    mod branching {
        use super::*;

        fn decision() -> Vec<NarrativeStep> {
            vec![
                step(1, 0, StepKind::Decision).with_branches(vec![
                    BranchOption::new("Quedarse", Some(StepId::new(2))),
                    BranchOption::new("Huir", Some(StepId::new(3))).with_reward(RewardId::new(8)),
                ]),
                step(2, 1, StepKind::Narrative),
                step(3, 2, StepKind::Narrative),
            ]
        }

        #[test]
        fn follows_branch_by_index_and_label() {
            let mut s = session(decision());
            activate(&mut s, None);
            s.advance(&BranchChoice::Index(0)).unwrap();
            assert_eq!(s.current_step().id, StepId::new(2));

            let mut s = session(decision());
            activate(&mut s, None);
            let events = s.advance(&BranchChoice::Label("Huir".into())).unwrap();
            assert_eq!(events[0], PlayEvent::BranchRewarded { reward: RewardId::new(8) });
            assert_eq!(s.current_step().id, StepId::new(3));
        }

        #[test]
        fn missing_branch_is_a_configuration_error() {
            let mut s = session(decision());
            activate(&mut s, None);
            assert!(matches!(
                s.advance(&BranchChoice::Index(5)),
                Err(DomainError::Constraint(_))
            ));
            assert!(matches!(
                s.advance(&BranchChoice::Default),
                Err(DomainError::Constraint(_))
            ));
            assert_eq!(s.state(), PlayState::StepActive);
        }

        #[test]
        fn app_result_follows_status_branch() {
            let metadata = r#"{"appConfig":{},"flowConfig":{"opciones_siguientes_json":[
                {"texto":"success","siguiente_paso_id":2,"recompensaId":26},
                {"texto":"failure","siguiente_paso_id":3}
            ]}}"#;
            let app = MediaResource::new(ResourceId::new(5), MediaKind::App, "app.html")
                .with_metadata(metadata);
            let mut s = session(vec![
                step(1, 0, StepKind::App),
                step(2, 1, StepKind::Narrative),
                step(3, 2, StepKind::Narrative),
            ]);
            activate(&mut s, Some(app));
            assert_eq!(s.gate(), StepGate::App);
            assert!(s.advance(&BranchChoice::Default).is_err());

            let events = s.app_completed(AppStatus::Success).unwrap();
            assert!(events.contains(&PlayEvent::BranchRewarded { reward: RewardId::new(26) }));
            assert_eq!(s.current_step().id, StepId::new(2));
            assert_eq!(s.state(), PlayState::Loading);
        }

        #[test]
        fn app_result_needs_a_running_app() {
            let mut s = session(vec![step(1, 0, StepKind::Narrative).with_next(StepId::new(2))]);
            activate(&mut s, None);
            assert!(matches!(
                s.app_completed(AppStatus::Success),
                Err(DomainError::InvalidStateTransition(_))
            ));
        }

        #[test]
        fn interactive_hotspot_app_pays_region_reward_and_follows_step_branch() {
            let hotspots = r#"[
                {"meshName":"bidek","contentType":"interactive","url":"alquiler.html",
                 "rentalAppConfig":{"bikes":3},"successRecompensaId":26},
                {"meshName":"A","contentType":"image","url":"a.jpg"}
            ]"#;
            let mut s = session(vec![
                step(1, 0, StepKind::Decision).with_branches(vec![
                    BranchOption::new("success", Some(StepId::new(2))),
                    BranchOption::new("failure", Some(StepId::new(3))),
                ]),
                step(2, 1, StepKind::Narrative),
                step(3, 2, StepKind::Narrative),
            ]);
            activate(&mut s, Some(model(hotspots)));
            s.scene_geometry_loaded(&["bidek", "A"]).unwrap();
            assert!(s.app_host().is_none());

            // A non-interactive region opens no app
            s.hotspot_activated("A").unwrap();
            assert!(s.app_host().is_none());

            s.hotspot_activated("bidek").unwrap();
            match s.app_host() {
                Some(AppHost::Hotspot(region)) => assert_eq!(region.app_data(), r#"{"bikes":3}"#),
                other => panic!("expected a hotspot app, got {:?}", other),
            }

            let events = s.app_completed(AppStatus::Success).unwrap();
            assert_eq!(
                events[0],
                PlayEvent::HotspotAppRewarded {
                    region: "bidek".into(),
                    reward: RewardId::new(26)
                }
            );
            assert!(!events
                .iter()
                .any(|e| matches!(e, PlayEvent::BranchRewarded { .. })));
            assert_eq!(s.current_step().id, StepId::new(2));
            assert!(s.app_host().is_none());
        }

        #[test]
        fn app_result_without_branch_just_opens_the_gate() {
            let app = MediaResource::new(ResourceId::new(5), MediaKind::App, "app.html");
            let mut s = session(vec![
                step(1, 0, StepKind::App).with_next(StepId::new(2)),
                step(2, 1, StepKind::Narrative),
            ]);
            activate(&mut s, Some(app));
            s.app_completed(AppStatus::Failure).unwrap();
            assert!(s.can_advance());
            s.advance(&BranchChoice::Default).unwrap();
            assert_eq!(s.current_step().id, StepId::new(2));
        }
    }
}
