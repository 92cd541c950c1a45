//! Paint minigame use cases.
//!
//! The engine hosts the graffiti minigame as an embedded app would: it is
//! initialised from the player's stats, checks the inventory before the first
//! stroke and reports its one result through the app SDK. That result is not
//! applied here; the client forwards it to the story session's app-result
//! endpoint like any other app's.
//!
//! Buying paint is the one write: the spray can's XP cost is spent from the
//! player's progression before the paint is added.

use std::sync::Arc;
use std::time::Duration;

use resistencia_domain::{
    BrushSize, DomainError, PaintColor, PaintEvent, PaintRules, PaintSession, PaintSessionId,
    PaintStatus, ProgressionUpdate, SurfaceHit, UserId,
};
use resistencia_shared::{AppInitMessage, AppResultMessage, AppSdk, PointerPhase, SdkError};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::infrastructure::snapshot::{export_snapshot, SnapshotError};
use crate::stores::PaintSessions;

use super::progression::{player_stats, ProgressionError, ProgressionOps};

/// Name the minigame reports its result under.
pub const PAINT_APP_NAME: &str = "GraffitiCamioneta";

#[derive(Debug, thiserror::Error)]
pub enum PaintError {
    #[error("Paint session not found: {0}")]
    SessionNotFound(PaintSessionId),
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Progression(#[from] ProgressionError),
    #[error("App SDK error: {0}")]
    Sdk(#[from] SdkError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub struct LivePaint {
    session: PaintSession,
    sdk: AppSdk,
    result: Option<AppResultMessage>,
}

impl LivePaint {
    /// Moves a decided outcome into a result message, once.
    fn collect_result(&mut self) -> Result<(), PaintError> {
        let Some(outcome) = self.session.take_result() else {
            return Ok(());
        };
        let message = self
            .sdk
            .send_result(outcome.status, outcome.xp_delta, &outcome.message)?;
        tracing::info!(
            session_id = %self.session.id(),
            status = outcome.status.as_str(),
            xp_delta = outcome.xp_delta,
            painted_pixels = self.session.canvas().painted_pixels(),
            "Paint round finished"
        );
        self.result = Some(message);
        Ok(())
    }

    fn view(&self, events: Vec<PaintEvent>) -> PaintView {
        let session = &self.session;
        PaintView {
            id: session.id(),
            status: session.status().clone(),
            progress_percent: session.progress_percent(),
            paint_remaining: session.paint_remaining(),
            cans: session.cans(),
            seconds_left: session.seconds_left(),
            brush: session.brush(),
            color: session.color(),
            orbit_enabled: session.orbit_enabled(),
            texture_size: session.canvas().size(),
            result: self.result.clone(),
            events,
        }
    }
}

/// The round's state after a call. The canvas itself is only exported as a
/// snapshot.
#[derive(Debug, Clone)]
pub struct PaintView {
    pub id: PaintSessionId,
    pub status: PaintStatus,
    pub progress_percent: f64,
    pub paint_remaining: f64,
    pub cans: u32,
    pub seconds_left: u64,
    pub brush: BrushSize,
    pub color: PaintColor,
    pub orbit_enabled: bool,
    pub texture_size: u32,
    pub result: Option<AppResultMessage>,
    pub events: Vec<PaintEvent>,
}

/// How a round is set up.
#[derive(Debug, Clone)]
pub struct StartPaint {
    pub user_id: UserId,
    pub app_data: Option<Value>,
    pub language: String,
    pub success_reward: Option<i64>,
    pub failure_reward: Option<i64>,
}

pub struct PaintUseCases {
    progression: Arc<ProgressionOps>,
    sessions: Arc<PaintSessions>,
    rules: PaintRules,
}

impl PaintUseCases {
    pub fn new(
        progression: Arc<ProgressionOps>,
        sessions: Arc<PaintSessions>,
        rules: PaintRules,
    ) -> Self {
        Self {
            progression,
            sessions,
            rules,
        }
    }

    /// Starts a round. A player missing a required item loses at once.
    pub async fn start(&self, request: StartPaint) -> Result<PaintView, PaintError> {
        let app_data = request.app_data.unwrap_or(Value::Null);
        let rules = self.rules.clone().apply_app_data(&app_data);
        let progression = self.progression.get(request.user_id).await?;

        let init = AppInitMessage::new(
            match &app_data {
                Value::Null => "{}".to_string(),
                data => data.to_string(),
            },
            player_stats(&progression),
            &request.language,
        )
        .with_rewards(request.success_reward, request.failure_reward);
        let mut sdk = AppSdk::new(PAINT_APP_NAME).with_required_items(rules.required_items.clone());
        sdk.receive_init(&init);

        let id = PaintSessionId::new();
        let mut session = PaintSession::new(id, request.user_id, rules);
        let events = session.validate_inventory(&init.player_stats.inventory_names());

        let mut live = LivePaint {
            session,
            sdk,
            result: None,
        };
        live.collect_result()?;
        let view = live.view(events);
        self.sessions.insert(id, live);

        tracing::info!(
            session_id = %id,
            user_id = %request.user_id,
            time_limit_secs = view.seconds_left,
            "Paint round started"
        );
        Ok(view)
    }

    pub async fn get(&self, id: PaintSessionId) -> Result<PaintView, PaintError> {
        let handle = self.handle(id)?;
        let live = handle.lock().await;
        Ok(live.view(Vec::new()))
    }

    pub fn close(&self, id: PaintSessionId) -> Result<(), PaintError> {
        if !self.sessions.remove(&id) {
            return Err(PaintError::SessionNotFound(id));
        }
        tracing::info!(session_id = %id, "Paint round closed");
        Ok(())
    }

    /// Drops rounds left idle for `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_idle(max_idle);
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle paint rounds");
        }
        evicted
    }

    pub async fn pointer(
        &self,
        id: PaintSessionId,
        phase: PointerPhase,
        hit: Option<SurfaceHit>,
    ) -> Result<PaintView, PaintError> {
        self.with_session(id, |session| {
            Ok(match phase {
                PointerPhase::Down => session.pointer_down(hit),
                PointerPhase::Move => session.pointer_move(hit),
                PointerPhase::Up | PointerPhase::Leave => session.pointer_up(),
            })
        })
        .await
    }

    /// Changes brush size and/or colour.
    pub async fn set_tools(
        &self,
        id: PaintSessionId,
        size: Option<f64>,
        color: Option<&str>,
    ) -> Result<PaintView, PaintError> {
        let size = size.map(BrushSize::new).transpose()?;
        let color = color.map(str::parse::<PaintColor>).transpose()?;
        self.with_session(id, |session| {
            let mut events = Vec::new();
            if let Some(size) = size {
                events.push(session.set_brush(size));
            }
            if let Some(color) = color {
                events.push(session.set_color(color));
            }
            Ok(events)
        })
        .await
    }

    /// Buys a spray can with the player's XP.
    pub async fn buy_paint(&self, id: PaintSessionId) -> Result<PaintView, PaintError> {
        let handle = self.handle(id)?;
        let mut live = handle.lock().await;
        if !live.session.is_playing() {
            return Err(DomainError::invalid_state_transition(
                "cannot buy paint after the round ended",
            )
            .into());
        }

        let cost = live.session.rules().spray_can_cost;
        let user_id = live.session.user_id();
        let balance = match self.progression.spend_xp(user_id, cost).await? {
            ProgressionUpdate::XpAdjusted { from, .. } => from,
            _ => cost,
        };
        let event = live.session.buy_paint(balance)?;
        if let Err(e) = live.sdk.spend_xp(cost) {
            tracing::debug!(session_id = %id, error = %e, "App view of XP out of date");
        }
        tracing::info!(session_id = %id, user_id = %user_id, xp_cost = cost, "Spray can bought");
        Ok(live.view(vec![event]))
    }

    pub async fn tick_timer(
        &self,
        id: PaintSessionId,
        elapsed_secs: u64,
    ) -> Result<PaintView, PaintError> {
        self.with_session(id, |session| Ok(session.tick_timer(elapsed_secs)))
            .await
    }

    /// PNG of the canvas. Capturing a won round releases its success result.
    pub async fn snapshot(&self, id: PaintSessionId) -> Result<Vec<u8>, PaintError> {
        let handle = self.handle(id)?;
        let mut live = handle.lock().await;
        let png = export_snapshot(live.session.canvas())?;
        if *live.session.status() == PaintStatus::Won && !live.session.is_captured() {
            live.session.mark_captured()?;
            live.collect_result()?;
        }
        Ok(png)
    }

    fn handle(&self, id: PaintSessionId) -> Result<Arc<Mutex<LivePaint>>, PaintError> {
        self.sessions.get(&id).ok_or(PaintError::SessionNotFound(id))
    }

    async fn with_session<F>(&self, id: PaintSessionId, f: F) -> Result<PaintView, PaintError>
    where
        F: FnOnce(&mut PaintSession) -> Result<Vec<PaintEvent>, PaintError>,
    {
        let handle = self.handle(id)?;
        let mut live = handle.lock().await;
        let events = f(&mut live.session)?;
        live.collect_result()?;
        Ok(live.view(events))
    }
}
