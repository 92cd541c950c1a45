//! Response bodies for the engine's REST API.
//!
//! Every mutating call answers with the session's full view plus the events
//! the call produced, so clients never have to diff state themselves.

use resistencia_domain::{
    Achievement, HotspotContentType, MediaKind, PaintEvent, PaintStatus, PlayEvent, PlayState,
    ScenePhase, StepGate, StepKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_protocol::{AppInitMessage, AppResultMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub depends_on: Option<i64>,
    pub locked: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemView {
    pub reward_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionResponse {
    pub user_id: Uuid,
    pub xp: i64,
    pub level: u32,
    pub next_level_xp: i64,
    pub visited_stories: Vec<i64>,
    pub completed_stories: Vec<i64>,
    pub known_characters: Vec<String>,
    pub inventory: Vec<InventoryItemView>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub id: i64,
    pub order: u32,
    pub kind: StepKind,
    pub content: Option<String>,
    /// Branch labels, in order.
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaView {
    pub id: i64,
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotView {
    pub mesh_name: String,
    pub content_type: HotspotContentType,
    pub title: Option<String>,
    pub discovered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneView {
    pub phase: ScenePhase,
    pub discovered: usize,
    pub total: usize,
    pub highlighted: Option<String>,
    pub ambient_track: Option<String>,
    pub hotspots: Vec<HotspotView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySessionResponse {
    pub id: Uuid,
    pub story_id: i64,
    pub state: PlayState,
    pub gate: StepGate,
    pub ticket: u64,
    pub can_advance: bool,
    pub step: StepView,
    pub media: Option<MediaView>,
    pub scene: Option<SceneView>,
    /// Message to post to the step's embedded app, if it has one.
    pub app_init: Option<AppInitMessage>,
    pub next_story: Option<i64>,
    #[serde(default)]
    pub events: Vec<PlayEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintSessionResponse {
    pub id: Uuid,
    pub status: PaintStatus,
    pub progress_percent: f64,
    pub paint_remaining: f64,
    pub cans: u32,
    pub seconds_left: u64,
    pub brush_size: f64,
    pub color: String,
    pub orbit_enabled: bool,
    pub texture_size: u32,
    /// The round's result, once decided, for the story's app-result endpoint.
    pub result: Option<AppResultMessage>,
    #[serde(default)]
    pub events: Vec<PaintEvent>,
}
