//! Request bodies for the engine's REST API.

use resistencia_domain::{BranchChoice, SurfaceHit};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryListQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaySessionRequest {
    pub user_id: Uuid,
    pub story_id: i64,
    /// Language code passed on to embedded apps.
    #[serde(default = "default_language")]
    pub language: String,
}

/// Mesh part names of the loaded 3D asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryRequest {
    #[serde(default)]
    pub parts: Vec<String>,
}

/// One render tick of the 3D view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneTickRequest {
    #[serde(default)]
    pub parts: Vec<String>,
    /// Mesh name of the top ray hit, if any.
    #[serde(default)]
    pub top_hit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateHotspotRequest {
    pub mesh_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default = "default_choice")]
    pub choice: BranchChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaintSessionRequest {
    pub user_id: Uuid,
    /// The app's `appConfig` overrides (`timeLimit`, `sprayCanCost`).
    #[serde(default)]
    pub app_data: Option<serde_json::Value>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Rewards the result message names for each outcome.
    #[serde(default)]
    pub success_reward_id: Option<i64>,
    #[serde(default)]
    pub failure_reward_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerRequest {
    pub phase: PointerPhase,
    /// UV of the surface hit; absent when the ray missed.
    #[serde(default)]
    pub hit: Option<SurfaceHit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrushRequest {
    /// Brush diameter in texture pixels.
    #[serde(default)]
    pub size: Option<f64>,
    /// `#rrggbb`
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerRequest {
    pub elapsed_secs: u64,
}

fn default_language() -> String {
    "es".to_string()
}

fn default_choice() -> BranchChoice {
    BranchChoice::Default
}
