//! Resistencia Shared - Wire contracts for the engine and its clients
//!
//! This crate contains the types that cross a process or frame boundary:
//! - The embedded-app message protocol (init and `app-result`)
//! - App-side SDK state (inventory checks, XP spending, one-shot results)
//! - REST request and response bodies
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, uuid, serde_json, thiserror and tracing
//! 2. **No I/O** - Pure data types plus the SDK's local bookkeeping
//! 3. **Raw ids on the wire** - DTOs carry `i64` row ids and `uuid::Uuid`

pub mod app_protocol;
pub mod requests;
pub mod responses;
pub mod sdk;

pub use app_protocol::{
    AppInitMessage, AppResultMessage, InventoryEntry, PlayerStats, ProtocolError, APP_RESULT_TYPE,
    APP_SOURCE, PLAYER_SOURCE,
};
pub use requests::{
    ActivateHotspotRequest, AdvanceRequest, BrushRequest, CreatePaintSessionRequest,
    CreatePlaySessionRequest, GeometryRequest, PointerPhase, PointerRequest, SceneTickRequest,
    StoryListQuery, TimerRequest,
};
pub use responses::{
    HealthResponse, HotspotView, InventoryItemView, MediaView, PaintSessionResponse,
    PlaySessionResponse, ProgressionResponse, SceneView, StepView, StorySummary,
};
pub use sdk::{AppSdk, InventoryCheck, SdkError};
