//! Aggregate roots - the three interaction state machines
//!
//! Each aggregate:
//! - Is owned by a single session and mutated through `&mut self`
//! - Exposes behavior through methods, not public fields
//! - Returns domain events from mutations
//!
//! None of them perform I/O. Media, rewards and persistence are the engine's
//! concern.

pub mod hotspot_scene;
pub mod paint_session;
pub mod play_session;

pub use hotspot_scene::{HotspotScene, ScenePhase};
pub use paint_session::{
    LossReason, PaintCanvas, PaintOutcome, PaintRules, PaintSession, PaintStatus,
    StrokeRejection, LOSS_XP_DELTA, REQUIRED_ITEM, WIN_PROGRESS, WIN_XP_DELTA,
};
pub use play_session::{AppHost, PlaySession, PlayState, StepGate, StepMedia, StepTicket};
