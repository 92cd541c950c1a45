//! Pure domain for the Resistencia story player.
//!
//! Entities mirror the backend's rows; the aggregates are the interaction
//! state machines a play session runs: the hotspot scene, the paint minigame
//! and the story step controller. Nothing here performs I/O.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod value_objects;

pub use aggregates::{
    AppHost, HotspotScene, LossReason, PaintCanvas, PaintOutcome, PaintRules, PaintSession,
    PaintStatus, PlaySession, PlayState, ScenePhase, StepGate, StepMedia, StepTicket,
    StrokeRejection,
};

pub use entities::{
    level_for_xp, xp_for_next_level, Achievement, BranchChoice, BranchOption, Character,
    InventoryItem, MediaKind, MediaResource, NarrativeStep, PlayerProgression, Reward, StepKind,
    Story, STORY_COMPLETION_XP,
};

pub use error::DomainError;
pub use events::{PaintEvent, PlayEvent, ProgressionUpdate, SceneEvent};

pub use ids::{
    CharacterId, LocationId, PaintSessionId, PlaySessionId, ResourceId, RewardId, StepId, StoryId,
    UserId,
};

pub use value_objects::{
    AppStatus, AppStepConfig, BrushSize, HotspotContentType, HotspotDescriptor, HotspotPosition,
    HotspotRegion, HotspotRegistry, MeshName, PaintColor, SurfaceHit, PALETTE,
};
