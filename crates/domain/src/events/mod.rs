//! Domain events
//!
//! Aggregates return these from mutations to say what happened. The engine maps
//! them onto progression writes and API responses.

mod paint_events;
mod play_events;
mod progression_events;
mod scene_events;

pub use paint_events::PaintEvent;
pub use play_events::PlayEvent;
pub use progression_events::ProgressionUpdate;
pub use scene_events::SceneEvent;
