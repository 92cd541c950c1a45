//! Use cases - player-facing operations.
//!
//! Each module orchestrates domain aggregates over the ports for one area:
//! - `catalog` - which stories a player can open
//! - `play` - a pass through one story
//! - `paint` - the graffiti minigame
//! - `progression` - XP, inventory and achievements
//! - `media` - resolving a step's media

pub mod catalog;
pub mod media;
pub mod paint;
pub mod play;
pub mod progression;

pub use catalog::{StoryCatalog, StoryEntry};
pub use media::ResolveMedia;
pub use paint::{PaintError, PaintUseCases, PaintView, StartPaint};
pub use play::{PlayError, PlayUseCases, PlayView};
pub use progression::{ProgressionError, ProgressionOps};
