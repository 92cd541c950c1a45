//! In-memory state storage modules.
//!
//! Stores hold runtime state that never reaches the backend:
//! - `PlaySessions` - live story play sessions
//! - `PaintSessions` - live paint minigame rounds

pub mod session;

pub use session::SessionStore;

use resistencia_domain::{PaintSessionId, PlaySessionId};

use crate::use_cases::paint::LivePaint;
use crate::use_cases::play::LivePlay;

pub type PlaySessions = SessionStore<PlaySessionId, LivePlay>;
pub type PaintSessions = SessionStore<PaintSessionId, LivePaint>;
