//! Paint minigame outcomes.

use serde::{Deserialize, Serialize};

use crate::aggregates::{LossReason, StrokeRejection};
use crate::value_objects::{BrushSize, PaintColor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaintEvent {
    PaintingStarted,
    PaintingStopped,
    StrokeApplied {
        x: f64,
        y: f64,
        area: f64,
        cost: f64,
        paint_remaining: f64,
        progress_percent: f64,
    },
    StrokeRejected { reason: StrokeRejection },
    BrushChanged { size: BrushSize },
    ColorChanged { color: PaintColor },
    PaintPurchased {
        xp_cost: i64,
        paint_remaining: f64,
        cans: u32,
    },
    TimerTicked { seconds_left: u64 },
    Won { progress_percent: f64 },
    Lost { reason: LossReason },
}
