//! Paint session - the graffiti minigame
//!
//! Strokes land as opaque discs on an off-screen RGBA canvas that the client
//! uses as a texture. Progress sums `π·r²` per stroke without correcting for
//! overlap, so it can reach 100% with less visible coverage than that.
//!
//! The session ends in `Won` as soon as progress reaches [`WIN_PROGRESS`] and
//! in `Lost` when the countdown runs out or a required item is missing. An
//! empty paint can only blocks strokes; it never ends the round.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::PaintEvent;
use crate::value_objects::{AppStatus, BrushSize, PaintColor, SurfaceHit};
use crate::{DomainError, PaintSessionId, UserId};

/// Progress percentage that wins the round.
pub const WIN_PROGRESS: f64 = 60.0;
/// XP reported to the story when the round is lost.
pub const LOSS_XP_DELTA: i64 = -50;
/// XP reported to the story once a won round has been captured.
pub const WIN_XP_DELTA: i64 = 150;

/// Item the player must own to play.
pub const REQUIRED_ITEM: &str = "Spray de Pintura";

/// Tunables for one round. `timeLimit` and `sprayCanCost` can be overridden by
/// the app data the story passes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintRules {
    pub texture_size: u32,
    pub time_limit_secs: u64,
    pub initial_paint: f64,
    pub spray_can_capacity: f64,
    pub spray_can_cost: i64,
    /// Fraction of the texture's pixels that makes up the win threshold.
    pub threshold_ratio: f64,
    pub required_items: Vec<String>,
}

impl Default for PaintRules {
    fn default() -> Self {
        Self {
            texture_size: 1024,
            time_limit_secs: 60,
            initial_paint: 500.0,
            spray_can_capacity: 500.0,
            spray_can_cost: 50,
            threshold_ratio: 0.6,
            required_items: vec![REQUIRED_ITEM.to_string()],
        }
    }
}

impl PaintRules {
    pub fn with_texture_size(mut self, size: u32) -> Self {
        self.texture_size = size;
        self
    }

    pub fn with_time_limit(mut self, secs: u64) -> Self {
        self.time_limit_secs = secs;
        self
    }

    /// Applies overrides found in the app's `appData` object. Unknown or
    /// ill-typed keys are ignored.
    pub fn apply_app_data(mut self, app_data: &Value) -> Self {
        if let Some(secs) = app_data.get("timeLimit").and_then(Value::as_u64) {
            if secs > 0 {
                self.time_limit_secs = secs;
            }
        }
        if let Some(cost) = app_data.get("sprayCanCost").and_then(Value::as_i64) {
            if cost >= 0 {
                self.spray_can_cost = cost;
            }
        }
        self
    }

    /// Painted area, in pixels, that counts as 100% progress.
    pub fn win_threshold(&self) -> f64 {
        let size = f64::from(self.texture_size);
        size * size * self.threshold_ratio
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LossReason {
    TimeExpired,
    MissingItems { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaintStatus {
    Playing,
    Won,
    Lost(LossReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeRejection {
    NotPlaying,
    OutOfPaint,
}

/// Final result the minigame reports to the story, delivered once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintOutcome {
    pub status: AppStatus,
    pub xp_delta: i64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultDelivery {
    Pending,
    Sent,
}

/// Square RGBA8 raster, row-major, starting fully transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintCanvas {
    size: u32,
    pixels: Vec<u8>,
}

impl PaintCanvas {
    pub fn new(size: u32) -> Self {
        let len = size as usize * size as usize * 4;
        Self {
            size,
            pixels: vec![0; len],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let i = (y as usize * self.size as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[i..i + 4]);
        Some(out)
    }

    /// Fills every pixel whose centre lies within `radius` of `(cx, cy)`.
    /// Parts of the disc outside the canvas are clipped.
    pub fn fill_disc(&mut self, cx: f64, cy: f64, radius: f64, rgba: [u8; 4]) {
        if self.size == 0 || radius <= 0.0 {
            return;
        }
        let max = f64::from(self.size - 1);
        let y0 = (cy - radius).floor().clamp(0.0, max) as u32;
        let y1 = (cy + radius).ceil().clamp(0.0, max) as u32;
        let x0 = (cx - radius).floor().clamp(0.0, max) as u32;
        let x1 = (cx + radius).ceil().clamp(0.0, max) as u32;
        let r2 = radius * radius;

        for y in y0..=y1 {
            let dy = f64::from(y) + 0.5 - cy;
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    let i = (y as usize * self.size as usize + x as usize) * 4;
                    self.pixels[i..i + 4].copy_from_slice(&rgba);
                }
            }
        }
    }

    /// Number of pixels with any opacity.
    pub fn painted_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] != 0).count()
    }
}

#[derive(Debug, Clone)]
pub struct PaintSession {
    id: PaintSessionId,
    user_id: UserId,
    rules: PaintRules,
    canvas: PaintCanvas,
    brush: BrushSize,
    color: PaintColor,
    painting: bool,
    total_painted_area: f64,
    paint_remaining: f64,
    cans: u32,
    seconds_left: u64,
    status: PaintStatus,
    captured: bool,
    delivery: ResultDelivery,
}

impl PaintSession {
    pub fn new(id: PaintSessionId, user_id: UserId, rules: PaintRules) -> Self {
        Self {
            id,
            user_id,
            canvas: PaintCanvas::new(rules.texture_size),
            brush: BrushSize::default(),
            color: PaintColor::default(),
            painting: false,
            total_painted_area: 0.0,
            paint_remaining: rules.initial_paint,
            cans: 1,
            seconds_left: rules.time_limit_secs,
            status: PaintStatus::Playing,
            captured: false,
            delivery: ResultDelivery::Pending,
            rules,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> PaintSessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rules(&self) -> &PaintRules {
        &self.rules
    }

    pub fn canvas(&self) -> &PaintCanvas {
        &self.canvas
    }

    pub fn brush(&self) -> BrushSize {
        self.brush
    }

    pub fn color(&self) -> PaintColor {
        self.color
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// Camera orbit is suppressed while a stroke is in progress.
    pub fn orbit_enabled(&self) -> bool {
        !self.painting
    }

    pub fn total_painted_area(&self) -> f64 {
        self.total_painted_area
    }

    pub fn paint_remaining(&self) -> f64 {
        self.paint_remaining
    }

    pub fn cans(&self) -> u32 {
        self.cans
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    pub fn status(&self) -> &PaintStatus {
        &self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PaintStatus::Playing
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn progress_percent(&self) -> f64 {
        (self.total_painted_area / self.rules.win_threshold() * 100.0).min(100.0)
    }

    // =========================================================================
    // Round setup
    // =========================================================================

    /// Loses the round at once if the inventory lacks a required item.
    /// Item names compare case-insensitively.
    pub fn validate_inventory(&mut self, inventory: &[String]) -> Vec<PaintEvent> {
        if !self.is_playing() {
            return Vec::new();
        }
        let missing: Vec<String> = self
            .rules
            .required_items
            .iter()
            .filter(|required| !inventory.iter().any(|owned| owned.eq_ignore_ascii_case(required)))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Vec::new();
        }
        self.lose(LossReason::MissingItems { missing })
    }

    // =========================================================================
    // Pointer input
    // =========================================================================

    /// Pointer pressed. Only a hit on the surface starts painting.
    pub fn pointer_down(&mut self, hit: Option<SurfaceHit>) -> Vec<PaintEvent> {
        let Some(hit) = hit else {
            self.painting = false;
            return Vec::new();
        };
        if !self.is_playing() {
            return vec![PaintEvent::StrokeRejected {
                reason: StrokeRejection::NotPlaying,
            }];
        }
        self.painting = true;
        let mut events = vec![PaintEvent::PaintingStarted];
        events.extend(self.stroke(hit));
        events
    }

    /// Pointer dragged. Each sample is one stroke; gaps are not filled.
    pub fn pointer_move(&mut self, hit: Option<SurfaceHit>) -> Vec<PaintEvent> {
        match hit {
            Some(hit) if self.painting => self.stroke(hit),
            _ => Vec::new(),
        }
    }

    /// Pointer released or left the surface.
    pub fn pointer_up(&mut self) -> Vec<PaintEvent> {
        if !self.painting {
            return Vec::new();
        }
        self.painting = false;
        vec![PaintEvent::PaintingStopped]
    }

    // =========================================================================
    // Tools
    // =========================================================================

    pub fn set_brush(&mut self, size: BrushSize) -> PaintEvent {
        self.brush = size;
        PaintEvent::BrushChanged { size }
    }

    pub fn set_color(&mut self, color: PaintColor) -> PaintEvent {
        self.color = color;
        PaintEvent::ColorChanged { color }
    }

    /// Buys another spray can with experience.
    ///
    /// Returns the XP to charge; the caller owns the player's balance.
    pub fn buy_paint(&mut self, xp_balance: i64) -> Result<PaintEvent, DomainError> {
        if !self.is_playing() {
            return Err(DomainError::invalid_state_transition(
                "cannot buy paint after the round ended",
            ));
        }
        let cost = self.rules.spray_can_cost;
        if xp_balance < cost {
            return Err(DomainError::insufficient(
                "experience",
                xp_balance as f64,
                cost as f64,
            ));
        }
        self.paint_remaining += self.rules.spray_can_capacity;
        self.cans += 1;
        Ok(PaintEvent::PaintPurchased {
            xp_cost: cost,
            paint_remaining: self.paint_remaining,
            cans: self.cans,
        })
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Advances the countdown by whole seconds.
    pub fn tick_timer(&mut self, elapsed_secs: u64) -> Vec<PaintEvent> {
        if !self.is_playing() || elapsed_secs == 0 {
            return Vec::new();
        }
        self.seconds_left = self.seconds_left.saturating_sub(elapsed_secs);
        let mut events = vec![PaintEvent::TimerTicked {
            seconds_left: self.seconds_left,
        }];
        if self.seconds_left == 0 {
            events.extend(self.lose(LossReason::TimeExpired));
        }
        events
    }

    // =========================================================================
    // Result
    // =========================================================================

    /// Records that the won canvas was captured, which releases the success
    /// result.
    pub fn mark_captured(&mut self) -> Result<(), DomainError> {
        if self.status != PaintStatus::Won {
            return Err(DomainError::invalid_state_transition(
                "only a won round can be captured",
            ));
        }
        self.captured = true;
        Ok(())
    }

    /// The round's result, handed out at most once.
    ///
    /// Losses are available as soon as they happen; wins only after capture.
    pub fn take_result(&mut self) -> Option<PaintOutcome> {
        if self.delivery == ResultDelivery::Sent {
            return None;
        }
        let outcome = match &self.status {
            PaintStatus::Playing => return None,
            PaintStatus::Won if !self.captured => return None,
            PaintStatus::Won => PaintOutcome {
                status: AppStatus::Success,
                xp_delta: WIN_XP_DELTA,
                message: "Graffiti completed".to_string(),
            },
            PaintStatus::Lost(LossReason::TimeExpired) => PaintOutcome {
                status: AppStatus::Failure,
                xp_delta: LOSS_XP_DELTA,
                message: "Time ran out".to_string(),
            },
            PaintStatus::Lost(LossReason::MissingItems { missing }) => PaintOutcome {
                status: AppStatus::Failure,
                xp_delta: LOSS_XP_DELTA,
                message: format!("Missing required items: {}", missing.join(", ")),
            },
        };
        self.delivery = ResultDelivery::Sent;
        Some(outcome)
    }

    fn stroke(&mut self, hit: SurfaceHit) -> Vec<PaintEvent> {
        if !self.is_playing() {
            return vec![PaintEvent::StrokeRejected {
                reason: StrokeRejection::NotPlaying,
            }];
        }
        if self.paint_remaining <= 0.0 {
            return vec![PaintEvent::StrokeRejected {
                reason: StrokeRejection::OutOfPaint,
            }];
        }

        let (x, y) = hit.to_pixel(self.canvas.size());
        self.canvas
            .fill_disc(x, y, self.brush.radius(), self.color.rgba());
        let area = self.brush.stroke_area();
        let cost = self.brush.stroke_cost();
        self.total_painted_area += area;
        self.paint_remaining = (self.paint_remaining - cost).max(0.0);

        let progress_percent = self.progress_percent();
        let mut events = vec![PaintEvent::StrokeApplied {
            x,
            y,
            area,
            cost,
            paint_remaining: self.paint_remaining,
            progress_percent,
        }];
        if progress_percent >= WIN_PROGRESS {
            self.status = PaintStatus::Won;
            self.painting = false;
            events.push(PaintEvent::Won { progress_percent });
        }
        events
    }

    fn lose(&mut self, reason: LossReason) -> Vec<PaintEvent> {
        self.status = PaintStatus::Lost(reason.clone());
        self.painting = false;
        vec![PaintEvent::Lost { reason }]
    }
}
