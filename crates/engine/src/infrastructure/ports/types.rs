//! Plain data carried across ports.

use chrono::{DateTime, Utc};
use resistencia_domain::{StepId, UserId};
use serde::{Deserialize, Serialize};

/// What a player did on a step, as written to the interaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Arrived at the step.
    Navigation,
    /// Picked a branch.
    Decision,
    /// An embedded app reported its result.
    AppResult,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navegacion",
            Self::Decision => "decision",
            Self::AppResult => "app_result",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub step_id: StepId,
    pub kind: InteractionKind,
    pub at: DateTime<Utc>,
}
