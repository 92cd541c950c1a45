//! App-side state for embedded apps.
//!
//! An app builds an [`AppSdk`] with its name and required items, feeds it the
//! player's init message, and uses it to check the inventory, spend XP and
//! produce its single result message.

use resistencia_domain::AppStatus;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::app_protocol::{AppInitMessage, AppResultMessage, PlayerStats};

#[derive(Debug, Error, PartialEq)]
pub enum SdkError {
    #[error("App has not received its init message")]
    NotInitialized,
    #[error("Result already sent")]
    ResultAlreadySent,
    #[error("Insufficient XP: have {available}, need {required}")]
    InsufficientXp { available: i64, required: i64 },
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryCheck {
    pub valid: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultState {
    Pending,
    Sent,
}

#[derive(Debug, Clone)]
pub struct AppSdk {
    app_name: String,
    required_items: Vec<String>,
    app_data: Value,
    stats: Option<PlayerStats>,
    language: String,
    success_reward: Option<i64>,
    failure_reward: Option<i64>,
    result: ResultState,
}

impl AppSdk {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            required_items: Vec::new(),
            app_data: Value::Object(Default::default()),
            stats: None,
            language: "es".to_string(),
            success_reward: None,
            failure_reward: None,
            result: ResultState::Pending,
        }
    }

    pub fn with_required_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn is_initialized(&self) -> bool {
        self.stats.is_some()
    }

    pub fn app_data(&self) -> &Value {
        &self.app_data
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn player_stats(&self) -> Option<&PlayerStats> {
        self.stats.as_ref()
    }

    pub fn result_sent(&self) -> bool {
        self.result == ResultState::Sent
    }

    /// Takes in the player's init message. Later init messages replace the
    /// configuration but never re-arm a sent result.
    pub fn receive_init(&mut self, init: &AppInitMessage) {
        self.app_data = init.parsed_app_data();
        self.stats = Some(init.player_stats.clone());
        self.language = init.cc.clone();
        self.success_reward = init.success_recompensa_id;
        self.failure_reward = init.failure_recompensa_id;
        tracing::debug!(app = %self.app_name, "App initialized");
    }

    /// Checks the required items against the inventory, ignoring case.
    pub fn validate_inventory(&self) -> InventoryCheck {
        if self.required_items.is_empty() {
            return InventoryCheck {
                valid: true,
                missing: Vec::new(),
            };
        }
        let owned = self
            .stats
            .as_ref()
            .map(PlayerStats::inventory_names)
            .unwrap_or_default();
        let missing: Vec<String> = self
            .required_items
            .iter()
            .filter(|required| !owned.iter().any(|name| name.eq_ignore_ascii_case(required)))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::warn!(app = %self.app_name, missing = ?missing, "Required items missing");
        }
        InventoryCheck {
            valid: missing.is_empty(),
            missing,
        }
    }

    /// Deducts XP from the app's local view of the player's balance.
    ///
    /// Returns the new balance. The story applies the real change from the
    /// result's `xpDelta`.
    pub fn spend_xp(&mut self, amount: i64) -> Result<i64, SdkError> {
        if amount < 0 {
            return Err(SdkError::InvalidAmount(amount));
        }
        let stats = self.stats.as_mut().ok_or(SdkError::NotInitialized)?;
        if stats.xp < amount {
            return Err(SdkError::InsufficientXp {
                available: stats.xp,
                required: amount,
            });
        }
        stats.xp -= amount;
        Ok(stats.xp)
    }

    /// Builds the result message. Only the first call succeeds.
    pub fn send_result(
        &mut self,
        status: AppStatus,
        xp_delta: i64,
        message: &str,
    ) -> Result<AppResultMessage, SdkError> {
        if self.result == ResultState::Sent {
            tracing::warn!(app = %self.app_name, "Result already sent, ignoring duplicate");
            return Err(SdkError::ResultAlreadySent);
        }
        let reward = if status.is_success() {
            self.success_reward
        } else {
            self.failure_reward
        };
        let message = if message.is_empty() {
            format!("App {} completed with status: {}", self.app_name, status.as_str())
        } else {
            message.to_string()
        };
        self.result = ResultState::Sent;
        Ok(AppResultMessage::new(&self.app_name, status, xp_delta)
            .with_reward(reward)
            .with_message(message))
    }
}
