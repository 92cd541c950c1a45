//! Messages exchanged between the story player and an embedded app.
//!
//! The player posts an [`AppInitMessage`] when the app's frame loads; the app
//! answers once with an [`AppResultMessage`].

use resistencia_domain::AppStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// `source` of messages sent by the story player.
pub const PLAYER_SOURCE: &str = "FlujoNarrativoUsuario";
/// `source` of messages sent by embedded apps.
pub const APP_SOURCE: &str = "ResistenciaApp";
/// `type` of an app's final result.
pub const APP_RESULT_TYPE: &str = "app-result";

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Unexpected message source: {0}")]
    UnexpectedSource(String),
    #[error("Unexpected message type: {0}")]
    UnexpectedType(String),
    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// One inventory entry as apps see it: older players send bare names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryEntry {
    Name(String),
    Item { nombre: String },
}

impl InventoryEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Item { nombre } => nombre,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default, alias = "puntuacion")]
    pub xp: i64,
    #[serde(default)]
    pub inventario: Vec<InventoryEntry>,
}

impl PlayerStats {
    pub fn inventory_names(&self) -> Vec<String> {
        self.inventario.iter().map(|i| i.name().to_string()).collect()
    }
}

/// Player → app: configuration and the player's current stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInitMessage {
    pub source: String,
    /// The app's `appConfig`, serialized; apps parse it themselves.
    pub app_data: String,
    pub player_stats: PlayerStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_recompensa_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_recompensa_id: Option<i64>,
    /// Language code.
    pub cc: String,
}

impl AppInitMessage {
    pub fn new(app_data: impl Into<String>, player_stats: PlayerStats, language: &str) -> Self {
        Self {
            source: PLAYER_SOURCE.to_string(),
            app_data: app_data.into(),
            player_stats,
            success_recompensa_id: None,
            failure_recompensa_id: None,
            cc: language.to_string(),
        }
    }

    pub fn with_rewards(mut self, success: Option<i64>, failure: Option<i64>) -> Self {
        self.success_recompensa_id = success;
        self.failure_recompensa_id = failure;
        self
    }

    /// Parsed `appData`. Bad JSON reads as an empty object.
    pub fn parsed_app_data(&self) -> Value {
        serde_json::from_str(&self.app_data).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// App → player: the app's one and only result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppResultMessage {
    pub source: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recompensa_id: Option<i64>,
    /// Older apps report their XP change here.
    #[serde(default, rename = "costoXP", skip_serializing_if = "Option::is_none")]
    pub costo_xp: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl AppResultMessage {
    pub fn new(app_name: impl Into<String>, status: AppStatus, xp_delta: i64) -> Self {
        Self {
            source: APP_SOURCE.to_string(),
            app_name: app_name.into(),
            kind: APP_RESULT_TYPE.to_string(),
            status: status.as_str().to_string(),
            xp_delta: Some(xp_delta),
            recompensa_id: None,
            costo_xp: None,
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_reward(mut self, reward: Option<i64>) -> Self {
        self.recompensa_id = reward;
        self
    }

    /// Parses and checks a raw message from an app frame.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let message: Self =
            serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.source != APP_SOURCE {
            return Err(ProtocolError::UnexpectedSource(self.source.clone()));
        }
        if self.kind != APP_RESULT_TYPE {
            return Err(ProtocolError::UnexpectedType(self.kind.clone()));
        }
        Ok(())
    }

    pub fn status(&self) -> AppStatus {
        AppStatus::from_wire(&self.status)
    }

    /// Net XP change: `xpDelta`, else the legacy `costoXP`, else nothing.
    pub fn xp_delta(&self) -> i64 {
        self.xp_delta.or(self.costo_xp).unwrap_or(0)
    }

    /// Reward to grant, ignoring non-positive ids.
    pub fn reward_id(&self) -> Option<i64> {
        self.recompensa_id.filter(|id| *id > 0)
    }
}
