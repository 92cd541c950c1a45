//! Metadata of an embedded-app resource.
//!
//! Stored as `{"appConfig": {...}, "flowConfig": {"opciones_siguientes_json": [...]}}`.
//! `appConfig` is handed to the app untouched; `flowConfig` holds the branches
//! the player follows once the app reports its status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BranchOption, DomainError};

/// Status label an app reports, also used as the branch label it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Success,
    Failure,
    FailureNormal,
    FailureExhaustive,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::FailureNormal => "failure_normal",
            Self::FailureExhaustive => "failure_exhaustive",
        }
    }

    /// Reads a status label; anything unrecognised counts as a plain failure.
    pub fn from_wire(label: &str) -> Self {
        match label.trim() {
            "success" => Self::Success,
            "failure_normal" => Self::FailureNormal,
            "failure_exhaustive" => Self::FailureExhaustive,
            _ => Self::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppStepConfig {
    app_config: Value,
    branches: Vec<BranchOption>,
}

impl AppStepConfig {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DomainError::parse(format!("app metadata: {}", e)))?;
        let Value::Object(mut map) = value else {
            return Err(DomainError::parse("app metadata must be an object"));
        };
        let branches = match map.get("flowConfig") {
            Some(flow) => BranchOption::list_from_json(flow)?,
            None => Vec::new(),
        };
        Ok(Self {
            app_config: map.remove("appConfig").unwrap_or(Value::Object(Default::default())),
            branches,
        })
    }

    pub fn app_config(&self) -> &Value {
        &self.app_config
    }

    /// The `appData` string apps expect in their init message.
    pub fn app_data(&self) -> String {
        match &self.app_config {
            Value::Null => "{}".to_string(),
            config => config.to_string(),
        }
    }

    pub fn branches(&self) -> &[BranchOption] {
        &self.branches
    }

    pub fn into_branches(self) -> Vec<BranchOption> {
        self.branches
    }
}
