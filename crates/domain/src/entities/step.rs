//! Narrative steps and their outgoing links.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CharacterId, DomainError, ResourceId, RewardId, StepId, StoryId};

/// The role a step plays in a story's flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Plain narrative beat, advanced through its default link.
    #[serde(rename = "narrativo")]
    Narrative,
    /// The player picks one of several branches.
    #[serde(rename = "pregunta")]
    Decision,
    /// An embedded app decides the branch through its result status.
    #[serde(rename = "app")]
    App,
    /// Last beat of a story. Its default link, if any, names the next story.
    #[serde(rename = "final")]
    Ending,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narrative => "narrativo",
            Self::Decision => "pregunta",
            Self::App => "app",
            Self::Ending => "final",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "narrativo" => Ok(Self::Narrative),
            "pregunta" => Ok(Self::Decision),
            "app" => Ok(Self::App),
            "final" => Ok(Self::Ending),
            other => Err(DomainError::parse(format!("Unknown step kind: {}", other))),
        }
    }
}

/// One labelled outgoing link of a decision or app step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOption {
    #[serde(rename = "texto")]
    pub label: String,
    #[serde(rename = "id_siguiente", alias = "siguiente_paso_id", default)]
    pub next: Option<StepId>,
    #[serde(
        rename = "recompensaId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reward: Option<RewardId>,
}

impl BranchOption {
    pub fn new(label: impl Into<String>, next: Option<StepId>) -> Self {
        Self {
            label: label.into(),
            next,
            reward: None,
        }
    }

    pub fn with_reward(mut self, reward: RewardId) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Reads a branch list from any of the shapes the backend stores.
    ///
    /// Accepts a bare array, an object wrapping `opciones_siguientes_json`, or
    /// either of those serialized into a string. `null` yields no branches.
    pub fn list_from_json(value: &Value) -> Result<Vec<BranchOption>, DomainError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => Ok(serde_json::from_value(value.clone())?),
            Value::Object(map) => match map.get("opciones_siguientes_json") {
                Some(inner) => Self::list_from_json(inner),
                None => Err(DomainError::parse(
                    "branch object lacks opciones_siguientes_json",
                )),
            },
            Value::String(raw) => {
                let parsed: Value = serde_json::from_str(raw)?;
                Self::list_from_json(&parsed)
            }
            other => Err(DomainError::parse(format!(
                "unexpected branch payload: {}",
                other
            ))),
        }
    }
}

/// How the player picked where to go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BranchChoice {
    /// Follow the step's default link.
    Default,
    /// Follow the branch at this position.
    Index(usize),
    /// Follow the branch with this label (app results use their status).
    Label(String),
}

impl BranchChoice {
    /// Picks the branch this choice refers to. `Default` never picks one.
    pub fn select<'a>(&self, branches: &'a [BranchOption]) -> Option<&'a BranchOption> {
        match self {
            Self::Default => None,
            Self::Index(i) => branches.get(*i),
            Self::Label(label) => branches.iter().find(|b| &b.label == label),
        }
    }
}

/// A single node of a story's flow.
///
/// Steps are loaded once per story and never change during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeStep {
    pub id: StepId,
    pub story_id: StoryId,
    pub order: u32,
    pub kind: StepKind,
    pub content: Option<String>,
    pub resource: Option<ResourceId>,
    pub character: Option<CharacterId>,
    pub reward: Option<RewardId>,
    pub default_next: Option<StepId>,
    #[serde(default)]
    pub branches: Vec<BranchOption>,
}

impl NarrativeStep {
    pub fn new(id: StepId, story_id: StoryId, order: u32, kind: StepKind) -> Self {
        Self {
            id,
            story_id,
            order,
            kind,
            content: None,
            resource: None,
            character: None,
            reward: None,
            default_next: None,
            branches: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceId) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_character(mut self, character: CharacterId) -> Self {
        self.character = Some(character);
        self
    }

    pub fn with_reward(mut self, reward: RewardId) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn with_next(mut self, next: StepId) -> Self {
        self.default_next = Some(next);
        self
    }

    pub fn with_branches(mut self, branches: Vec<BranchOption>) -> Self {
        self.branches = branches;
        self
    }

    /// A step with branches is treated as a decision even if its kind says
    /// otherwise.
    pub fn is_decision(&self) -> bool {
        self.kind == StepKind::Decision || !self.branches.is_empty()
    }

    /// True when advancing from this step can only end the story.
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            StepKind::Ending => true,
            StepKind::App => false,
            StepKind::Narrative | StepKind::Decision => {
                self.default_next.is_none() && self.branches.is_empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(kind: StepKind) -> NarrativeStep {
        NarrativeStep::new(StepId::new(1), StoryId::new(1), 0, kind)
    }

    #[test]
    fn branch_list_accepts_all_backend_shapes() {
        let bare = json!([{"texto": "Sí", "id_siguiente": 4}]);
        let wrapped = json!({"opciones_siguientes_json": [{"texto": "Sí", "siguiente_paso_id": 4}]});
        let stringified = Value::String(wrapped.to_string());

        for value in [bare, wrapped, stringified] {
            let branches = BranchOption::list_from_json(&value).unwrap();
            assert_eq!(branches, vec![BranchOption::new("Sí", Some(StepId::new(4)))]);
        }
        assert!(BranchOption::list_from_json(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn branch_list_rejects_garbage() {
        assert!(BranchOption::list_from_json(&json!(12)).is_err());
        assert!(BranchOption::list_from_json(&json!({"other": []})).is_err());
    }

    #[test]
    fn branch_reward_is_optional() {
        let value = json!([{"texto": "success", "id_siguiente": 9, "recompensaId": 3}]);
        let branches = BranchOption::list_from_json(&value).unwrap();
        assert_eq!(branches[0].reward, Some(RewardId::new(3)));
    }

    #[test]
    fn terminal_steps() {
        assert!(step(StepKind::Ending).with_next(StepId::new(2)).is_terminal());
        assert!(step(StepKind::Narrative).is_terminal());
        assert!(!step(StepKind::Narrative).with_next(StepId::new(2)).is_terminal());
        assert!(!step(StepKind::App).is_terminal());
    }

    #[test]
    fn branch_lookup_by_index_and_label() {
        let branches = vec![
            BranchOption::new("izquierda", Some(StepId::new(2))),
            BranchOption::new("derecha", Some(StepId::new(3))),
        ];
        assert_eq!(
            BranchChoice::Index(1).select(&branches).unwrap().next,
            Some(StepId::new(3))
        );
        assert_eq!(
            BranchChoice::Label("izquierda".into()).select(&branches).unwrap().next,
            Some(StepId::new(2))
        );
        assert!(BranchChoice::Index(5).select(&branches).is_none());
        assert!(BranchChoice::Default.select(&branches).is_none());
    }
}
