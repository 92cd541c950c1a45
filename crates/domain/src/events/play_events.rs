//! Play session outcomes.

use serde::{Deserialize, Serialize};

use crate::aggregates::{StepGate, StepTicket};
use crate::events::SceneEvent;
use crate::value_objects::MeshName;
use crate::{CharacterId, RewardId, StepId, StoryId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayEvent {
    /// Media for this step must be resolved and applied with `ticket`.
    StepLoading { step: StepId, ticket: StepTicket },
    StepActivated { step: StepId, gate: StepGate },
    /// The result of an abandoned load arrived after the step changed.
    StaleResultDiscarded { ticket: StepTicket },
    Scene { event: SceneEvent },
    HotspotDiscovered {
        region: MeshName,
        reward: Option<RewardId>,
        character: Option<CharacterId>,
        discovered: usize,
        total: usize,
    },
    GateSatisfied { step: StepId },
    /// A branch carried its own reward.
    BranchRewarded { reward: RewardId },
    /// An interactive hotspot's app paid out for its status.
    HotspotAppRewarded { region: MeshName, reward: RewardId },
    Advanced { from: StepId, to: StepId },
    Ended {
        story: StoryId,
        next_story: Option<StoryId>,
    },
}
