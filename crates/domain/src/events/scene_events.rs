//! Hotspot scene outcomes.

use serde::{Deserialize, Serialize};

use crate::value_objects::{HotspotContentType, MeshName};
use crate::{CharacterId, RewardId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEvent {
    /// A configured region found its mesh part.
    RegionBound { region: MeshName },
    /// A configured region has no mesh part and can never be discovered.
    RegionUnmatched { region: MeshName },
    /// Scanning finished.
    Ready { bound: usize, unmatched: usize },
    Highlighted { region: MeshName },
    Unhighlighted { region: MeshName },
    /// Raised on every explicit activation of a bound region.
    Activated {
        region: MeshName,
        content_type: HotspotContentType,
        url: String,
    },
    /// Raised once per region, on its first activation.
    Discovered {
        region: MeshName,
        reward: Option<RewardId>,
        character: Option<CharacterId>,
    },
}
