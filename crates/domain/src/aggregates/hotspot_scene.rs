//! Hotspot scene - interaction loop over one loaded 3D asset
//!
//! The scene binds configured regions to the asset's mesh parts, tracks the
//! hovered region, and turns explicit activations into discoveries.
//!
//! ```text
//! AwaitingGeometry --(parts reported)--> Scanning --(walk once)--> Ready
//! ```
//!
//! Ray casting stays on the client. Every call carries at most one top hit,
//! identified by mesh name, so two regions can never be discovered at once.
//! A scene is never reset: dropping it is the teardown and a new step builds a
//! fresh one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::SceneEvent;
use crate::value_objects::{HotspotRegion, HotspotRegistry, MeshName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenePhase {
    AwaitingGeometry,
    Scanning,
    Ready,
}

/// Discovery is one-way: a region never goes back to hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionProgress {
    Hidden,
    Discovered,
}

#[derive(Debug, Clone)]
pub struct HotspotScene {
    registry: HotspotRegistry,
    phase: ScenePhase,
    bound: BTreeMap<MeshName, RegionProgress>,
    unmatched: Vec<MeshName>,
    highlighted: Option<MeshName>,
}

impl HotspotScene {
    pub fn new(registry: HotspotRegistry) -> Self {
        Self {
            registry,
            phase: ScenePhase::AwaitingGeometry,
            bound: BTreeMap::new(),
            unmatched: Vec::new(),
            highlighted: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    #[inline]
    pub fn registry(&self) -> &HotspotRegistry {
        &self.registry
    }

    pub fn ambient_track(&self) -> Option<&str> {
        self.registry.ambient_track()
    }

    pub fn highlighted(&self) -> Option<&MeshName> {
        self.highlighted.as_ref()
    }

    pub fn unmatched(&self) -> &[MeshName] {
        &self.unmatched
    }

    /// Configured regions. Unmatched regions count too, so a region without a
    /// mesh part keeps the step blocked.
    pub fn total_regions(&self) -> usize {
        self.registry.len()
    }

    pub fn discovered_count(&self) -> usize {
        self.bound
            .values()
            .filter(|p| **p == RegionProgress::Discovered)
            .count()
    }

    pub fn is_discovered(&self, region: &str) -> bool {
        self.bound.get(&MeshName::new(region)) == Some(&RegionProgress::Discovered)
    }

    pub fn all_discovered(&self) -> bool {
        self.discovered_count() == self.total_regions()
    }

    /// Polling path, called once per render tick.
    ///
    /// Waits while the asset reports no parts, scans on the first tick that
    /// has some, then re-evaluates the hover target.
    pub fn tick<S: AsRef<str>>(&mut self, geometry: &[S], top_hit: Option<&str>) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        if self.phase == ScenePhase::AwaitingGeometry {
            if geometry.is_empty() {
                return events;
            }
            events.extend(self.scan(geometry));
        }
        events.extend(self.hover(top_hit));
        events
    }

    /// Explicit load-completion path. Scans even if the asset has no parts.
    pub fn geometry_loaded<S: AsRef<str>>(&mut self, geometry: &[S]) -> Vec<SceneEvent> {
        if self.phase != ScenePhase::AwaitingGeometry {
            return Vec::new();
        }
        self.scan(geometry)
    }

    /// Explicit click or select on the current top hit.
    pub fn activate(&mut self, top_hit: &str) -> Vec<SceneEvent> {
        if self.phase != ScenePhase::Ready {
            return Vec::new();
        }
        let name = MeshName::new(top_hit);
        let Some(progress) = self.bound.get_mut(&name) else {
            return Vec::new();
        };
        let Some(region) = self.registry.region(top_hit) else {
            return Vec::new();
        };

        let mut events = vec![SceneEvent::Activated {
            region: name.clone(),
            content_type: region.content_type,
            url: region.url.clone(),
        }];
        if *progress == RegionProgress::Hidden {
            *progress = RegionProgress::Discovered;
            events.push(SceneEvent::Discovered {
                region: name,
                reward: region.discovery_reward(),
                character: region.character,
            });
        }
        events
    }

    /// Region behind a bound mesh part, for showing its content.
    pub fn region(&self, name: &str) -> Option<&HotspotRegion> {
        if self.bound.contains_key(&MeshName::new(name)) {
            self.registry.region(name)
        } else {
            None
        }
    }

    fn scan<S: AsRef<str>>(&mut self, geometry: &[S]) -> Vec<SceneEvent> {
        self.phase = ScenePhase::Scanning;
        let mut events = Vec::new();

        if !self.registry.is_empty() {
            for region in self.registry.regions() {
                let present = geometry
                    .iter()
                    .any(|part| part.as_ref() == region.name.as_str());
                if present {
                    self.bound.insert(region.name.clone(), RegionProgress::Hidden);
                    events.push(SceneEvent::RegionBound {
                        region: region.name.clone(),
                    });
                } else {
                    self.unmatched.push(region.name.clone());
                    events.push(SceneEvent::RegionUnmatched {
                        region: region.name.clone(),
                    });
                }
            }
        }

        self.phase = ScenePhase::Ready;
        events.push(SceneEvent::Ready {
            bound: self.bound.len(),
            unmatched: self.unmatched.len(),
        });
        events
    }

    fn hover(&mut self, top_hit: Option<&str>) -> Vec<SceneEvent> {
        let target = top_hit
            .map(MeshName::new)
            .filter(|name| self.bound.contains_key(name));
        if target == self.highlighted {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(previous) = self.highlighted.take() {
            events.push(SceneEvent::Unhighlighted { region: previous });
        }
        if let Some(region) = target {
            events.push(SceneEvent::Highlighted {
                region: region.clone(),
            });
            self.highlighted = Some(region);
        }
        events
    }
}
