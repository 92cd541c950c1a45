//! Hotspot configuration attached to 3D model resources.
//!
//! The JSON is a flat array of descriptors, one per mesh part, plus at most one
//! `backgroundMusic` pseudo-entry carrying the scene's ambient track.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::AppStatus;
use crate::{CharacterId, DomainError, RewardId};

/// Name of a sub-mesh inside a loaded 3D asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshName(String);

impl MeshName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeshName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MeshName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What a hotspot shows when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HotspotContentType {
    #[serde(rename = "image", alias = "imagen")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "audio")]
    Audio,
    /// Hosts an embedded app; rewards come through the app result.
    #[serde(rename = "interactive")]
    Interactive,
    /// Not a region: the scene's ambient track.
    #[serde(rename = "backgroundMusic")]
    BackgroundMusic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One entry of the hotspot JSON array, exactly as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotDescriptor {
    pub mesh_name: String,
    pub content_type: HotspotContentType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "title_en")]
    pub title_en: Option<String>,
    #[serde(default)]
    pub subtitles_url: Option<String>,
    #[serde(default, alias = "recompensaId")]
    pub reward_ref: Option<RewardId>,
    #[serde(default, alias = "personajeId")]
    pub character_ref: Option<CharacterId>,
    #[serde(default, rename = "successRecompensaId")]
    pub success_reward: Option<RewardId>,
    #[serde(default, rename = "failureRecompensaId")]
    pub failure_reward: Option<RewardId>,
    /// Init payload for the app an interactive hotspot opens.
    #[serde(default, rename = "rentalAppConfig")]
    pub app_config: Option<Value>,
    #[serde(default)]
    pub position: Option<HotspotPosition>,
    /// Older configs put the ambient URL here instead of in `url`.
    #[serde(default)]
    pub background_music: Option<String>,
}

/// An interactive region of a 3D asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotRegion {
    pub name: MeshName,
    pub content_type: HotspotContentType,
    pub url: String,
    pub title: Option<String>,
    pub title_en: Option<String>,
    pub subtitles_url: Option<String>,
    pub reward: Option<RewardId>,
    pub character: Option<CharacterId>,
    pub success_reward: Option<RewardId>,
    pub failure_reward: Option<RewardId>,
    pub app_config: Option<Value>,
}

impl HotspotRegion {
    pub fn new(name: impl Into<String>, content_type: HotspotContentType, url: impl Into<String>) -> Self {
        Self {
            name: MeshName::new(name),
            content_type,
            url: url.into(),
            title: None,
            title_en: None,
            subtitles_url: None,
            reward: None,
            character: None,
            success_reward: None,
            failure_reward: None,
            app_config: None,
        }
    }

    pub fn with_reward(mut self, reward: RewardId) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn with_character(mut self, character: CharacterId) -> Self {
        self.character = Some(character);
        self
    }

    /// Reward paid on first discovery.
    ///
    /// Interactive regions pay through their app result, never on discovery.
    pub fn discovery_reward(&self) -> Option<RewardId> {
        match self.content_type {
            HotspotContentType::Interactive => None,
            _ => self.reward,
        }
    }

    /// Reward an interactive region pays for an app result.
    pub fn reward_for(&self, status: AppStatus) -> Option<RewardId> {
        if status.is_success() {
            self.success_reward
        } else {
            self.failure_reward
        }
    }

    /// The `appData` string for the app this region opens.
    pub fn app_data(&self) -> String {
        match &self.app_config {
            None | Some(Value::Null) => "{}".to_string(),
            Some(config) => config.to_string(),
        }
    }

    /// Title to show, preferring the English one for `en` players.
    pub fn localized_title(&self, language: &str) -> Option<&str> {
        if language.eq_ignore_ascii_case("en") {
            if let Some(title) = self.title_en.as_deref() {
                return Some(title);
            }
        }
        self.title.as_deref()
    }

    fn from_descriptor(d: HotspotDescriptor) -> Self {
        Self {
            name: MeshName::new(d.mesh_name),
            content_type: d.content_type,
            url: d.url,
            title: d.title,
            title_en: d.title_en,
            subtitles_url: d.subtitles_url,
            reward: d.reward_ref,
            character: d.character_ref,
            success_reward: d.success_reward,
            failure_reward: d.failure_reward,
            app_config: d.app_config,
        }
    }
}

/// Parsed hotspot configuration for one 3D resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotRegistry {
    regions: Vec<HotspotRegion>,
    ambient_track: Option<String>,
}

impl HotspotRegistry {
    /// A registry with no regions: the step is ungated.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the raw JSON array.
    ///
    /// `backgroundMusic` entries never become regions; the first one supplies
    /// the ambient track. A repeated mesh name keeps its first descriptor.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let descriptors: Vec<HotspotDescriptor> = serde_json::from_str(raw)
            .map_err(|e| DomainError::parse(format!("hotspot config: {}", e)))?;
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn from_descriptors(descriptors: Vec<HotspotDescriptor>) -> Self {
        let mut registry = Self::empty();
        for d in descriptors {
            if d.content_type == HotspotContentType::BackgroundMusic {
                if registry.ambient_track.is_none() {
                    let url = if d.url.is_empty() {
                        d.background_music.clone().unwrap_or_default()
                    } else {
                        d.url.clone()
                    };
                    if !url.is_empty() {
                        registry.ambient_track = Some(url);
                    }
                }
                continue;
            }
            if registry.region(&d.mesh_name).is_some() {
                continue;
            }
            registry.regions.push(HotspotRegion::from_descriptor(d));
        }
        registry
    }

    pub fn regions(&self) -> &[HotspotRegion] {
        &self.regions
    }

    pub fn region(&self, mesh_name: &str) -> Option<&HotspotRegion> {
        self.regions.iter().find(|r| r.name.as_str() == mesh_name)
    }

    pub fn ambient_track(&self) -> Option<&str> {
        self.ambient_track.as_deref()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_background_music_from_regions() {
        let raw = r#"[
            {"meshName":"A","contentType":"image","url":"x"},
            {"meshName":"B","contentType":"backgroundMusic","url":"y"}
        ]"#;
        let registry = HotspotRegistry::parse(raw).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.regions()[0].name.as_str(), "A");
        assert_eq!(registry.ambient_track(), Some("y"));
    }

    #[test]
    fn accepts_backend_field_names() {
        let raw = r#"[{"meshName":"bidek","contentType":"imagen","url":"u","title":"Bici",
                       "recompensaId":5,"personajeId":8}]"#;
        let registry = HotspotRegistry::parse(raw).unwrap();
        let region = registry.region("bidek").unwrap();

        assert_eq!(region.content_type, HotspotContentType::Image);
        assert_eq!(region.reward, Some(RewardId::new(5)));
        assert_eq!(region.character, Some(CharacterId::new(8)));
    }

    #[test]
    fn legacy_background_music_field_is_used_when_url_is_empty() {
        let raw = r#"[{"meshName":"","contentType":"backgroundMusic","backgroundMusic":"amb.mp3"}]"#;
        let registry = HotspotRegistry::parse(raw).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.ambient_track(), Some("amb.mp3"));
    }

    #[test]
    fn duplicate_mesh_names_keep_first() {
        let raw = r#"[
            {"meshName":"A","contentType":"image","url":"first"},
            {"meshName":"A","contentType":"video","url":"second"}
        ]"#;
        let registry = HotspotRegistry::parse(raw).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.region("A").unwrap().url, "first");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            HotspotRegistry::parse("{not json"),
            Err(DomainError::Parse(_))
        ));
        assert!(matches!(
            HotspotRegistry::parse(r#"{"meshName":"A"}"#),
            Err(DomainError::Parse(_))
        ));
    }

    #[test]
    fn interactive_regions_pay_through_apps_only() {
        let region = HotspotRegion::new("kiosk", HotspotContentType::Interactive, "app.html")
            .with_reward(RewardId::new(1));
        assert_eq!(region.discovery_reward(), None);

        let region = HotspotRegion::new("mural", HotspotContentType::Image, "m.jpg")
            .with_reward(RewardId::new(1));
        assert_eq!(region.discovery_reward(), Some(RewardId::new(1)));
    }

    #[test]
    fn interactive_region_carries_app_config_and_status_rewards() {
        let raw = r#"[{"meshName":"kiosko","contentType":"interactive","url":"app.html",
                       "rentalAppConfig":{"bikes":3},
                       "successRecompensaId":26,"failureRecompensaId":27}]"#;
        let registry = HotspotRegistry::parse(raw).unwrap();
        let region = registry.region("kiosko").unwrap();

        assert_eq!(region.app_data(), r#"{"bikes":3}"#);
        assert_eq!(region.reward_for(AppStatus::Success), Some(RewardId::new(26)));
        assert_eq!(region.reward_for(AppStatus::FailureNormal), Some(RewardId::new(27)));
        assert_eq!(
            HotspotRegion::new("A", HotspotContentType::Interactive, "x").app_data(),
            "{}"
        );
    }

    #[test]
    fn localized_title_falls_back_to_default() {
        let mut region = HotspotRegion::new("A", HotspotContentType::Image, "x");
        region.title = Some("Mural".into());
        assert_eq!(region.localized_title("en"), Some("Mural"));
        region.title_en = Some("Wall painting".into());
        assert_eq!(region.localized_title("en"), Some("Wall painting"));
        assert_eq!(region.localized_title("es"), Some("Mural"));
    }
}
