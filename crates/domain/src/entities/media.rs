//! Media resources attached to narrative steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DomainError, ResourceId};

/// What a media resource renders as.
///
/// Wire values are the backend's `tipo` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "imagen", alias = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "transcripcion")]
    Transcript,
    #[serde(rename = "subtitulo")]
    Subtitle,
    #[serde(rename = "interactive")]
    Interactive,
    #[serde(rename = "3d_model")]
    Model3d,
    #[serde(rename = "app")]
    App,
}

impl MediaKind {
    /// Media with a natural end that the player can wait for.
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "imagen",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Transcript => "transcripcion",
            Self::Subtitle => "subtitulo",
            Self::Interactive => "interactive",
            Self::Model3d => "3d_model",
            Self::App => "app",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "imagen" | "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "transcripcion" => Ok(Self::Transcript),
            "subtitulo" => Ok(Self::Subtitle),
            "interactive" => Ok(Self::Interactive),
            "3d_model" => Ok(Self::Model3d),
            "app" => Ok(Self::App),
            other => Err(DomainError::parse(format!("Unknown media kind: {}", other))),
        }
    }
}

/// A media row: kind, payload URL and free-form JSON metadata.
///
/// For 3D models the metadata is the hotspot configuration; for apps it
/// carries the app data and the `flowConfig` branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaResource {
    pub id: ResourceId,
    pub kind: MediaKind,
    pub url: String,
    pub metadata: Option<String>,
}

impl MediaResource {
    pub fn new(id: ResourceId, kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            url: url.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}
