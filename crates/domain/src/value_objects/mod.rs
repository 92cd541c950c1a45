//! Value objects - Immutable objects defined by their attributes

mod app_config;
mod hotspot;
mod paint;

pub use app_config::{AppStatus, AppStepConfig};
pub use hotspot::{
    HotspotContentType, HotspotDescriptor, HotspotPosition, HotspotRegion, HotspotRegistry,
    MeshName,
};
pub use paint::{BrushSize, PaintColor, SurfaceHit, PALETTE};
