//! PNG export of a paint canvas.

use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use resistencia_domain::PaintCanvas;

#[derive(Debug, thiserror::Error)]
#[error("Snapshot encoding failed: {0}")]
pub struct SnapshotError(String);

/// Encodes the canvas as an RGBA PNG of the same size.
pub fn export_snapshot(canvas: &PaintCanvas) -> Result<Vec<u8>, SnapshotError> {
    let size = canvas.size();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(canvas.pixels(), size, size, ColorType::Rgba8.into())
        .map_err(|e| SnapshotError(e.to_string()))?;
    Ok(buf)
}
