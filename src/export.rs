use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::renderer::Surface;

pub const DEFAULT_EXPORT_NAME: &str = "drawing.png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write image: {0}")]
    Write(#[from] std::io::Error),
}

/// Snapshot of the rendered pixels as PNG bytes.
pub fn export_png(surface: &Surface) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Cursor::new(Vec::new());
    surface.pixels().write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub fn save_png(surface: &Surface, path: &Path) -> Result<(), ExportError> {
    let bytes = export_png(surface)?;
    std::fs::write(path, bytes)?;
    log::info!("Exported {}x{} drawing to {}", surface.width(), surface.height(), path.display());
    Ok(())
}
