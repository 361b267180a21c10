//! Output naming and writing.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use tilegfx::mask::{self, MaskStyle};
use tilegfx::{CornerSet, TilerConfig};

/// File name of tile `index` in a set: `{stem}_{index:02}.png`.
pub fn tile_file_name(stem: &str, index: usize) -> String {
    format!("{stem}_{index:02}.png")
}

/// File name of mask `index`: `{prefix}{index:04}.png`, the numbering the
/// game's sprite tables use.
pub fn mask_file_name(prefix: &str, index: usize) -> String {
    format!("{prefix}{index:04}.png")
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    Ok(())
}

pub fn save_rgba(img: &RgbaImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write image: {:?}", path))
}

/// Write a numbered image set into `dir`, returning the written paths.
pub fn save_numbered(
    images: &[RgbaImage],
    dir: &Path,
    name: impl Fn(usize) -> String,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;
    let mut written = Vec::with_capacity(images.len());
    for (i, img) in images.iter().enumerate() {
        let path = dir.join(name(i));
        save_rgba(img, &path)?;
        tracing::debug!("Wrote {:?}", path);
        written.push(path);
    }
    Ok(written)
}

/// Composite the full tile set and write it as `{stem}_NN.png` into `dir`.
///
/// All tiles are built before the first file is written.
pub fn write_tiles(corners: &CornerSet, config: &TilerConfig, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let tiles = tilegfx::composite_tiles(corners, config);
    let written = save_numbered(&tiles, dir, |i| tile_file_name(stem, i))?;
    tracing::info!("Wrote {} tiles ({}) to {:?}", written.len(), corners.zoom().suffix(), dir);
    Ok(written)
}

/// Build every mask and write it as `{prefix}NNNN.png` into `dir`.
pub fn write_masks(corners: &CornerSet, style: &MaskStyle, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let masks = mask::build_masks(corners, style);
    let written = save_numbered(&masks, dir, |i| mask_file_name(prefix, i))?;
    tracing::info!("Wrote {} masks to {:?}", written.len(), dir);
    Ok(written)
}
