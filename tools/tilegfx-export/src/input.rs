//! Source image loading.
//!
//! The kind of input is resolved once from the path, before any decoding:
//! plain raster files go straight to `image`, layered XCF files are
//! flattened by the external `xcf2png` tool first.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tilegfx::CornerSet;

/// External tool used to flatten XCF files.
pub const XCF2PNG: &str = "xcf2png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    /// PNG/JPEG decoded directly.
    Raster(PathBuf),
    /// GIMP XCF; `layers` selects which layers are merged (all if empty).
    Xcf { path: PathBuf, layers: Vec<String> },
}

impl SourceImage {
    /// Classify `path` by extension.
    pub fn from_path(path: impl Into<PathBuf>, layers: &[String]) -> Self {
        let path = path.into();
        let is_xcf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xcf"));

        if is_xcf {
            SourceImage::Xcf {
                path,
                layers: layers.to_vec(),
            }
        } else {
            if !layers.is_empty() {
                tracing::warn!("Ignoring layer selection for non-XCF input {:?}", path);
            }
            SourceImage::Raster(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceImage::Raster(path) => path,
            SourceImage::Xcf { path, .. } => path,
        }
    }

    /// Command line that flattens an XCF input, `None` for raster inputs.
    pub fn flatten_command(&self) -> Option<Command> {
        match self {
            SourceImage::Raster(_) => None,
            SourceImage::Xcf { path, layers } => Some(xcf2png(path, layers)),
        }
    }

    pub fn load(&self) -> Result<DynamicImage> {
        match self {
            SourceImage::Raster(path) => {
                image::open(path).with_context(|| format!("Failed to load image: {:?}", path))
            }
            SourceImage::Xcf { path, layers } => {
                let mut cmd = xcf2png(path, layers);
                tracing::debug!("Flattening {:?} with {:?}", path, cmd);
                let output = cmd
                    .output()
                    .with_context(|| format!("Failed to run {} (is it installed?)", XCF2PNG))?;
                if !output.status.success() {
                    anyhow::bail!(
                        "{} failed on {:?}: {}",
                        XCF2PNG,
                        path,
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                image::load_from_memory_with_format(&output.stdout, image::ImageFormat::Png)
                    .with_context(|| format!("Failed to decode {} output for {:?}", XCF2PNG, path))
            }
        }
    }
}

fn xcf2png(path: &Path, layers: &[String]) -> Command {
    let mut cmd = Command::new(XCF2PNG);
    cmd.arg("--autocrop").arg(path).args(layers);
    cmd
}

/// Load several raster/XCF inputs in order.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<DynamicImage>> {
    paths
        .iter()
        .map(|p| SourceImage::from_path(p.clone(), &[]).load())
        .collect()
}

/// Load the three corner sprites of a tile set and validate them as a set.
pub fn load_corners(paths: &[PathBuf]) -> Result<CornerSet> {
    if paths.len() != 3 {
        anyhow::bail!("Expected 3 corner images, got {}", paths.len());
    }
    let images = load_all(paths)?;
    CornerSet::from_images(images).with_context(|| format!("Invalid corner set: {:?}", paths))
}
