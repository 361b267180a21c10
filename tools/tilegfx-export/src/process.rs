//! Single-image processing pipeline.
//!
//! Steps run in a fixed order regardless of how they were requested:
//! composite, resize, alpha reduction, autocrop, then 8bpp conversion.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

use tilegfx::ops::{self, CompositeMode, ResizeFilter, ResizeSpec};
use tilegfx::quantize::{self, QuantizeOptions};
use tilegfx::{IndexedImage, Palette};

use crate::input::SourceImage;
use crate::output;

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub composite: Option<(PathBuf, CompositeMode)>,
    pub resize: Option<(ResizeSpec, ResizeFilter)>,
    pub reduce_alpha: Option<u8>,
    pub autocrop: bool,
}

/// Result of a pipeline run.
pub enum Processed {
    Rgba(DynamicImage),
    Indexed(IndexedImage),
}

impl Processed {
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Processed::Rgba(img) => output::save_rgba(&img.to_rgba8(), path),
            Processed::Indexed(img) => {
                output::ensure_parent(path)?;
                img.save(path)
                    .with_context(|| format!("Failed to write 8bpp image: {:?}", path))
            }
        }
    }
}

/// Run every requested step on `img`.
///
/// Returns the processed image and, when autocrop ran, the crop offset.
pub fn run(
    mut img: DynamicImage,
    options: &ProcessOptions,
    palette: Option<(&Palette, &QuantizeOptions)>,
) -> Result<(Processed, Option<(u32, u32)>)> {
    if let Some((path, mode)) = &options.composite {
        let overlay = SourceImage::from_path(path.clone(), &[]).load()?;
        img = DynamicImage::ImageRgba8(ops::composite(&img.to_rgba8(), &overlay.to_rgba8(), *mode));
    }

    if let Some((spec, filter)) = options.resize {
        img = ops::resize(&img, spec, filter);
    }

    if let Some(threshold) = options.reduce_alpha {
        if img.color().has_alpha() {
            img = DynamicImage::ImageRgba8(ops::reduce_alpha(&img.to_rgba8(), threshold));
        } else {
            tracing::warn!("Image has no alpha channel, nothing to reduce");
        }
    }

    let mut offset = None;
    if options.autocrop {
        let (cropped, at) = ops::autocrop(&img);
        tracing::info!("Autocrop offset: {:?}", at);
        img = cropped;
        offset = Some(at);
    }

    let processed = match palette {
        Some((palette, quantize_options)) => {
            let indexed = quantize::quantize(&img, palette, quantize_options)?;
            Processed::Indexed(indexed)
        }
        None => Processed::Rgba(img),
    };
    Ok((processed, offset))
}
