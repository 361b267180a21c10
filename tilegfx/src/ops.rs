//! General sprite operations: autocrop, compositing, resizing and alpha
//! reduction.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::str::FromStr;

use crate::blend::mul_div255;

/// Crop away empty borders.
///
/// For images with alpha, "empty" means alpha 0; otherwise a pixel is empty
/// when all its channels are zero. Returns the cropped image and the
/// top-left offset of the crop, which the game uses as the sprite offset.
/// An entirely empty image is returned unchanged with offset `(0, 0)`.
pub fn autocrop(img: &DynamicImage) -> (DynamicImage, (u32, u32)) {
    let has_alpha = img.color().has_alpha();
    let rgba = img.to_rgba8();

    let occupied = |p: &image::Rgba<u8>| {
        if has_alpha {
            p.0[3] != 0
        } else {
            p.0[..3].iter().any(|&c| c != 0)
        }
    };

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in rgba.enumerate_pixels() {
        if !occupied(p) {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }

    match bounds {
        Some((left, top, right, bottom)) => {
            let cropped = img.crop_imm(left, top, right - left + 1, bottom - top + 1);
            (cropped, (left, top))
        }
        None => (img.clone(), (0, 0)),
    }
}

/// How a second image is combined with the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompositeMode {
    /// Draw the overlay on top.
    #[default]
    Over,
    /// Keep the base colors, multiply the two alpha channels.
    In,
}

/// Combine `overlay` with `base`, both anchored at the top-left corner.
pub fn composite(base: &RgbaImage, overlay: &RgbaImage, mode: CompositeMode) -> RgbaImage {
    let mut out = base.clone();
    match mode {
        CompositeMode::Over => imageops::overlay(&mut out, overlay, 0, 0),
        CompositeMode::In => {
            for (x, y, p) in out.enumerate_pixels_mut() {
                let other = if x < overlay.width() && y < overlay.height() {
                    overlay.get_pixel(x, y).0[3]
                } else {
                    0
                };
                p.0[3] = mul_div255(p.0[3], other);
            }
        }
    }
    out
}

/// Resampling filter for [`resize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Antialias,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Antialias => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid size {0:?} (expected a scale like \"0.5\" or dimensions like \"64x32\", \"x32\", \"64x\")")]
pub struct ResizeSpecError(pub String);

/// Target size for [`resize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeSpec {
    /// Uniform scale factor.
    Scale(f64),
    Exact { width: u32, height: u32 },
    /// Fixed width, height keeps the aspect ratio.
    Width(u32),
    /// Fixed height, width keeps the aspect ratio.
    Height(u32),
}

impl ResizeSpec {
    /// Output dimensions for an input of `width x height`.
    pub fn target(&self, width: u32, height: u32) -> (u32, u32) {
        let scaled = |v: u32, factor: f64| ((v as f64 * factor).round() as u32).max(1);
        match *self {
            ResizeSpec::Scale(f) => (scaled(width, f), scaled(height, f)),
            ResizeSpec::Exact { width, height } => (width.max(1), height.max(1)),
            ResizeSpec::Width(w) => (w.max(1), scaled(height, w as f64 / width as f64)),
            ResizeSpec::Height(h) => (scaled(width, h as f64 / height as f64), h.max(1)),
        }
    }
}

impl FromStr for ResizeSpec {
    type Err = ResizeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ResizeSpecError(s.to_string());
        let s = s.trim();

        if let Ok(f) = s.parse::<f64>() {
            if !(f.is_finite() && f > 0.0) {
                return Err(err());
            }
            return Ok(ResizeSpec::Scale(f));
        }

        let (w, h) = s.split_once('x').ok_or_else(err)?;
        let dim = |v: &str| v.parse::<u32>().ok().filter(|&v| v > 0).ok_or_else(err);
        match (w.is_empty(), h.is_empty()) {
            (false, false) => Ok(ResizeSpec::Exact {
                width: dim(w)?,
                height: dim(h)?,
            }),
            (false, true) => Ok(ResizeSpec::Width(dim(w)?)),
            (true, false) => Ok(ResizeSpec::Height(dim(h)?)),
            (true, true) => Err(err()),
        }
    }
}

pub fn resize(img: &DynamicImage, spec: ResizeSpec, filter: ResizeFilter) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (w, h) = spec.target(width, height);
    img.resize_exact(w, h, filter.filter_type())
}

/// Snap alpha to fully opaque or fully transparent.
///
/// Pixels with alpha at or above `threshold` become opaque. The rest become
/// `(0, 0, 0, 0)`, dropping the color data hidden under zero alpha.
pub fn reduce_alpha(img: &RgbaImage, threshold: u8) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        if p.0[3] >= threshold {
            p.0[3] = 255;
        } else {
            p.0 = [0, 0, 0, 0];
        }
    }
    out
}
