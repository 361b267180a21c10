//! Palette quantization.
//!
//! Every distinct color of the source image is matched once against the
//! palette's neutral colors; pixels are then rewritten through the resulting
//! table. Cost is `unique colors x neutral colors`, not `pixels x palette`.
//!
//! Reserved colors (background, white, and unless disabled the action and
//! company colors) are fixed points. Ties between equally distant candidates
//! go to the first one in neutral declaration order, which existing sprite
//! sheets depend on.

use hashbrown::{HashMap, HashSet};
use image::{DynamicImage, RgbImage};

use crate::color::Rgb;
use crate::indexed::IndexedImage;
use crate::palette::{Palette, PaletteIndex, ReservedOptions};

/// Colors scored per block by [`DistanceStrategy::Batched`].
const BATCH_COLORS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum QuantizeError {
    #[error(transparent)]
    Palette(#[from] crate::palette::PaletteError),

    #[error("Color {color} is not in the full table of palette '{palette}'")]
    ColorNotInPalette { palette: String, color: Rgb },
}

/// How nearest-color distances are computed.
///
/// Both strategies produce identical mappings; `Batched` scores blocks of
/// colors against a structure-of-arrays copy of the palette, which the
/// compiler vectorizes well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceStrategy {
    Exhaustive,
    #[default]
    Batched,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuantizeOptions {
    pub reserved: ReservedOptions,
    pub strategy: DistanceStrategy,
}

/// Source color to chosen palette color, one entry per distinct color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMapping(HashMap<Rgb, Rgb>);

impl ColorMapping {
    pub fn get(&self, color: Rgb) -> Option<Rgb> {
        self.0.get(&color).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rgb, Rgb)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    /// Translate every target color to its position in the full palette.
    pub fn to_indices(&self, palette: &Palette) -> Result<IndexMapping, QuantizeError> {
        let mut indices = HashMap::with_capacity(self.0.len());
        for (&source, &target) in &self.0 {
            let index = palette
                .index_of(target)
                .ok_or_else(|| QuantizeError::ColorNotInPalette {
                    palette: palette.name().to_string(),
                    color: target,
                })?;
            indices.insert(source, index);
        }
        Ok(IndexMapping(indices))
    }
}

/// Source color to palette index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMapping(HashMap<Rgb, PaletteIndex>);

impl IndexMapping {
    pub fn get(&self, color: Rgb) -> Option<PaletteIndex> {
        self.0.get(&color).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flatten to RGB, replacing every pixel with alpha < 255 by `background`.
///
/// There is no partial blending: the alpha channel is a hard threshold.
/// Images without alpha are converted as-is.
pub fn normalize_rgb(img: &DynamicImage, background: Rgb) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y).0;
        if p[3] < 255 {
            background.into()
        } else {
            image::Rgb([p[0], p[1], p[2]])
        }
    })
}

/// Distinct colors in first-seen order.
pub fn unique_colors(img: &RgbImage) -> Vec<Rgb> {
    let mut seen = HashSet::new();
    let mut colors = Vec::new();
    for p in img.pixels() {
        let c = Rgb::from(*p);
        if seen.insert(c) {
            colors.push(c);
        }
    }
    colors
}

/// Index of the first minimum of `distances`.
#[inline]
fn first_min(distances: impl Iterator<Item = u32>) -> usize {
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (i, d) in distances.enumerate() {
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn nearest_exhaustive(colors: &[Rgb], candidates: &[Rgb]) -> Vec<Rgb> {
    colors
        .iter()
        .map(|&c| candidates[first_min(candidates.iter().map(|&p| c.distance_sq(p)))])
        .collect()
}

fn nearest_batched(colors: &[Rgb], candidates: &[Rgb]) -> Vec<Rgb> {
    let rs: Vec<i32> = candidates.iter().map(|c| c.0 as i32).collect();
    let gs: Vec<i32> = candidates.iter().map(|c| c.1 as i32).collect();
    let bs: Vec<i32> = candidates.iter().map(|c| c.2 as i32).collect();
    let n = candidates.len();

    let mut out = Vec::with_capacity(colors.len());
    let mut dists = vec![0u32; BATCH_COLORS * n];

    for block in colors.chunks(BATCH_COLORS) {
        for (row, c) in dists.chunks_exact_mut(n).zip(block) {
            let (r, g, b) = (c.0 as i32, c.1 as i32, c.2 as i32);
            for (((d, &pr), &pg), &pb) in row.iter_mut().zip(&rs).zip(&gs).zip(&bs) {
                let (dr, dg, db) = (r - pr, g - pg, b - pb);
                *d = (dr * dr + dg * dg + db * db) as u32;
            }
        }
        for row in dists.chunks_exact(n).take(block.len()) {
            out.push(candidates[first_min(row.iter().copied())]);
        }
    }
    out
}

/// Map every color in `colors` to a palette color.
///
/// Reserved colors map to themselves; everything else goes to the nearest
/// neutral color.
pub fn build_mapping(colors: &[Rgb], palette: &Palette, options: &QuantizeOptions) -> ColorMapping {
    let reserved = palette.reserved(options.reserved);
    let (fixed, free): (Vec<Rgb>, Vec<Rgb>) = colors.iter().partition(|c| reserved.contains(*c));

    let nearest = match options.strategy {
        DistanceStrategy::Exhaustive => nearest_exhaustive(&free, palette.neutral()),
        DistanceStrategy::Batched => nearest_batched(&free, palette.neutral()),
    };

    let mut mapping = HashMap::with_capacity(colors.len());
    mapping.extend(free.into_iter().zip(nearest));
    mapping.extend(fixed.into_iter().map(|c| (c, c)));
    ColorMapping(mapping)
}

/// Quantize an image to `palette`, producing an indexed image that carries
/// the full palette as its color table.
pub fn quantize(img: &DynamicImage, palette: &Palette, options: &QuantizeOptions) -> Result<IndexedImage, QuantizeError> {
    let rgb = normalize_rgb(img, palette.background());
    let colors = unique_colors(&rgb);
    tracing::debug!(
        "Quantizing {}x{} image: {} unique colors against {} neutral ({:?})",
        rgb.width(),
        rgb.height(),
        colors.len(),
        palette.neutral().len(),
        options.strategy
    );

    let mapping = build_mapping(&colors, palette, options);
    let indices = mapping.to_indices(palette)?;

    let mut pixels = Vec::with_capacity(rgb.width() as usize * rgb.height() as usize);
    for p in rgb.pixels() {
        let c = Rgb::from(*p);
        let index = indices.get(c).ok_or_else(|| QuantizeError::ColorNotInPalette {
            palette: palette.name().to_string(),
            color: c,
        })?;
        pixels.push(index);
    }

    Ok(IndexedImage::new(rgb.width(), rgb.height(), pixels, palette.colors().to_vec()))
}
