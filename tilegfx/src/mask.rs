//! Alpha masks for the tile set.
//!
//! Masks use the same corners and rule table as [`crate::tiler`] but a
//! different geometry: the tile is assembled at its natural height (NW plus
//! SW, one pixel short, as the game engine expects) and centered on a square
//! canvas. A few shapes are aligned against a taller box instead so they
//! line up with the rendered 3D scenery.

use image::{Rgba, RgbaImage};

use crate::blend::{paste_masked, paste_opaque};
use crate::color::Rgb;
use crate::tiler::{Alignment, CornerSet, Quadrant, TILE_RULES, TileRule};

/// Alignment overrides for masks; everything else is centered directly.
const MASK_ALIGNMENT: [(usize, Alignment); 5] = [
    (2, Alignment::Top),
    (7, Alignment::Bottom),
    (8, Alignment::Top),
    (10, Alignment::Top),
    (13, Alignment::Bottom),
];

/// Canvas fill for generated masks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskStyle {
    /// Opaque background color (8bpp masks), or `None` for the near-transparent
    /// `(0, 0, 0, 1)` fill used by 32bpp masks.
    pub background: Option<Rgb>,
}

impl MaskStyle {
    fn fill(&self) -> Rgba<u8> {
        match self.background {
            Some(c) => c.with_alpha(255),
            None => Rgba([0, 0, 0, 1]),
        }
    }
}

/// Alignment override for mask `index`, `None` when it is centered directly.
pub fn mask_alignment(index: usize) -> Option<Alignment> {
    MASK_ALIGNMENT.iter().find(|(i, _)| *i == index).map(|(_, a)| *a)
}

/// Corners of `rule` pasted without masking at their natural height.
fn assemble(corners: &CornerSet, rule: &TileRule) -> RgbaImage {
    let nw = corners.image(rule.nw);
    let sw = corners.image(rule.sw);
    let ne = corners.image(rule.ne);

    let width = nw.width() * 2;
    let height = (nw.height() + sw.height()).saturating_sub(1).max(1);
    let mut bbox = RgbaImage::new(width, height);

    for quadrant in Quadrant::ALL {
        let corner = quadrant.orient(corners.image(rule.corner(quadrant)));
        let x = if quadrant.is_east() { (width / 2) as i64 } else { 0 };
        let y = match quadrant {
            Quadrant::SouthWest => nw.height() as i64 - 1,
            Quadrant::SouthEast => ne.height() as i64 - 1,
            _ => 0,
        };
        paste_opaque(&mut bbox, &corner, x, y);
    }
    bbox
}

/// Build the mask for `rule` on a square canvas.
///
/// With an alignment, the shape is first placed against a box twice the
/// height of its tallest corner.
pub fn build_mask(corners: &CornerSet, rule: &TileRule, align: Option<Alignment>, style: &MaskStyle) -> RgbaImage {
    let bbox = assemble(corners, rule);
    let (width, height) = bbox.dimensions();

    let mut canvas = RgbaImage::from_pixel(width, width, style.fill());

    match align {
        Some(align) => {
            let tallest = Quadrant::ALL
                .iter()
                .map(|&q| corners.image(rule.corner(q)).height())
                .max()
                .unwrap_or(0);
            let box_height = tallest * 2;
            let mut temp = RgbaImage::new(width, box_height);
            let slack = box_height as i64 - height as i64;
            let y = match align {
                Alignment::Top => 0,
                Alignment::Bottom => slack - 1,
                Alignment::Center => slack.div_euclid(2),
            };
            paste_opaque(&mut temp, &bbox, 0, y);
            let y = (width as i64 - box_height as i64).div_euclid(2);
            paste_masked(&mut canvas, &temp, 0, y);
        }
        None => {
            let y = (width as i64 - height as i64).div_euclid(2);
            paste_masked(&mut canvas, &bbox, 0, y);
        }
    }
    canvas
}

/// Build all 19 masks, indexed like [`TILE_RULES`].
pub fn build_masks(corners: &CornerSet, style: &MaskStyle) -> Vec<RgbaImage> {
    TILE_RULES
        .iter()
        .enumerate()
        .map(|(i, rule)| build_mask(corners, rule, mask_alignment(i), style))
        .collect()
}
