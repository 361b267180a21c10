//! Isometric tile compositing.
//!
//! A ground tile is built from four corner wedges (NW, SW, NE, SE). Each
//! wedge comes in three heights (small, medium, large) and the combination
//! of heights gives the tile its slope. Only one sprite per height is drawn;
//! the other three corners are mirrored copies of it:
//!
//! ```text
//!   +-------+-------+
//!   |  NW   |  NE   |   NW: as drawn        NE: flipped horizontally
//!   +-------+-------+
//!   |  SW   |  SE   |   SW: flipped vertically  SE: rotated 180 degrees
//!   +-------+-------+
//! ```
//!
//! The 19 rules in [`TILE_RULES`] cover every slope of one ground type. Each
//! composited tile is then placed on a canvas of uniform height so all
//! sprites of the set share the same dimensions.

use image::{DynamicImage, Rgba, RgbaImage, imageops};

use crate::blend::paste_masked;

/// Corner sprite widths accepted as input.
pub const CORNER_WIDTHS: [u32; 4] = [32, 64, 128, 256];

/// Number of tiles in a full set.
pub const TILE_COUNT: usize = 19;

#[derive(Debug, thiserror::Error)]
pub enum TilerError {
    #[error("Need 3 corner images (small, medium, large) instead of {0}")]
    WrongCornerCount(usize),

    #[error("All corner images need the same width: expected {expected}, found {found}")]
    MismatchedWidth { expected: u32, found: u32 },

    #[error("Corner width {0} not supported (expected one of {widths:?})", widths = CORNER_WIDTHS)]
    UnsupportedWidth(u32),
}

/// Height class of a corner wedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerSize {
    Small,
    Medium,
    Large,
}

impl CornerSize {
    pub const ALL: [CornerSize; 3] = [CornerSize::Small, CornerSize::Medium, CornerSize::Large];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Quadrant a corner is pasted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthWest,
    SouthWest,
    NorthEast,
    SouthEast,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::SouthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
    ];

    /// Mirror a corner sprite into this quadrant's orientation.
    pub fn orient(self, img: &RgbaImage) -> RgbaImage {
        match self {
            Quadrant::NorthWest => img.clone(),
            Quadrant::SouthWest => imageops::flip_vertical(img),
            Quadrant::NorthEast => imageops::flip_horizontal(img),
            Quadrant::SouthEast => imageops::rotate180(img),
        }
    }

    pub fn is_east(self) -> bool {
        matches!(self, Quadrant::NorthEast | Quadrant::SouthEast)
    }

    pub fn is_south(self) -> bool {
        matches!(self, Quadrant::SouthWest | Quadrant::SouthEast)
    }
}

/// Output canvas height class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    ExtraSmall,
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl SizeClass {
    /// Canvas height in eighths of the canvas width.
    fn height_eighths(self) -> u32 {
        match self {
            SizeClass::ExtraSmall => 2,
            SizeClass::Small => 3,
            SizeClass::Medium => 4,
            SizeClass::Large => 5,
            SizeClass::ExtraLarge => 6,
        }
    }
}

/// Vertical placement of a tile on the uniform-height canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    Top,
    Bottom,
    #[default]
    Center,
}

impl Alignment {
    /// Y offset of a `height`-tall tile on a `canvas_height`-tall canvas.
    ///
    /// May be negative when the tile is taller than the canvas.
    pub fn offset(self, canvas_height: u32, height: u32) -> i64 {
        let slack = canvas_height as i64 - height as i64;
        match self {
            Alignment::Top => 0,
            Alignment::Bottom => slack,
            Alignment::Center => slack.div_euclid(2),
        }
    }
}

/// Zoom level, from the corner sprite width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomLevel {
    X1,
    X2,
    X4,
    X8,
}

impl ZoomLevel {
    pub fn from_corner_width(width: u32) -> Result<Self, TilerError> {
        match width {
            32 => Ok(ZoomLevel::X1),
            64 => Ok(ZoomLevel::X2),
            128 => Ok(ZoomLevel::X4),
            256 => Ok(ZoomLevel::X8),
            other => Err(TilerError::UnsupportedWidth(other)),
        }
    }

    pub fn corner_width(self) -> u32 {
        match self {
            ZoomLevel::X1 => 32,
            ZoomLevel::X2 => 64,
            ZoomLevel::X4 => 128,
            ZoomLevel::X8 => 256,
        }
    }

    /// Tiles are two corners wide.
    pub fn canvas_width(self) -> u32 {
        self.corner_width() * 2
    }

    pub fn canvas_size(self, size: SizeClass) -> (u32, u32) {
        let width = self.canvas_width();
        (width, width / 8 * size.height_eighths())
    }

    /// Height every finished tile is placed on.
    pub fn uniform_height(self) -> u32 {
        self.canvas_width() / 8 * 5
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ZoomLevel::X1 => "1x",
            ZoomLevel::X2 => "2x",
            ZoomLevel::X4 => "4x",
            ZoomLevel::X8 => "8x",
        }
    }
}

/// Which corner goes into each quadrant, plus canvas size and alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRule {
    pub nw: CornerSize,
    pub sw: CornerSize,
    pub ne: CornerSize,
    pub se: CornerSize,
    pub size: SizeClass,
    pub align: Alignment,
}

impl TileRule {
    const fn new(
        [nw, sw, ne, se]: [CornerSize; 4],
        size: SizeClass,
        align: Alignment,
    ) -> Self {
        Self {
            nw,
            sw,
            ne,
            se,
            size,
            align,
        }
    }

    pub fn corner(&self, quadrant: Quadrant) -> CornerSize {
        match quadrant {
            Quadrant::NorthWest => self.nw,
            Quadrant::SouthWest => self.sw,
            Quadrant::NorthEast => self.ne,
            Quadrant::SouthEast => self.se,
        }
    }
}

/// Every slope of one ground type, in sprite order.
pub const TILE_RULES: [TileRule; TILE_COUNT] = {
    use Alignment::{Bottom, Center, Top};
    use CornerSize::{Large as L, Medium as M, Small as S};
    use SizeClass::{ExtraLarge, ExtraSmall, Large, Medium, Small};

    [
        TileRule::new([M, M, M, M], Medium, Center),
        TileRule::new([S, L, M, M], Medium, Center),
        TileRule::new([M, S, M, S], Small, Top),
        TileRule::new([S, M, M, S], Small, Center),
        TileRule::new([M, M, S, L], Medium, Center),
        TileRule::new([S, L, S, L], Medium, Bottom),
        TileRule::new([M, S, S, M], Small, Center),
        TileRule::new([S, M, S, M], Small, Bottom),
        TileRule::new([L, M, L, M], Large, Top),
        TileRule::new([M, L, L, M], Large, Center),
        TileRule::new([L, S, L, S], Medium, Top),
        TileRule::new([M, M, L, S], Medium, Center),
        TileRule::new([L, M, M, L], Large, Center),
        TileRule::new([M, L, M, L], Large, Bottom),
        TileRule::new([L, S, M, M], Medium, Center),
        TileRule::new([L, L, L, L], ExtraLarge, Center),
        TileRule::new([S, S, S, S], ExtraSmall, Center),
        TileRule::new([S, L, L, S], Medium, Center),
        TileRule::new([L, S, S, L], Medium, Center),
    ]
};

/// A corner wedge sprite with its height class and zoom level.
#[derive(Debug, Clone)]
pub struct CornerSprite {
    pub size: CornerSize,
    pub zoom: ZoomLevel,
    pub image: RgbaImage,
}

/// The three corner sprites of one ground type at one zoom level.
#[derive(Debug, Clone)]
pub struct CornerSet {
    zoom: ZoomLevel,
    sprites: [CornerSprite; 3],
}

impl CornerSet {
    /// Validate and convert `[small, medium, large]` corner images.
    ///
    /// Fails on a wrong image count, mismatched widths or an unsupported
    /// width, in that order of precedence.
    pub fn from_images(images: Vec<DynamicImage>) -> Result<Self, TilerError> {
        let [small, medium, large] = match <[DynamicImage; 3]>::try_from(images) {
            Ok(images) => images,
            Err(images) => return Err(TilerError::WrongCornerCount(images.len())),
        };
        let expected = small.width();
        for img in [&medium, &large] {
            if img.width() != expected {
                return Err(TilerError::MismatchedWidth {
                    expected,
                    found: img.width(),
                });
            }
        }
        let zoom = ZoomLevel::from_corner_width(expected)?;

        let sprite = |size, img: DynamicImage| CornerSprite {
            size,
            zoom,
            image: img.to_rgba8(),
        };
        Ok(Self {
            zoom,
            sprites: [
                sprite(CornerSize::Small, small),
                sprite(CornerSize::Medium, medium),
                sprite(CornerSize::Large, large),
            ],
        })
    }

    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    pub fn get(&self, size: CornerSize) -> &CornerSprite {
        &self.sprites[size.slot()]
    }

    pub fn image(&self, size: CornerSize) -> &RgbaImage {
        &self.get(size).image
    }
}

/// Options for the alignment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilerConfig {
    /// Alpha of the uniform-height background, `(0, 0, 0, canvas_alpha)`.
    ///
    /// The existing sprite sheets use 1 so the canvas never decodes as
    /// fully transparent garbage in the 32bpp pipeline.
    pub canvas_alpha: u8,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self { canvas_alpha: 1 }
    }
}

/// Paste the four corners of `rule` onto a transparent canvas.
pub fn composite_tile(corners: &CornerSet, rule: &TileRule) -> RgbaImage {
    let (width, height) = corners.zoom().canvas_size(rule.size);
    let mut canvas = RgbaImage::new(width, height);

    for quadrant in Quadrant::ALL {
        let corner = quadrant.orient(corners.image(rule.corner(quadrant)));
        let x = if quadrant.is_east() { (width / 2) as i64 } else { 0 };
        let y = if quadrant.is_south() {
            height as i64 - corner.height() as i64
        } else {
            0
        };
        paste_masked(&mut canvas, &corner, x, y);
    }
    canvas
}

/// Place a composited tile on a canvas of `uniform_height`.
pub fn align_tile(tile: &RgbaImage, uniform_height: u32, align: Alignment, config: &TilerConfig) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(tile.width(), uniform_height, Rgba([0, 0, 0, config.canvas_alpha]));
    let y = align.offset(uniform_height, tile.height());
    paste_masked(&mut canvas, tile, 0, y);
    canvas
}

/// Build all 19 tiles of a set, aligned to a common height.
///
/// The result is indexed like [`TILE_RULES`].
pub fn composite_tiles(corners: &CornerSet, config: &TilerConfig) -> Vec<RgbaImage> {
    let tiles: Vec<RgbaImage> = TILE_RULES.iter().map(|rule| composite_tile(corners, rule)).collect();

    let uniform_height = corners.zoom().uniform_height();
    tracing::debug!(
        "Aligning {} tiles ({} zoom) to {}x{}",
        tiles.len(),
        corners.zoom().suffix(),
        corners.zoom().canvas_width(),
        uniform_height
    );

    tiles
        .iter()
        .zip(TILE_RULES.iter())
        .map(|(tile, rule)| align_tile(tile, uniform_height, rule.align, config))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Solid corner of the given height; the top-left pixel is marked so
    /// mirroring is observable.
    pub fn corner(width: u32, height: u32, value: u8) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    pub fn corner_set(width: u32) -> CornerSet {
        let q = width / 4;
        CornerSet::from_images(vec![
            corner(width, q + 1, 40),
            corner(width, q + q / 2 + 1, 120),
            corner(width, 2 * q + 1, 200),
        ])
        .unwrap()
    }

    #[test]
    fn test_rule_table_shape() {
        assert_eq!(TILE_RULES.len(), 19);
        assert_eq!(TILE_RULES[15].size, SizeClass::ExtraLarge);
        assert_eq!(TILE_RULES[16].size, SizeClass::ExtraSmall);
        let aligned: Vec<(usize, Alignment)> = TILE_RULES
            .iter()
            .enumerate()
            .filter(|(_, r)| r.align != Alignment::Center)
            .map(|(i, r)| (i, r.align))
            .collect();
        assert_eq!(
            aligned,
            vec![
                (2, Alignment::Top),
                (5, Alignment::Bottom),
                (7, Alignment::Bottom),
                (8, Alignment::Top),
                (10, Alignment::Top),
                (13, Alignment::Bottom),
            ]
        );
    }

    #[test]
    fn test_canvas_sizes() {
        assert_eq!(ZoomLevel::X1.canvas_size(SizeClass::ExtraSmall), (64, 16));
        assert_eq!(ZoomLevel::X2.canvas_size(SizeClass::ExtraSmall), (128, 32));
        assert_eq!(ZoomLevel::X2.canvas_size(SizeClass::Medium), (128, 64));
        assert_eq!(ZoomLevel::X2.canvas_size(SizeClass::ExtraLarge), (128, 96));
        assert_eq!(ZoomLevel::X4.canvas_size(SizeClass::Large), (256, 160));
        assert_eq!(ZoomLevel::X4.canvas_size(SizeClass::Small), (256, 96));
        assert_eq!(ZoomLevel::X2.uniform_height(), 80);
    }

    #[test]
    fn test_zoom_from_corner_width() {
        assert_eq!(ZoomLevel::from_corner_width(32).unwrap(), ZoomLevel::X1);
        assert_eq!(ZoomLevel::from_corner_width(64).unwrap(), ZoomLevel::X2);
        assert_eq!(ZoomLevel::from_corner_width(128).unwrap(), ZoomLevel::X4);
        assert_eq!(corner_set(64).zoom().suffix(), "2x");
        assert_eq!(ZoomLevel::from_corner_width(256).unwrap(), ZoomLevel::X8);
        assert!(ZoomLevel::from_corner_width(48).is_err());
    }

    #[test]
    fn test_wrong_count() {
        let err = CornerSet::from_images(vec![corner(64, 10, 0), corner(64, 10, 0)]).unwrap_err();
        assert!(matches!(err, TilerError::WrongCornerCount(2)));
        let err = CornerSet::from_images(vec![corner(64, 10, 0); 4]).unwrap_err();
        assert!(matches!(err, TilerError::WrongCornerCount(4)));
    }

    #[test]
    fn test_mismatched_width() {
        let err = CornerSet::from_images(vec![corner(64, 10, 0), corner(64, 10, 0), corner(128, 10, 0)])
            .unwrap_err();
        assert!(matches!(
            err,
            TilerError::MismatchedWidth {
                expected: 64,
                found: 128
            }
        ));
    }

    #[test]
    fn test_unsupported_width() {
        let err = CornerSet::from_images(vec![corner(96, 10, 0); 3]).unwrap_err();
        assert!(matches!(err, TilerError::UnsupportedWidth(96)));
    }

    #[test]
    fn test_nineteen_tiles_of_uniform_height() {
        let corners = corner_set(64);
        let tiles = composite_tiles(&corners, &TilerConfig::default());
        assert_eq!(tiles.len(), TILE_COUNT);
        assert!(tiles.iter().all(|t| t.dimensions() == (128, 80)));
    }

    #[test]
    fn test_largest_and_smallest_canvas() {
        let corners = corner_set(64);
        let areas: Vec<u32> = TILE_RULES
            .iter()
            .map(|r| {
                let t = composite_tile(&corners, r);
                t.width() * t.height()
            })
            .collect();
        let max = *areas.iter().max().unwrap();
        let min = *areas.iter().min().unwrap();
        assert_eq!(areas[15], max);
        assert_eq!(areas[16], min);
        assert_eq!(areas.iter().filter(|&&a| a == max).count(), 1);
        assert_eq!(areas.iter().filter(|&&a| a == min).count(), 1);
    }

    #[test]
    fn test_corner_orientation() {
        let corners = corner_set(64);
        // Rule 0: all medium corners on a 128x64 canvas
        let tile = composite_tile(&corners, &TILE_RULES[0]);
        let h = corners.image(CornerSize::Medium).height();
        let (w, ch) = tile.dimensions();

        // Marker: NW top-left, NE top-right, SW bottom-left, SE bottom-right
        assert_eq!(tile.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(tile.get_pixel(w - 1, 0).0, [255, 0, 0, 255]);
        assert_eq!(tile.get_pixel(0, ch - 1).0, [255, 0, 0, 255]);
        assert_eq!(tile.get_pixel(w - 1, ch - 1).0, [255, 0, 0, 255]);
        assert_eq!(tile.get_pixel(w / 2, h / 2).0, [120, 120, 120, 255]);
    }

    #[test]
    fn test_transparent_corner_pixels_do_not_overwrite() {
        let mut small = RgbaImage::from_pixel(64, 24, Rgba([10, 10, 10, 255]));
        // Transparent lower half of the small corner
        for y in 12..24 {
            for x in 0..64 {
                small.put_pixel(x, y, Rgba([99, 99, 99, 0]));
            }
        }
        let corners = CornerSet::from_images(vec![
            DynamicImage::ImageRgba8(small),
            corner(64, 30, 120),
            corner(64, 40, 200),
        ])
        .unwrap();
        // Rule 16: four small corners on a 128x32 canvas
        let tile = composite_tile(&corners, &TILE_RULES[16]);
        // SW (flipped) starts at row 8 with its transparent rows, over NW's
        // opaque rows 8..12
        assert_eq!(tile.get_pixel(5, 10).0, [10, 10, 10, 255]);
        // Rows 12..20 are transparent in both and keep the empty canvas
        assert_eq!(tile.get_pixel(5, 14).0, [0, 0, 0, 0]);
        assert_eq!(tile.get_pixel(5, 24).0, [10, 10, 10, 255]);
    }

    #[test]
    fn test_top_alignment_anchors_at_zero() {
        let corners = corner_set(64);
        let config = TilerConfig::default();
        let tiles = composite_tiles(&corners, &config);
        for (i, rule) in TILE_RULES.iter().enumerate() {
            if rule.align != Alignment::Top {
                continue;
            }
            // NW marker lands on the first row regardless of corner height
            assert_eq!(tiles[i].get_pixel(0, 0).0, [255, 0, 0, 255], "tile {i}");
        }
    }

    #[test]
    fn test_bottom_and_center_alignment() {
        let corners = corner_set(64);
        let tiles = composite_tiles(&corners, &TilerConfig::default());
        let u = ZoomLevel::X2.uniform_height();

        // Tile 7 is bottom aligned: SW marker on the last row
        assert_eq!(tiles[7].get_pixel(0, u - 1).0, [255, 0, 0, 255]);

        // Tile 0 is centered: 64-tall canvas on 80 leaves 8 rows above
        assert_eq!(tiles[0].get_pixel(0, 8).0, [255, 0, 0, 255]);
        assert_eq!(tiles[0].get_pixel(0, 7).0, [0, 0, 0, 1]);
    }

    #[test]
    fn test_alignment_offsets() {
        assert_eq!(Alignment::Top.offset(80, 48), 0);
        assert_eq!(Alignment::Bottom.offset(80, 48), 32);
        assert_eq!(Alignment::Center.offset(80, 48), 16);
        assert_eq!(Alignment::Center.offset(80, 63), 8);
        // Taller than the canvas: floor division, like the reference sprites
        assert_eq!(Alignment::Center.offset(80, 96), -8);
        assert_eq!(Alignment::Center.offset(80, 97), -9);
        assert_eq!(Alignment::Bottom.offset(80, 96), -16);
    }

    #[test]
    fn test_canvas_alpha_config() {
        let corners = corner_set(64);
        let tiles = composite_tiles(&corners, &TilerConfig { canvas_alpha: 0 });
        assert_eq!(tiles[0].get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
