//! tilegfx: sprite building blocks for an 8bpp isometric tile set
//!
//! Pure image transformations used by the asset pipeline. Nothing in here
//! touches global state or parses arguments; callers hand in decoded images
//! and explicit configuration structs, and get new images back.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`quantize`] | Map every distinct color of an image to the nearest palette entry |
//! | [`tiler`] | Composite the 19 isometric tile shapes from three corner sprites |
//! | [`mask`] | Build square alpha masks from the same corner sprites |
//! | [`ops`] | Autocrop, compositing, resizing and alpha reduction |
//! | [`palette`] | Palette definitions and reserved colors |
//! | [`indexed`] | Indexed-color image and its PNG encoder |
//!
//! # Usage
//!
//! ```no_run
//! use tilegfx::palette::PaletteBook;
//! use tilegfx::quantize::{quantize, QuantizeOptions};
//!
//! let book = PaletteBook::load("palettes.toml".as_ref()).unwrap();
//! let palette = book.get("dos").unwrap();
//! let img = image::open("sprite.png").unwrap();
//! let indexed = quantize(&img, palette, &QuantizeOptions::default()).unwrap();
//! indexed.save("sprite_8bpp.png".as_ref()).unwrap();
//! ```

pub mod blend;
pub mod color;
pub mod indexed;
pub mod mask;
pub mod ops;
pub mod palette;
pub mod quantize;
pub mod tiler;

pub use color::Rgb;
pub use indexed::IndexedImage;
pub use palette::{Palette, PaletteBook, PaletteError};
pub use quantize::{quantize, DistanceStrategy, QuantizeError, QuantizeOptions};
pub use tiler::{composite_tiles, CornerSet, TileRule, TilerConfig, TilerError, TILE_RULES};
