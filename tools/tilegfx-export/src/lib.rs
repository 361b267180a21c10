//! tilegfx-export library
//!
//! File-level wrappers around `tilegfx` used by the `tilegfx-export` binary
//! and by build manifests: loading inputs, naming and writing outputs.

pub mod input;
pub mod manifest;
pub mod output;
pub mod process;

pub use input::SourceImage;
pub use output::{mask_file_name, tile_file_name};
