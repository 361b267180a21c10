//! Indexed-color images and their PNG encoding.
//!
//! The `image` crate cannot write paletted PNGs, so the encoder goes through
//! the `png` crate directly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::color::Rgb;
use crate::palette::PaletteIndex;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Failed to create {path:?}: {source}")]
    Create {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Png(#[from] png::EncodingError),
}

/// An 8bpp image: one palette index per pixel plus the color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    indices: Vec<PaletteIndex>,
    palette: Vec<Rgb>,
}

impl IndexedImage {
    /// # Panics
    /// If `indices.len() != width * height`.
    pub fn new(width: u32, height: u32, indices: Vec<PaletteIndex>, palette: Vec<Rgb>) -> Self {
        assert_eq!(indices.len(), width as usize * height as usize);
        Self {
            width,
            height,
            indices,
            palette,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major palette indices.
    pub fn indices(&self) -> &[PaletteIndex] {
        &self.indices
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    pub fn index_at(&self, x: u32, y: u32) -> PaletteIndex {
        self.indices[(y * self.width + x) as usize]
    }

    /// Color of the pixel at `(x, y)`, looked up through the color table.
    pub fn color_at(&self, x: u32, y: u32) -> Rgb {
        self.palette[self.index_at(x, y) as usize]
    }

    /// Expand back to a true-color image.
    pub fn to_rgb(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| self.color_at(x, y).into())
    }

    /// Encode as an 8-bit paletted PNG.
    pub fn write_png<W: Write>(&self, writer: W) -> Result<(), EncodeError> {
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(self.palette.iter().flat_map(|c| c.to_array()).collect::<Vec<u8>>());
        encoder.set_compression(png::Compression::Best);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.indices)?;
        writer.finish()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), EncodeError> {
        let file = File::create(path).map_err(|source| EncodeError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_png(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_is_paletted() {
        let palette = vec![Rgb(0, 0, 255), Rgb(10, 20, 30), Rgb::WHITE];
        let img = IndexedImage::new(3, 2, vec![0, 1, 2, 2, 1, 0], palette.clone());

        let mut bytes = Vec::new();
        img.write_png(&mut bytes).unwrap();

        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let mut reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.color_type, png::ColorType::Indexed);
        assert_eq!(info.bit_depth, png::BitDepth::Eight);
        assert_eq!(
            info.palette.as_deref(),
            Some(&[0u8, 0, 255, 10, 20, 30, 255, 255, 255][..])
        );

        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).unwrap();
        assert_eq!(&buf[..frame.buffer_size()], &[0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn test_save_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let img = IndexedImage::new(1, 1, vec![0], vec![Rgb::BLACK]);

        let path = dir.path().join("ok.png");
        img.save(&path).unwrap();
        assert!(path.exists());

        let err = img.save(&dir.path().join("missing/dir.png")).unwrap_err();
        assert!(matches!(err, EncodeError::Create { .. }));
    }

    #[test]
    fn test_to_rgb() {
        let img = IndexedImage::new(2, 1, vec![1, 0], vec![Rgb(1, 2, 3), Rgb(4, 5, 6)]);
        let rgb = img.to_rgb();
        assert_eq!(rgb.get_pixel(0, 0).0, [4, 5, 6]);
        assert_eq!(rgb.get_pixel(1, 0).0, [1, 2, 3]);
    }
}
