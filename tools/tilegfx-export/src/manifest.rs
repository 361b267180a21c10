//! Manifest parsing and build orchestration
//!
//! Parses a tile set manifest (`tilegfx.toml`) and runs every job in it.
//! Relative paths in the manifest are resolved against its directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tilegfx::mask::MaskStyle;
use tilegfx::palette::{PaletteBook, ReservedOptions};
use tilegfx::{CornerSet, DistanceStrategy, IndexedImage, QuantizeOptions, Rgb, TilerConfig};

use crate::input::{self, SourceImage};
use crate::output;

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "tilegfx.toml";

/// Root manifest structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Palette book used by `[[quantize]]` jobs.
    #[serde(default)]
    pub palettes: Option<PathBuf>,
    #[serde(default)]
    pub tiles: Vec<TileJob>,
    #[serde(default)]
    pub masks: Vec<MaskJob>,
    #[serde(default)]
    pub quantize: Vec<QuantizeJob>,

    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileJob {
    pub corners: Vec<PathBuf>,
    pub output: PathBuf,
    #[serde(default = "default_stem")]
    pub stem: String,
    #[serde(default = "default_canvas_alpha")]
    pub canvas_alpha: u8,
}

fn default_stem() -> String {
    "tile".to_string()
}

fn default_canvas_alpha() -> u8 {
    TilerConfig::default().canvas_alpha
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskJob {
    pub corners: Vec<PathBuf>,
    pub output: PathBuf,
    #[serde(default = "default_mask_prefix")]
    pub prefix: String,
    /// `[r, g, b]`; masks get a near-transparent fill when omitted.
    #[serde(default)]
    pub background: Option<Rgb>,
}

fn default_mask_prefix() -> String {
    "mask_".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantizeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub palette: String,
    #[serde(default = "default_true")]
    pub keep_action: bool,
    #[serde(default = "default_true")]
    pub keep_company: bool,
    /// XCF layers to merge; all when empty.
    #[serde(default)]
    pub layers: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl QuantizeJob {
    pub fn options(&self) -> QuantizeOptions {
        QuantizeOptions {
            reserved: ReservedOptions {
                keep_action: self.keep_action,
                keep_company: self.keep_company,
            },
            strategy: DistanceStrategy::default(),
        }
    }
}

impl Manifest {
    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    fn load_palettes(&self) -> Result<Option<PaletteBook>> {
        let Some(path) = &self.palettes else {
            return Ok(None);
        };
        let path = self.resolve(path);
        let book = PaletteBook::load(&path)
            .with_context(|| format!("Failed to load palettes: {:?}", path))?;
        Ok(Some(book))
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.masks.is_empty() && self.quantize.is_empty()
    }
}

/// Parse manifest text; relative paths will resolve against `base_dir`.
pub fn parse_manifest(content: &str, base_dir: &Path) -> Result<Manifest> {
    let mut manifest: Manifest = toml::from_str(content)?;
    manifest.base_dir = base_dir.to_path_buf();
    Ok(manifest)
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let base_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
    parse_manifest(&content, &base_dir)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))
}

/// Validate a manifest without building
///
/// Corner images are decoded so size problems show up here, not halfway
/// through a build.
pub fn validate(manifest: &Manifest) -> Result<()> {
    let check_corners = |kind: &str, index: usize, corners: &[PathBuf]| -> Result<CornerSet> {
        if corners.len() != 3 {
            anyhow::bail!("{} job {} needs 3 corner images, got {}", kind, index, corners.len());
        }
        for corner in corners {
            let path = manifest.resolve(corner);
            if !path.exists() {
                anyhow::bail!("{} job {} corner not found: {:?}", kind, index, path);
            }
        }
        input::load_corners(&manifest.resolve_all(corners))
            .with_context(|| format!("{} job {}", kind, index))
    };

    for (i, job) in manifest.tiles.iter().enumerate() {
        if job.stem.is_empty() {
            anyhow::bail!("Tile job {} has an empty stem", i);
        }
        check_corners("Tile", i, &job.corners)?;
    }
    for (i, job) in manifest.masks.iter().enumerate() {
        check_corners("Mask", i, &job.corners)?;
    }

    if manifest.quantize.is_empty() {
        return Ok(());
    }
    let Some(book) = manifest.load_palettes()? else {
        anyhow::bail!("Manifest has quantize jobs but no `palettes` file");
    };
    for (i, job) in manifest.quantize.iter().enumerate() {
        let path = manifest.resolve(&job.input);
        if !path.exists() {
            anyhow::bail!("Quantize job {} input not found: {:?}", i, path);
        }
        book.get(&job.palette)
            .with_context(|| format!("Quantize job {} ({:?})", i, job.input))?;
    }
    Ok(())
}

/// A job with all inputs decoded and checked, ready to write.
enum PlannedJob {
    Tiles {
        corners: CornerSet,
        config: TilerConfig,
        dir: PathBuf,
        stem: String,
    },
    Masks {
        corners: CornerSet,
        style: MaskStyle,
        dir: PathBuf,
        prefix: String,
    },
    Quantize {
        image: IndexedImage,
        out: PathBuf,
    },
}

impl PlannedJob {
    fn write(&self) -> Result<()> {
        match self {
            PlannedJob::Tiles {
                corners,
                config,
                dir,
                stem,
            } => {
                tracing::info!("Compositing tiles: {} -> {:?}", stem, dir);
                output::write_tiles(corners, config, dir, stem)?;
            }
            PlannedJob::Masks {
                corners,
                style,
                dir,
                prefix,
            } => {
                tracing::info!("Building masks: {} -> {:?}", prefix, dir);
                output::write_masks(corners, style, dir, prefix)?;
            }
            PlannedJob::Quantize { image, out } => {
                tracing::info!("Writing 8bpp image: {:?}", out);
                output::ensure_parent(out)?;
                image
                    .save(out)
                    .with_context(|| format!("Failed to write 8bpp image: {:?}", out))?;
            }
        }
        Ok(())
    }
}

/// Decode every input and run every conversion that can fail.
fn plan(manifest: &Manifest) -> Result<Vec<PlannedJob>> {
    let mut jobs = Vec::new();

    for job in &manifest.tiles {
        jobs.push(PlannedJob::Tiles {
            corners: input::load_corners(&manifest.resolve_all(&job.corners))?,
            config: TilerConfig {
                canvas_alpha: job.canvas_alpha,
            },
            dir: manifest.resolve(&job.output),
            stem: job.stem.clone(),
        });
    }

    for job in &manifest.masks {
        jobs.push(PlannedJob::Masks {
            corners: input::load_corners(&manifest.resolve_all(&job.corners))?,
            style: MaskStyle {
                background: job.background,
            },
            dir: manifest.resolve(&job.output),
            prefix: job.prefix.clone(),
        });
    }

    if let Some(book) = manifest.load_palettes()? {
        for job in &manifest.quantize {
            let palette = book.get(&job.palette)?;
            let src = SourceImage::from_path(manifest.resolve(&job.input), &job.layers);
            tracing::info!("Quantizing: {:?} ({})", src.path(), palette.name());

            let img = src.load()?;
            let image = tilegfx::quantize(&img, palette, &job.options())
                .with_context(|| format!("Failed to quantize {:?}", src.path()))?;
            jobs.push(PlannedJob::Quantize {
                image,
                out: manifest.resolve(&job.output),
            });
        }
    }

    Ok(jobs)
}

/// Build all jobs from a manifest
///
/// Every input is decoded and converted before the first file is written,
/// so a bad entry anywhere leaves the output untouched.
pub fn build_all(manifest: &Manifest) -> Result<()> {
    validate(manifest)?;
    if manifest.is_empty() {
        tracing::warn!("Manifest has no jobs");
        return Ok(());
    }

    let jobs = plan(manifest)?;
    for job in &jobs {
        job.write()?;
    }
    Ok(())
}
