//! tilegfx-export - tile set asset tool
//!
//! Composites isometric tiles from corner sprites, builds their masks and
//! converts sprites to the game's 8bpp palettes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use tilegfx::mask::MaskStyle;
use tilegfx::ops::{CompositeMode, ResizeFilter, ResizeSpec};
use tilegfx::palette::{PaletteBook, ReservedOptions};
use tilegfx::{DistanceStrategy, QuantizeOptions, Rgb, TilerConfig};

use tilegfx_export::{input, manifest, output, process, SourceImage};

#[derive(Parser)]
#[command(name = "tilegfx-export")]
#[command(about = "Tile set asset tool: tiles, masks and 8bpp conversion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an image to an 8bpp palette
    Quantize {
        /// Input PNG/JPG/XCF file
        input: PathBuf,

        /// Output indexed PNG
        output: PathBuf,

        #[command(flatten)]
        palette: PaletteArgs,

        /// XCF layers to merge (all if omitted)
        #[arg(long, num_args = 1..)]
        layers: Vec<String>,
    },

    /// Composite the 19 tile shapes from three corner sprites
    Tile {
        /// Small, medium and large corner sprites, in that order
        #[arg(required = true)]
        corners: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name stem for the tiles
        #[arg(long, default_value = "tile")]
        stem: String,

        /// Alpha of the empty canvas around aligned tiles
        #[arg(long, default_value_t = TilerConfig::default().canvas_alpha)]
        canvas_alpha: u8,
    },

    /// Build square alpha masks from three corner sprites
    Masks {
        /// Small, medium and large corner sprites, in that order
        #[arg(required = true)]
        corners: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name prefix for the masks
        #[arg(long, default_value = "mask_")]
        prefix: String,

        /// Opaque background color ("r,g,b" or "#rrggbb")
        #[arg(long)]
        background: Option<Rgb>,
    },

    /// Run general operations on one image
    Process {
        /// Input PNG/JPG/XCF file
        input: PathBuf,

        /// Output PNG
        output: PathBuf,

        /// XCF layers to merge (all if omitted)
        #[arg(long, num_args = 1..)]
        layers: Vec<String>,

        /// Image combined with the input, anchored top-left
        #[arg(long)]
        composite: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = CompositeArg::Over)]
        composite_mode: CompositeArg,

        /// Scale ("0.5") or size ("64x32", "64x", "x32")
        #[arg(long)]
        resize: Option<ResizeSpec>,

        #[arg(long, value_enum, default_value_t = FilterArg::Antialias)]
        filter: FilterArg,

        /// Snap alpha: >= threshold becomes opaque, the rest transparent
        #[arg(long)]
        reduce_alpha: Option<u8>,

        /// Crop empty borders and print the offset
        #[arg(long)]
        autocrop: bool,

        /// Convert to this 8bpp palette as the last step
        #[arg(long, requires = "palettes")]
        palette: Option<String>,

        /// Palette book (TOML)
        #[arg(long, requires = "palette")]
        palettes: Option<PathBuf>,

        /// Do not reserve action colors
        #[arg(long)]
        no_action: bool,

        /// Do not reserve company colors
        #[arg(long)]
        no_company: bool,
    },

    /// Build every job in a manifest file
    Build {
        /// Path to the manifest
        #[arg(default_value = manifest::MANIFEST_FILE)]
        manifest: PathBuf,
    },

    /// Validate manifest without building
    Check {
        /// Path to the manifest
        #[arg(default_value = manifest::MANIFEST_FILE)]
        manifest: PathBuf,
    },
}

#[derive(clap::Args)]
struct PaletteArgs {
    /// Palette book (TOML)
    #[arg(long)]
    palettes: PathBuf,

    /// Palette name in the book
    #[arg(long, default_value = "dos")]
    palette: String,

    /// Do not reserve action colors
    #[arg(long)]
    no_action: bool,

    /// Do not reserve company colors
    #[arg(long)]
    no_company: bool,

    #[arg(long, value_enum, default_value_t = StrategyArg::Batched)]
    strategy: StrategyArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Exhaustive,
    Batched,
}

impl From<StrategyArg> for DistanceStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Exhaustive => DistanceStrategy::Exhaustive,
            StrategyArg::Batched => DistanceStrategy::Batched,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CompositeArg {
    Over,
    In,
}

impl From<CompositeArg> for CompositeMode {
    fn from(arg: CompositeArg) -> Self {
        match arg {
            CompositeArg::Over => CompositeMode::Over,
            CompositeArg::In => CompositeMode::In,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Nearest,
    Bilinear,
    Bicubic,
    Antialias,
}

impl From<FilterArg> for ResizeFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Nearest => ResizeFilter::Nearest,
            FilterArg::Bilinear => ResizeFilter::Bilinear,
            FilterArg::Bicubic => ResizeFilter::Bicubic,
            FilterArg::Antialias => ResizeFilter::Antialias,
        }
    }
}

fn load_palettes(path: &Path) -> Result<PaletteBook> {
    PaletteBook::load(path).with_context(|| format!("Failed to load palettes: {:?}", path))
}

fn reserved(no_action: bool, no_company: bool) -> ReservedOptions {
    ReservedOptions {
        keep_action: !no_action,
        keep_company: !no_company,
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quantize {
            input,
            output,
            palette,
            layers,
        } => {
            let book = load_palettes(&palette.palettes)?;
            let pal = book.get(&palette.palette)?;
            let options = QuantizeOptions {
                reserved: reserved(palette.no_action, palette.no_company),
                strategy: palette.strategy.into(),
            };

            let src = SourceImage::from_path(input, &layers);
            tracing::info!("Converting {:?} -> {:?} ({})", src.path(), output, pal.name());
            let img = src.load()?;
            let indexed = tilegfx::quantize(&img, pal, &options)
                .with_context(|| format!("Failed to quantize {:?}", src.path()))?;
            process::Processed::Indexed(indexed).save(&output)?;
            tracing::info!("Done!");
        }

        Commands::Tile {
            corners,
            output,
            stem,
            canvas_alpha,
        } => {
            let corners = input::load_corners(&corners)?;
            output::write_tiles(&corners, &TilerConfig { canvas_alpha }, &output, &stem)?;
            tracing::info!("Done!");
        }

        Commands::Masks {
            corners,
            output,
            prefix,
            background,
        } => {
            let corners = input::load_corners(&corners)?;
            output::write_masks(&corners, &MaskStyle { background }, &output, &prefix)?;
            tracing::info!("Done!");
        }

        Commands::Process {
            input,
            output,
            layers,
            composite,
            composite_mode,
            resize,
            filter,
            reduce_alpha,
            autocrop,
            palette,
            palettes,
            no_action,
            no_company,
        } => {
            let book = palettes.as_deref().map(load_palettes).transpose()?;
            let pal = match (&book, &palette) {
                (Some(book), Some(name)) => Some(book.get(name)?),
                _ => None,
            };
            let quantize_options = QuantizeOptions {
                reserved: reserved(no_action, no_company),
                ..Default::default()
            };
            let options = process::ProcessOptions {
                composite: composite.map(|path| (path, composite_mode.into())),
                resize: resize.map(|spec| (spec, filter.into())),
                reduce_alpha,
                autocrop,
            };

            let src = SourceImage::from_path(input, &layers);
            tracing::info!("Processing {:?} -> {:?}", src.path(), output);
            let img = src.load()?;
            let (processed, offset) =
                process::run(img, &options, pal.map(|p| (p, &quantize_options)))?;
            processed.save(&output)?;
            if let Some((x, y)) = offset {
                println!("{} {}", x, y);
            }
            tracing::info!("Done!");
        }

        Commands::Build { manifest } => {
            tracing::info!("Building tile set from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config)?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }
    }

    Ok(())
}
