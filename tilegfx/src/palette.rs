//! Palette definitions and reserved colors.
//!
//! A palette is the full ordered color table of an 8bpp sprite plus a few
//! color groups with special meaning in the game engine. Those groups are
//! never quantized *into*; when they appear in a source image they pass
//! through unchanged. Everything else is matched against the neutral subset.
//!
//! Palettes are plain configuration data loaded from a TOML palette book:
//!
//! ```toml
//! [palettes.dos]
//! colors = [[0, 0, 255], [16, 16, 16], ...]   # full table, in index order
//! background = [0, 0, 255]
//! white = [255, 255, 255]
//! action = [[...], ...]
//! company = [[...], ...]
//! # neutral = [...]                           # optional, derived if omitted
//! ```

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::color::Rgb;

/// Maximum number of entries in an 8bpp color table.
pub const MAX_PALETTE_LEN: usize = 256;

/// Position of a color in the full palette table.
pub type PaletteIndex = u8;

/// Configuration errors in a palette definition.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("Palette '{palette}' has no colors")]
    Empty { palette: String },

    #[error("Palette '{palette}' has {len} colors (at most {max} allowed)", max = MAX_PALETTE_LEN)]
    TooLarge { palette: String, len: usize },

    #[error("Palette '{palette}': {group} color {color} is not in the full color table")]
    MissingColor {
        palette: String,
        group: &'static str,
        color: Rgb,
    },

    #[error("Palette '{palette}': reserved color {color} is listed as neutral")]
    ReservedInNeutral { palette: String, color: Rgb },

    #[error("Palette '{palette}' has no neutral colors to quantize into")]
    NoNeutralColors { palette: String },

    #[error("Unknown palette '{name}' (available: {available})")]
    Unknown { name: String, available: String },

    #[error("Failed to read palette file {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse palette file {path:?}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw palette definition as it appears in a palette book.
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteDef {
    pub colors: Vec<Rgb>,
    pub background: Rgb,
    pub white: Rgb,
    #[serde(default)]
    pub action: Vec<Rgb>,
    #[serde(default)]
    pub company: Vec<Rgb>,
    #[serde(default)]
    pub neutral: Option<Vec<Rgb>>,
}

/// A validated palette.
///
/// Every reserved and neutral color is guaranteed to be present in
/// [`colors`](Self::colors), so index lookups cannot fail for them.
#[derive(Debug, Clone)]
pub struct Palette {
    name: String,
    colors: Vec<Rgb>,
    background: Rgb,
    white: Rgb,
    action: Vec<Rgb>,
    company: Vec<Rgb>,
    neutral: Vec<Rgb>,
    index: HashMap<Rgb, PaletteIndex>,
}

impl Palette {
    /// Validate a definition and build its index table.
    pub fn new(name: impl Into<String>, def: PaletteDef) -> Result<Self, PaletteError> {
        let name = name.into();

        if def.colors.is_empty() {
            return Err(PaletteError::Empty { palette: name });
        }
        if def.colors.len() > MAX_PALETTE_LEN {
            return Err(PaletteError::TooLarge {
                palette: name,
                len: def.colors.len(),
            });
        }

        // First occurrence wins for duplicated entries
        let mut index = HashMap::with_capacity(def.colors.len());
        for (i, &c) in def.colors.iter().enumerate() {
            index.entry(c).or_insert(i as PaletteIndex);
        }

        let check = |group: &'static str, colors: &[Rgb]| -> Result<(), PaletteError> {
            match colors.iter().find(|c| !index.contains_key(*c)) {
                Some(&color) => Err(PaletteError::MissingColor {
                    palette: name.clone(),
                    group,
                    color,
                }),
                None => Ok(()),
            }
        };
        check("background", &[def.background])?;
        check("white", &[def.white])?;
        check("action", &def.action)?;
        check("company", &def.company)?;

        // Every group that can be reserved, whatever the quantize options
        let reserved: HashSet<Rgb> = [def.background, def.white]
            .into_iter()
            .chain(def.action.iter().copied())
            .chain(def.company.iter().copied())
            .collect();

        let neutral = match def.neutral {
            Some(neutral) => {
                check("neutral", &neutral)?;
                if let Some(&color) = neutral.iter().find(|c| reserved.contains(*c)) {
                    return Err(PaletteError::ReservedInNeutral {
                        palette: name,
                        color,
                    });
                }
                neutral
            }
            None => def
                .colors
                .iter()
                .copied()
                .filter(|c| !reserved.contains(c))
                .collect(),
        };
        if neutral.is_empty() {
            return Err(PaletteError::NoNeutralColors { palette: name });
        }

        Ok(Self {
            name,
            colors: def.colors,
            background: def.background,
            white: def.white,
            action: def.action,
            company: def.company,
            neutral,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full color table in index order.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn white(&self) -> Rgb {
        self.white
    }

    pub fn action(&self) -> &[Rgb] {
        &self.action
    }

    pub fn company(&self) -> &[Rgb] {
        &self.company
    }

    /// Candidate colors for quantization, in declaration order.
    pub fn neutral(&self) -> &[Rgb] {
        &self.neutral
    }

    /// Positional index of the first occurrence of `color`.
    pub fn index_of(&self, color: Rgb) -> Option<PaletteIndex> {
        self.index.get(&color).copied()
    }

    /// Color table flattened to `r, g, b, r, g, b, ...` (PNG `PLTE` layout).
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_array()).collect()
    }

    /// Colors that map to themselves under the given options.
    pub fn reserved(&self, options: ReservedOptions) -> HashSet<Rgb> {
        let mut reserved = HashSet::new();
        reserved.insert(self.background);
        reserved.insert(self.white);
        if options.keep_action {
            reserved.extend(self.action.iter().copied());
        }
        if options.keep_company {
            reserved.extend(self.company.iter().copied());
        }
        reserved
    }
}

/// Which optional color groups stay fixed points during quantization.
///
/// Disabling a group makes its colors ordinary source colors: they get
/// matched to the nearest neutral entry like anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedOptions {
    pub keep_action: bool,
    pub keep_company: bool,
}

impl Default for ReservedOptions {
    fn default() -> Self {
        Self {
            keep_action: true,
            keep_company: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaletteFile {
    #[serde(default)]
    palettes: BTreeMap<String, PaletteDef>,
}

/// Named palettes loaded from a TOML file.
#[derive(Debug, Clone, Default)]
pub struct PaletteBook {
    palettes: BTreeMap<String, Palette>,
}

impl PaletteBook {
    /// Load and validate every palette in a TOML palette book.
    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path).map_err(|source| PaletteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            PaletteError::Parse { source, .. } => PaletteError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse a palette book from TOML text.
    pub fn parse(content: &str) -> Result<Self, PaletteError> {
        let file: PaletteFile = toml::from_str(content).map_err(|source| PaletteError::Parse {
            path: Default::default(),
            source,
        })?;

        let mut palettes = BTreeMap::new();
        for (name, def) in file.palettes {
            let palette = Palette::new(name.clone(), def)?;
            tracing::debug!(
                "Loaded palette '{}': {} colors, {} neutral",
                name,
                palette.colors().len(),
                palette.neutral().len()
            );
            palettes.insert(name, palette);
        }
        Ok(Self { palettes })
    }

    pub fn insert(&mut self, palette: Palette) {
        self.palettes.insert(palette.name().to_string(), palette);
    }

    pub fn get(&self, name: &str) -> Result<&Palette, PaletteError> {
        self.palettes.get(name).ok_or_else(|| PaletteError::Unknown {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}
