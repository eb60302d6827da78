//! Shared types for the stitchkit pattern pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::legend::SymbolAlphabet;
use crate::resample::Sampling;

/// Re-export `RgbaImage` so downstream crates can hand decoded images to
/// the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// Millimetres per inch, used for fabric-count conversion.
pub const MM_PER_INCH: f64 = 25.4;

/// An opaque 8-bit RGB color.
///
/// The derived ordering compares red, then green, then blue, which is
/// exactly ascending order of the canonical `#RRGGBB` key. Tie-breaks
/// throughout the pipeline rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Canonical key: uppercase `#RRGGBB`.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse a `#RRGGBB` key (case-insensitive).
    ///
    /// Returns `None` for anything that is not exactly a `#` followed by
    /// six hex digits.
    #[must_use]
    pub fn from_hex(key: &str) -> Option<Self> {
        let digits = key.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        };
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Squared Euclidean distance in RGB space to a floating-point point.
    #[must_use]
    pub fn distance_squared(self, point: [f64; 3]) -> f64 {
        let dr = f64::from(self.r) - point[0];
        let dg = f64::from(self.g) - point[1];
        let db = f64::from(self.b) - point[2];
        dr.mul_add(dr, dg.mul_add(dg, db * db))
    }

    /// The color as a floating-point RGB point.
    #[must_use]
    pub fn to_point(self) -> [f64; 3] {
        [f64::from(self.r), f64::from(self.g), f64::from(self.b)]
    }

    /// Relative luminance in `[0, 255]` (Rec. 601 weights).
    ///
    /// Renderers use this to pick black or white symbol ink.
    #[must_use]
    pub fn luminance(self) -> f64 {
        0.299f64.mul_add(
            f64::from(self.r),
            0.587f64.mul_add(f64::from(self.g), 0.114 * f64::from(self.b)),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<image::Rgba<u8>> for Rgb {
    fn from(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self::new(r, g, b)
    }
}

/// Grid or image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`width * height`).
    #[must_use]
    pub fn cell_count(self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(usize::MAX)
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A row-major grid of one color per stitch, `(0, 0)` at the top-left.
///
/// Produced by the resampler and by palette remapping. A grid is never
/// mutated after construction; regeneration produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchGrid {
    dimensions: Dimensions,
    cells: Vec<Rgb>,
}

impl StitchGrid {
    /// Build a grid from row-major cells.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if `cells.len()` does
    /// not equal `dimensions.width * dimensions.height`.
    pub fn from_cells(dimensions: Dimensions, cells: Vec<Rgb>) -> Result<Self, PipelineError> {
        if cells.len() != dimensions.cell_count() {
            return Err(PipelineError::InvalidDimensions {
                width: dimensions.width,
                height: dimensions.height,
            });
        }
        Ok(Self { dimensions, cells })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> Rgb) -> Self {
        let mut cells = Vec::with_capacity(dimensions.cell_count());
        for y in 0..dimensions.height {
            for x in 0..dimensions.width {
                cells.push(f(x, y));
            }
        }
        Self { dimensions, cells }
    }

    /// A grid of the same dimensions with `f` applied to every cell.
    #[must_use]
    pub fn map(&self, f: impl FnMut(Rgb) -> Rgb) -> Self {
        Self {
            dimensions: self.dimensions,
            cells: self.cells.iter().copied().map(f).collect(),
        }
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Rgb] {
        &self.cells
    }

    /// Returns `true` if the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The color at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let index = usize::try_from(u64::from(y) * u64::from(self.dimensions.width) + u64::from(x))
            .ok()?;
        self.cells.get(index).copied()
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        let width = usize::try_from(self.dimensions.width).unwrap_or(usize::MAX);
        self.cells.chunks(width.max(1))
    }
}

/// Physical pattern size, converted to stitch counts via the fabric count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSize {
    /// Finished width in millimetres.
    pub width_mm: f64,
    /// Finished height in millimetres.
    pub height_mm: f64,
    /// Fabric count: stitches per inch (e.g. 14 for 14-count Aida).
    pub count_per_inch: f64,
}

impl PhysicalSize {
    /// Convert to stitch counts with `round(mm / 25.4 * count)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if any input is
    /// non-finite or non-positive, or if either axis rounds to zero
    /// stitches.
    pub fn to_stitches(self) -> Result<Dimensions, PipelineError> {
        let width = mm_to_stitches(self.width_mm, self.count_per_inch);
        let height = mm_to_stitches(self.height_mm, self.count_per_inch);
        match (width, height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Ok(Dimensions::new(width, height))
            }
            _ => Err(PipelineError::InvalidDimensions {
                width: width.unwrap_or(0),
                height: height.unwrap_or(0),
            }),
        }
    }
}

/// Convert a length in millimetres to a stitch count.
///
/// Returns `None` for non-finite, negative, or out-of-range inputs.
#[must_use]
pub fn mm_to_stitches(mm: f64, count_per_inch: f64) -> Option<u32> {
    if !mm.is_finite() || !count_per_inch.is_finite() || mm <= 0.0 || count_per_inch <= 0.0 {
        return None;
    }
    let stitches = (mm / MM_PER_INCH * count_per_inch).round();
    if stitches > f64::from(u32::MAX) {
        return None;
    }
    // Range checked above: finite, non-negative, at most u32::MAX.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(stitches as u32)
}

/// Configuration for pattern generation.
///
/// All fields have defaults matching a typical small 14-count design.
/// Invariants (`width_stitches`, `height_stitches`, `max_colors` all
/// positive) are checked by [`validate`](Self::validate), which every
/// pipeline entry point calls before doing any work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of stitch columns in the output pattern.
    pub width_stitches: u32,

    /// Number of stitch rows in the output pattern.
    pub height_stitches: u32,

    /// Upper bound on the number of palette colors (and legend entries).
    pub max_colors: u32,

    /// How a cell's color is computed from its source region.
    #[serde(default)]
    pub sampling: Sampling,

    /// Which alphabet legend symbols are drawn from.
    #[serde(default)]
    pub symbols: SymbolAlphabet,
}

impl PipelineConfig {
    /// Default number of stitch columns.
    pub const DEFAULT_WIDTH_STITCHES: u32 = 60;
    /// Default number of stitch rows.
    pub const DEFAULT_HEIGHT_STITCHES: u32 = 60;
    /// Default palette bound.
    pub const DEFAULT_MAX_COLORS: u32 = 30;
    /// Default fabric count (stitches per inch).
    pub const DEFAULT_COUNT_PER_INCH: f64 = 14.0;
    /// Default sampling policy.
    pub const DEFAULT_SAMPLING: Sampling = Sampling::Average;
    /// Default symbol alphabet.
    pub const DEFAULT_SYMBOLS: SymbolAlphabet = SymbolAlphabet::Letters;

    /// Build a config whose grid size is derived from a physical size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if the physical size
    /// does not convert to a positive stitch count on both axes.
    pub fn from_physical(size: PhysicalSize, max_colors: u32) -> Result<Self, PipelineError> {
        let stitches = size.to_stitches()?;
        Ok(Self {
            width_stitches: stitches.width,
            height_stitches: stitches.height,
            max_colors,
            ..Self::default()
        })
    }

    /// Target grid dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width_stitches, self.height_stitches)
    }

    /// Check the config invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] for a zero stitch
    /// count and [`PipelineError::InvalidPaletteSize`] for
    /// `max_colors == 0`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.width_stitches == 0 || self.height_stitches == 0 {
            return Err(PipelineError::InvalidDimensions {
                width: self.width_stitches,
                height: self.height_stitches,
            });
        }
        if self.max_colors == 0 {
            return Err(PipelineError::InvalidPaletteSize(self.max_colors));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width_stitches: Self::DEFAULT_WIDTH_STITCHES,
            height_stitches: Self::DEFAULT_HEIGHT_STITCHES,
            max_colors: Self::DEFAULT_MAX_COLORS,
            sampling: Self::DEFAULT_SAMPLING,
            symbols: Self::DEFAULT_SYMBOLS,
        }
    }
}

/// Errors that can occur while generating or loading a pattern.
///
/// Generation is all-or-nothing: no partial pattern is ever returned
/// alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty, the image has no pixels, or the
    /// grid to quantize has no cells.
    #[error("input is empty")]
    EmptyInput,

    /// A stitch count is zero (or a physical size converts to zero).
    #[error("invalid stitch dimensions {width}x{height}: both must be at least 1")]
    InvalidDimensions {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },

    /// `max_colors` is below 1.
    #[error("invalid palette size {0}: at least one color is required")]
    InvalidPaletteSize(u32),

    /// A saved pattern document failed shape or schema validation.
    #[error("malformed saved pattern: {0}")]
    MalformedSavedPattern(String),
}
