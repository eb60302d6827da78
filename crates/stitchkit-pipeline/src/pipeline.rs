//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::generate_staged`] which runs the entire pipeline in
//! one call, [`Pipeline`] lets the caller drive execution one step at a
//! time:
//!
//! ```rust
//! # use stitchkit_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::new(png, config)
//!     .decode()?
//!     .resample()?
//!     .reduce()?
//!     .assign_symbols();
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. No stage mutates an earlier result; a new run starts
//! again from [`Pipeline::new`].

use crate::diagnostics::StageMetrics;
use crate::palette::PaletteReduction;
use crate::pattern::Pattern;
use crate::types::{Dimensions, PipelineConfig, PipelineError, RgbaImage, StitchGrid};

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline from encoded image bytes.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending { config, source }
    }

    /// Start a pipeline from an already-decoded image, skipping the
    /// decode stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] or
    /// [`PipelineError::InvalidPaletteSize`] if `config` is invalid, and
    /// [`PipelineError::EmptyInput`] if the image has no pixels.
    pub fn from_image(image: RgbaImage, config: PipelineConfig) -> Result<Decoded, PipelineError> {
        config.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Decoded {
            config,
            original: image,
            source_len: 0,
        })
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image, and advance to the
    /// [`Decoded`] stage.
    ///
    /// The config is checked before decoding so invalid settings fail
    /// fast without touching the image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] or
    /// [`PipelineError::InvalidPaletteSize`] for an invalid config,
    /// [`PipelineError::EmptyInput`] if the source is empty, and
    /// [`PipelineError::ImageDecode`] if it cannot be decoded.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let source_len = self.source.len();
        let original = crate::decode::decode(&self.source)?;
        tracing::debug!(
            bytes = source_len,
            width = original.width(),
            height = original.height(),
            "decoded source image",
        );
        Ok(Decoded {
            config: self.config,
            original,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .resample() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.original.width(),
            height: self.original.height(),
            pixel_count: u64::from(self.original.width()) * u64::from(self.original.height()),
        }
    }

    /// Resample the image onto the stitch grid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] for zero stitch
    /// counts and [`PipelineError::EmptyInput`] for an image without
    /// pixels.
    pub fn resample(self) -> Result<Resampled, PipelineError> {
        let grid = crate::resample::resample(
            &self.original,
            self.config.dimensions(),
            self.config.sampling,
        )?;
        tracing::debug!(
            grid = %grid.dimensions(),
            sampling = %self.config.sampling,
            "resampled to stitch grid",
        );
        Ok(Resampled {
            config: self.config,
            original: self.original,
            grid,
        })
    }
}

// ───────────────────────── Stage 2: Resampled ────────────────────────

/// Pipeline state after resampling to the stitch grid.
#[must_use = "pipeline stages are consumed by advancing; call .reduce() to continue"]
pub struct Resampled {
    config: PipelineConfig,
    original: RgbaImage,
    grid: StitchGrid,
}

impl Resampled {
    /// The resampled, unreduced stitch grid.
    #[must_use]
    pub const fn grid(&self) -> &StitchGrid {
        &self.grid
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Resample {
            source_width: self.original.width(),
            source_height: self.original.height(),
            width: self.grid.dimensions().width,
            height: self.grid.dimensions().height,
            sampling: self.config.sampling.to_string(),
        }
    }

    /// Reduce the grid to at most `max_colors` colors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidPaletteSize`] if `max_colors` is
    /// zero and [`PipelineError::EmptyInput`] if the grid has no cells.
    pub fn reduce(self) -> Result<Reduced, PipelineError> {
        let reduction = crate::palette::reduce(&self.grid, self.config.max_colors)?;
        let remapped = reduction.apply(&self.grid);
        tracing::debug!(
            distinct = reduction.distinct_colors(),
            palette = reduction.representatives().len(),
            max_colors = self.config.max_colors,
            "reduced palette",
        );
        Ok(Reduced {
            config: self.config,
            original: self.original,
            grid: self.grid,
            reduction,
            remapped,
        })
    }
}

// ───────────────────────── Stage 3: Reduced ──────────────────────────

/// Pipeline state after palette reduction and remapping.
#[must_use = "pipeline stages are consumed by advancing; call .assign_symbols() to continue"]
pub struct Reduced {
    config: PipelineConfig,
    original: RgbaImage,
    grid: StitchGrid,
    reduction: PaletteReduction,
    remapped: StitchGrid,
}

impl Reduced {
    /// The palette reduction that was applied.
    #[must_use]
    pub const fn reduction(&self) -> &PaletteReduction {
        &self.reduction
    }

    /// The grid with every cell replaced by its representative.
    #[must_use]
    pub const fn remapped(&self) -> &StitchGrid {
        &self.remapped
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Reduce {
            distinct_colors: self.reduction.distinct_colors(),
            max_colors: self.config.max_colors,
            palette_size: self.reduction.representatives().len(),
            iterations: self.reduction.iterations(),
            lossless: self.reduction.is_lossless(),
        }
    }

    /// Assign symbols and produce the final pattern.
    pub fn assign_symbols(self) -> Symbolized {
        let pattern = crate::legend::assign_symbols(&self.remapped, self.config.symbols);
        tracing::debug!(
            legend = pattern.palette().len(),
            alphabet = %self.config.symbols,
            "assigned symbols",
        );
        Symbolized {
            config: self.config,
            original: self.original,
            grid: self.grid,
            reduction: self.reduction,
            pattern,
        }
    }
}

// ───────────────────────── Stage 4: Symbolized ───────────────────────

/// Final pipeline state: the pattern is complete.
#[must_use = "call .into_result() or .into_pattern() to take the output"]
pub struct Symbolized {
    config: PipelineConfig,
    original: RgbaImage,
    grid: StitchGrid,
    reduction: PaletteReduction,
    pattern: Pattern,
}

impl Symbolized {
    /// The finished pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Symbols {
            legend_size: self.pattern.palette().len(),
            alphabet: self.config.symbols.to_string(),
            cell_count: self.pattern.cell_indices().len(),
        }
    }

    /// Consume the pipeline and return only the pattern.
    #[must_use]
    pub fn into_pattern(self) -> Pattern {
        self.pattern
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            source_dimensions: Dimensions::new(self.original.width(), self.original.height()),
            original: self.original,
            grid: self.grid,
            reduction: self.reduction,
            pattern: self.pattern,
        }
    }
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 1: decoded source image.
    pub original: RgbaImage,
    /// Source image dimensions in pixels.
    pub source_dimensions: Dimensions,
    /// Stage 2: resampled stitch grid before reduction.
    pub grid: StitchGrid,
    /// Stage 3: the palette reduction applied to the grid.
    pub reduction: PaletteReduction,
    /// Stage 4: the final pattern.
    pub pattern: Pattern,
}
