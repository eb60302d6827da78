//! stitchkit-pipeline: Pure cross-stitch pattern pipeline (sans-IO).
//!
//! Converts raster images into cross-stitch patterns through:
//! decode -> resample onto the stitch grid -> palette reduction ->
//! symbol assignment.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Files, terminals and clocks
//! belong to the caller.

pub mod decode;
pub mod diagnostics;
pub mod legend;
pub mod palette;
pub mod pattern;
pub mod pipeline;
pub mod resample;
pub mod types;

pub use legend::SymbolAlphabet;
pub use palette::PaletteReduction;
pub use pattern::{Cell, Legend, PaletteEntry, Pattern};
pub use pipeline::{Pipeline, StagedResult};
pub use resample::Sampling;
pub use types::{
    Dimensions, PhysicalSize, PipelineConfig, PipelineError, Rgb, RgbaImage, StitchGrid,
};

/// Generate a pattern from an already-decoded image.
///
/// # Pipeline steps
///
/// 1. Validate `config`
/// 2. Resample onto a `width_stitches x height_stitches` grid
/// 3. Reduce to at most `max_colors` colors and remap every cell
/// 4. Assign a unique symbol to each palette color
///
/// The result is a pure function of the image and the config.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] for zero stitch counts,
/// [`PipelineError::InvalidPaletteSize`] for a zero palette bound, and
/// [`PipelineError::EmptyInput`] for an image without pixels.
pub fn generate(image: &RgbaImage, config: &PipelineConfig) -> Result<Pattern, PipelineError> {
    config.validate()?;
    let grid = resample::resample(image, config.dimensions(), config.sampling)?;
    let reduction = palette::reduce(&grid, config.max_colors)?;
    let remapped = reduction.apply(&grid);
    Ok(legend::assign_symbols(&remapped, config.symbols))
}

/// Decode `image_bytes` and generate a pattern from them.
///
/// # Errors
///
/// As [`generate`], plus [`PipelineError::EmptyInput`] for empty bytes
/// and [`PipelineError::ImageDecode`] for undecodable data. The config
/// is validated before decoding.
pub fn generate_from_bytes(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<Pattern, PipelineError> {
    config.validate()?;
    let image = decode::decode(image_bytes)?;
    generate(&image, config)
}

/// Run the full pipeline and keep every intermediate stage output.
///
/// # Errors
///
/// As [`generate_from_bytes`].
pub fn generate_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .resample()?
        .reduce()?
        .assign_symbols()
        .into_result())
}
