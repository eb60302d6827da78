//! stitchkit-export: Pure format serializers (sans-IO)
//!
//! Converts finished patterns into output formats: a JSON document that
//! loads back losslessly, an SVG stitching chart, and a PNG preview.

pub mod document;
pub mod png;
pub mod svg;

pub use document::{FORMAT_TAG, FORMAT_VERSION, from_json, to_json};
pub use png::{PreviewOptions, render_preview, to_png};
pub use svg::{ChartOptions, SvgMetadata, to_svg};

/// Errors that can occur while serializing a pattern.
///
/// Loading reports [`stitchkit_pipeline::PipelineError`] instead, since a
/// malformed document is a pattern validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The preview block size leaves no room to draw a stitch.
    #[error("invalid preview cell size {0}")]
    InvalidCellSize(u32),

    /// The preview would exceed the maximum image dimensions.
    #[error("preview image is too large")]
    ImageTooLarge,
}
