//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every call to [`generate_staged_with_diagnostics`] collects
//! diagnostics alongside the staged results. Time is read through the
//! injectable [`Clock`] trait so this crate never touches a platform
//! clock itself; callers supply one (the CLI uses `std::time::Instant`).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, StagedResult};
use crate::types::{PipelineConfig, PipelineError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: resampling onto the stitch grid.
    pub resample: StageDiagnostics,
    /// Stage 2: palette reduction and remapping.
    pub reduce: StageDiagnostics,
    /// Stage 3: symbol assignment.
    pub symbols: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Resampling metrics.
    Resample {
        /// Source image width in pixels.
        source_width: u32,
        /// Source image height in pixels.
        source_height: u32,
        /// Grid width in stitches.
        width: u32,
        /// Grid height in stitches.
        height: u32,
        /// Sampling policy used.
        sampling: String,
    },
    /// Palette reduction metrics.
    Reduce {
        /// Distinct colors in the resampled grid.
        distinct_colors: usize,
        /// Configured palette bound.
        max_colors: u32,
        /// Colors in the reduced palette.
        palette_size: usize,
        /// Clustering iterations run (0 when no reduction was needed).
        iterations: usize,
        /// Whether every color survived unchanged.
        lossless: bool,
    },
    /// Symbol assignment metrics.
    Symbols {
        /// Legend entries produced.
        legend_size: usize,
        /// Alphabet the symbols were drawn from.
        alphabet: String,
        /// Total cells in the pattern.
        cell_count: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Grid width in stitches.
    pub stitch_width: u32,
    /// Grid height in stitches.
    pub stitch_height: u32,
    /// Colors in the final legend.
    pub palette_size: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} -> {}x{} stitches",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.stitch_width,
            self.summary.stitch_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Resample", &self.resample),
            ("Reduce", &self.reduce),
            ("Symbols", &self.symbols),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Palette: {} colors", self.summary.palette_size));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Resample {
            source_width,
            source_height,
            width,
            height,
            sampling,
        } => format!("{source_width}x{source_height} -> {width}x{height} ({sampling})"),
        StageMetrics::Reduce {
            distinct_colors,
            max_colors,
            palette_size,
            iterations,
            lossless,
        } => {
            if *lossless {
                format!("{distinct_colors} colors <= {max_colors}, kept as-is")
            } else {
                format!(
                    "{distinct_colors} -> {palette_size} colors (max {max_colors}, {iterations} iterations)",
                )
            }
        }
        StageMetrics::Symbols {
            legend_size,
            alphabet,
            cell_count,
        } => format!("{legend_size} symbols ({alphabet}) over {cell_count} cells"),
    }
}

/// Run the staged pipeline, timing every stage with `clock`.
///
/// # Errors
///
/// Propagates any error from the pipeline stages; see
/// [`crate::generate_staged`].
pub fn generate_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: decoded.metrics(),
    };

    let t = clock.now();
    let resampled = decoded.resample()?;
    let resample = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: resampled.metrics(),
    };

    let t = clock.now();
    let reduced = resampled.reduce()?;
    let reduce = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: reduced.metrics(),
    };

    let t = clock.now();
    let symbolized = reduced.assign_symbols();
    let symbols = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: symbolized.metrics(),
    };

    let total_duration = clock.elapsed(&start);
    let staged = symbolized.into_result();

    let summary = PipelineSummary {
        image_width: staged.source_dimensions.width,
        image_height: staged.source_dimensions.height,
        stitch_width: staged.pattern.dimensions().width,
        stitch_height: staged.pattern.dimensions().height,
        palette_size: staged.pattern.palette().len(),
    };

    Ok((
        staged,
        PipelineDiagnostics {
            decode,
            resample,
            reduce,
            symbols,
            total_duration,
            summary,
        },
    ))
}
