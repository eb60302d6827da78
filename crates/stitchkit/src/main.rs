//! stitchkit: turn images into cross-stitch patterns from the command line.
//!
//! ```text
//! stitchkit generate photo.jpg --width 80 --height 60 --max-colors 20 \
//!     --json photo.pattern.json --svg photo.svg --png photo.png
//! stitchkit render photo.pattern.json --svg chart.svg --highlight C
//! stitchkit legend photo.pattern.json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`; `--verbose`
//! turns on debug output for every stitchkit crate.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use stitchkit_export::{ChartOptions, PreviewOptions, SvgMetadata};
use stitchkit_pipeline::diagnostics::Clock;
use stitchkit_pipeline::{Pattern, PhysicalSize, PipelineConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Turn images into cross-stitch patterns.
#[derive(Parser)]
#[command(name = "stitchkit", version)]
struct Cli {
    /// Enable debug logging (overrides `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a pattern from an image.
    Generate(GenerateArgs),
    /// Re-render a saved pattern without regenerating it.
    Render(RenderArgs),
    /// Print the legend of a saved pattern with stitch counts.
    Legend(LegendArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP, GIF).
    image_path: PathBuf,

    /// Pattern width in stitches.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_WIDTH_STITCHES, conflicts_with = "width_mm")]
    width: u32,

    /// Pattern height in stitches.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HEIGHT_STITCHES, conflicts_with = "height_mm")]
    height: u32,

    /// Finished width in millimetres (derives the stitch count).
    #[arg(long, requires = "height_mm")]
    width_mm: Option<f64>,

    /// Finished height in millimetres (derives the stitch count).
    #[arg(long, requires = "width_mm")]
    height_mm: Option<f64>,

    /// Fabric count in stitches per inch, used with `--width-mm`/`--height-mm`.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_COUNT_PER_INCH)]
    count: f64,

    /// Maximum number of colors in the palette.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_COLORS)]
    max_colors: u32,

    /// How each stitch's color is taken from the image.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_SAMPLING)]
    sampling: Sampling,

    /// Alphabet for legend symbols.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_SYMBOLS)]
    symbols: Symbols,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Save the pattern as a JSON document.
    #[arg(long)]
    json: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,

    /// Print per-stage diagnostics.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    diagnostics_json: bool,
}

#[derive(Args)]
struct RenderArgs {
    /// Path to a saved pattern document.
    pattern_path: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct LegendArgs {
    /// Path to a saved pattern document.
    pattern_path: PathBuf,
}

/// Chart and preview outputs shared by `generate` and `render`.
#[derive(Args)]
struct OutputArgs {
    /// Write an SVG stitching chart.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write a PNG preview.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Stitch size: SVG user units and PNG pixels.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    cell_size: Option<u32>,

    /// Outline every stitch using this symbol in the SVG chart.
    #[arg(long)]
    highlight: Option<String>,

    /// Leave grid lines out of the PNG preview.
    #[arg(long)]
    no_grid: bool,
}

/// Sampling policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Sampling {
    /// Mean color of the stitch's source region.
    Average,
    /// The single pixel at the region center.
    Center,
}

/// Symbol alphabet selection.
#[derive(Clone, Copy, ValueEnum)]
enum Symbols {
    /// `A`-`Z`, then `AA`, `AB`, ...
    Letters,
    /// Geometric glyphs.
    Glyphs,
}

const fn sampling_from_pipeline(s: stitchkit_pipeline::Sampling) -> Sampling {
    match s {
        stitchkit_pipeline::Sampling::Average => Sampling::Average,
        stitchkit_pipeline::Sampling::Center => Sampling::Center,
    }
}

const fn symbols_from_pipeline(s: stitchkit_pipeline::SymbolAlphabet) -> Symbols {
    match s {
        stitchkit_pipeline::SymbolAlphabet::Letters => Symbols::Letters,
        stitchkit_pipeline::SymbolAlphabet::Glyphs => Symbols::Glyphs,
    }
}

/// CLI defaults derived from the pipeline's so the two cannot diverge.
const CLI_DEFAULT_SAMPLING: Sampling = sampling_from_pipeline(PipelineConfig::DEFAULT_SAMPLING);
const CLI_DEFAULT_SYMBOLS: Symbols = symbols_from_pipeline(PipelineConfig::DEFAULT_SYMBOLS);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. A physical size, when given,
/// takes precedence over `--width`/`--height`.
fn config_from_args(args: &GenerateArgs) -> Result<PipelineConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let (width_stitches, height_stitches) = match (args.width_mm, args.height_mm) {
        (Some(width_mm), Some(height_mm)) => {
            let size = PhysicalSize {
                width_mm,
                height_mm,
                count_per_inch: args.count,
            };
            let stitches = size.to_stitches().map_err(|e| e.to_string())?;
            (stitches.width, stitches.height)
        }
        _ => (args.width, args.height),
    };

    Ok(PipelineConfig {
        width_stitches,
        height_stitches,
        max_colors: args.max_colors,
        sampling: match args.sampling {
            Sampling::Average => stitchkit_pipeline::Sampling::Average,
            Sampling::Center => stitchkit_pipeline::Sampling::Center,
        },
        symbols: match args.symbols {
            Symbols::Letters => stitchkit_pipeline::SymbolAlphabet::Letters,
            Symbols::Glyphs => stitchkit_pipeline::SymbolAlphabet::Glyphs,
        },
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(ref args) => run_generate(args),
        Command::Render(ref args) => run_render(args),
        Command::Legend(ref args) => run_legend(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(
            "stitchkit=debug,stitchkit_pipeline=debug,stitchkit_export=debug",
        )
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run_generate(args: &GenerateArgs) -> Result<(), String> {
    let config = config_from_args(args)?;

    let image_bytes = std::fs::read(&args.image_path)
        .map_err(|e| format!("Error reading {}: {e}", args.image_path.display()))?;
    tracing::info!(
        path = %args.image_path.display(),
        bytes = image_bytes.len(),
        "read source image",
    );

    let (staged, diagnostics) = stitchkit_pipeline::diagnostics::generate_staged_with_diagnostics(
        &image_bytes,
        &config,
        &StdClock,
    )
    .map_err(|e| format!("Pipeline error: {e}"))?;

    if args.diagnostics {
        if args.diagnostics_json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }
    }

    let pattern = staged.pattern;
    eprintln!(
        "Pattern: {} stitches, {} colors",
        pattern.dimensions(),
        pattern.palette().len(),
    );

    if let Some(ref json_path) = args.json {
        let json = stitchkit_export::to_json(&pattern).map_err(|e| e.to_string())?;
        write_output(json_path, json.as_bytes())?;
    }

    let title = args
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pattern");
    let config_json = serde_json::to_string(&config)
        .map_err(|e| format!("Error serializing config: {e}"))?;
    let desc = format!(
        "{} stitches, {} colors",
        pattern.dimensions(),
        pattern.palette().len(),
    );
    let metadata = SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: Some(&config_json),
    };
    write_renders(&pattern, &args.output, &metadata)?;

    let wrote_anything =
        args.json.is_some() || args.output.svg.is_some() || args.output.png.is_some();
    if !wrote_anything && !args.diagnostics {
        print_legend(&pattern);
    }
    Ok(())
}

fn run_render(args: &RenderArgs) -> Result<(), String> {
    if args.output.svg.is_none() && args.output.png.is_none() {
        return Err("Nothing to render: pass --svg and/or --png".to_owned());
    }
    let pattern = load_pattern(&args.pattern_path)?;
    let title = args
        .pattern_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pattern");
    let metadata = SvgMetadata {
        title: Some(title),
        ..SvgMetadata::default()
    };
    write_renders(&pattern, &args.output, &metadata)
}

fn run_legend(args: &LegendArgs) -> Result<(), String> {
    let pattern = load_pattern(&args.pattern_path)?;
    print_legend(&pattern);
    Ok(())
}

fn load_pattern(path: &Path) -> Result<Pattern, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let pattern = stitchkit_export::from_json(&json)
        .map_err(|e| format!("Error loading {}: {e}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        dimensions = %pattern.dimensions(),
        colors = pattern.palette().len(),
        "loaded pattern",
    );
    Ok(pattern)
}

/// Write the SVG chart and/or PNG preview requested by `output`.
fn write_renders(
    pattern: &Pattern,
    output: &OutputArgs,
    metadata: &SvgMetadata<'_>,
) -> Result<(), String> {
    if let Some(ref symbol) = output.highlight
        && pattern.entry_for_symbol(symbol).is_none()
    {
        return Err(format!("No legend entry uses symbol {symbol:?}"));
    }

    if let Some(ref svg_path) = output.svg {
        let options = ChartOptions {
            cell_size: output
                .cell_size
                .map_or(stitchkit_export::svg::DEFAULT_CELL_SIZE, f64::from),
            highlight: output.highlight.as_deref(),
            legend: true,
        };
        let svg = stitchkit_export::to_svg(pattern, &options, metadata);
        write_output(svg_path, svg.as_bytes())?;
    }

    if let Some(ref png_path) = output.png {
        let options = PreviewOptions {
            cell_size: output
                .cell_size
                .unwrap_or(PreviewOptions::DEFAULT_CELL_SIZE),
            grid: !output.no_grid,
        };
        let png = stitchkit_export::to_png(pattern, options).map_err(|e| e.to_string())?;
        write_output(png_path, &png)?;
    }

    Ok(())
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Print the legend as an aligned table: symbol, color key, stitch count.
fn print_legend(pattern: &Pattern) {
    let symbol_width = pattern
        .palette()
        .iter()
        .map(|entry| entry.symbol.chars().count())
        .max()
        .unwrap_or(0)
        .max("Symbol".len());

    println!("{:<symbol_width$}  {:<7}  {:>8}", "Symbol", "Color", "Stitches");
    println!("{}", "-".repeat(symbol_width + 19));
    for entry in pattern.palette() {
        // Pad by character count so multi-byte glyphs line up.
        let pad = symbol_width - entry.symbol.chars().count();
        println!(
            "{}{}  {}  {:>8}",
            entry.symbol,
            " ".repeat(pad),
            entry.key(),
            entry.count,
        );
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
