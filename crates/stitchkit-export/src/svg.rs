//! SVG chart serializer.
//!
//! Renders a pattern as a printable stitching chart using the [`svg`]
//! crate for document construction and XML escaping:
//!
//! - one filled square per stitch in its palette color,
//! - the stitch's symbol centered in the square, in black or white ink
//!   depending on the fill's luminance,
//! - thin grid lines between stitches and thick lines every
//!   [`MAJOR_GRID_INTERVAL`] stitches (and along the border),
//! - an optional highlighted symbol whose stitches are outlined,
//! - a legend table beneath the grid.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and the generating
//! config for reproducibility.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::{Description, Element, Group, Line, Rectangle, Text, Title};
use svg::node::{self, Node};

use stitchkit_pipeline::{Pattern, Rgb};

/// Stitches between thick grid lines.
pub const MAJOR_GRID_INTERVAL: u32 = 10;

/// Default edge length of one stitch square in SVG user units.
pub const DEFAULT_CELL_SIZE: f64 = 20.0;

/// Ink used for symbols and grid lines on light fills.
const DARK_INK: &str = "#000000";
/// Ink used for symbols on dark fills.
const LIGHT_INK: &str = "#FFFFFF";
/// Outline color for highlighted stitches.
const HIGHLIGHT_COLOR: &str = "#FFD400";
/// Fills at or above this luminance get dark ink.
const INK_LUMINANCE_THRESHOLD: f64 = 128.0;

/// Height of one legend row in user units.
const LEGEND_ROW_HEIGHT: f64 = 24.0;
/// Gap between the grid and the legend table.
const LEGEND_MARGIN: f64 = 16.0;
/// Minimum document width so the legend text is never clipped.
const LEGEND_MIN_WIDTH: f64 = 320.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`PipelineConfig`](stitchkit_pipeline::PipelineConfig)
    /// emitted inside `<metadata>` so a chart records how it was made.
    pub config_json: Option<&'a str>,
}

/// Chart layout options.
#[derive(Debug, Clone)]
pub struct ChartOptions<'a> {
    /// Edge length of one stitch square in user units.
    pub cell_size: f64,
    /// Symbol whose stitches are outlined, if any.
    pub highlight: Option<&'a str>,
    /// Whether to draw the legend table beneath the grid.
    pub legend: bool,
}

impl Default for ChartOptions<'_> {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            highlight: None,
            legend: true,
        }
    }
}

/// Symbol ink that contrasts with `fill`.
#[must_use]
pub fn ink_for(fill: Rgb) -> &'static str {
    if fill.luminance() >= INK_LUMINANCE_THRESHOLD {
        DARK_INK
    } else {
        LIGHT_INK
    }
}

/// Whether grid line `index` is a thick line in a grid of `count` cells.
const fn is_major_line(index: u32, count: u32) -> bool {
    index % MAJOR_GRID_INTERVAL == 0 || index == count
}

/// Serialize a pattern into an SVG chart.
#[must_use]
pub fn to_svg(pattern: &Pattern, options: &ChartOptions<'_>, metadata: &SvgMetadata<'_>) -> String {
    let dimensions = pattern.dimensions();
    let cell = options.cell_size;
    let grid_width = f64::from(dimensions.width) * cell;
    let grid_height = f64::from(dimensions.height) * cell;

    #[allow(clippy::cast_precision_loss)]
    let legend_height = if options.legend {
        (pattern.palette().len() as f64).mul_add(LEGEND_ROW_HEIGHT, LEGEND_MARGIN * 2.0)
    } else {
        0.0
    };
    let width = if options.legend {
        grid_width.max(LEGEND_MIN_WIDTH)
    } else {
        grid_width
    };
    let height = grid_height + legend_height;

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(node::Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("stitchkit:config");
        config_el.assign("xmlns:stitchkit", "https://stitchkit.dev/ns/1");
        config_el.append(node::Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut cells = Group::new().set("id", "cells");
    let mut symbols = Group::new()
        .set("id", "symbols")
        .set("font-family", "sans-serif")
        .set("font-size", cell * 0.6)
        .set("text-anchor", "middle")
        .set("dominant-baseline", "central");
    let mut highlights = Group::new()
        .set("id", "highlight")
        .set("fill", "none")
        .set("stroke", HIGHLIGHT_COLOR)
        .set("stroke-width", cell * 0.15);

    for (y, row) in (0u32..).zip(pattern.rows()) {
        for (x, stitch) in (0u32..).zip(row) {
            let left = f64::from(x) * cell;
            let top = f64::from(y) * cell;
            cells = cells.add(
                Rectangle::new()
                    .set("x", left)
                    .set("y", top)
                    .set("width", cell)
                    .set("height", cell)
                    .set("fill", stitch.color.hex()),
            );
            symbols = symbols.add(
                Text::new(stitch.symbol)
                    .set("x", cell.mul_add(0.5, left))
                    .set("y", cell.mul_add(0.5, top))
                    .set("fill", ink_for(stitch.color)),
            );
            if options.highlight == Some(stitch.symbol) {
                let inset = cell * 0.075;
                highlights = highlights.add(
                    Rectangle::new()
                        .set("x", left + inset)
                        .set("y", top + inset)
                        .set("width", inset.mul_add(-2.0, cell))
                        .set("height", inset.mul_add(-2.0, cell)),
                );
            }
        }
    }

    doc = doc
        .add(cells)
        .add(symbols)
        .add(highlights)
        .add(grid_lines(dimensions.width, dimensions.height, cell));

    if options.legend {
        doc = doc.add(legend_table(pattern, grid_height + LEGEND_MARGIN));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Grid lines: thin between stitches, thick every
/// [`MAJOR_GRID_INTERVAL`] and on the border.
fn grid_lines(columns: u32, rows: u32, cell: f64) -> Group {
    let grid_width = f64::from(columns) * cell;
    let grid_height = f64::from(rows) * cell;
    let stroke = |major: bool| if major { 2.0 } else { 0.5 };

    let mut group = Group::new().set("id", "grid").set("stroke", DARK_INK);
    for x in 0..=columns {
        let at = f64::from(x) * cell;
        group = group.add(
            Line::new()
                .set("x1", at)
                .set("y1", 0)
                .set("x2", at)
                .set("y2", grid_height)
                .set("stroke-width", stroke(is_major_line(x, columns))),
        );
    }
    for y in 0..=rows {
        let at = f64::from(y) * cell;
        group = group.add(
            Line::new()
                .set("x1", 0)
                .set("y1", at)
                .set("x2", grid_width)
                .set("y2", at)
                .set("stroke-width", stroke(is_major_line(y, rows))),
        );
    }
    group
}

/// Legend table: swatch with symbol, hex key and stitch count per entry.
fn legend_table(pattern: &Pattern, top: f64) -> Group {
    let swatch = LEGEND_ROW_HEIGHT - 6.0;
    let mut group = Group::new()
        .set("id", "legend")
        .set("font-family", "sans-serif")
        .set("font-size", 12);

    for (row, entry) in (0u32..).zip(pattern.palette()) {
        let y = f64::from(row).mul_add(LEGEND_ROW_HEIGHT, top);
        group = group
            .add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", y)
                    .set("width", swatch)
                    .set("height", swatch)
                    .set("fill", entry.color.hex())
                    .set("stroke", DARK_INK)
                    .set("stroke-width", 0.5),
            )
            .add(
                Text::new(entry.symbol.as_str())
                    .set("x", swatch / 2.0)
                    .set("y", swatch.mul_add(0.5, y))
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "central")
                    .set("fill", ink_for(entry.color)),
            )
            .add(
                Text::new(format!(
                    "{}  {}  {} stitches",
                    entry.symbol,
                    entry.key(),
                    entry.count,
                ))
                .set("x", swatch + 8.0)
                .set("y", swatch.mul_add(0.5, y))
                .set("dominant-baseline", "central")
                .set("fill", DARK_INK),
            );
    }
    group
}
