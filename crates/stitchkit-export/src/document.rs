//! JSON pattern document: save a finished pattern and load it back.
//!
//! ```json
//! {
//!   "format": "stitchkit-pattern",
//!   "version": 1,
//!   "width": 2,
//!   "height": 2,
//!   "legend": { "#0000FF": "A", "#FF0000": "B" },
//!   "cells": ["B A", "B A"]
//! }
//! ```
//!
//! `legend` lists canonical `#RRGGBB` keys in palette order. Each entry
//! of `cells` is one row, top to bottom, with the row's symbols
//! separated by single spaces. Loading validates the whole document and
//! rebuilds the exact same [`Pattern`]; nothing is recomputed.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use stitchkit_pipeline::{Dimensions, Pattern, PipelineError, Rgb};

use crate::ExportError;

/// Value of the `format` field.
pub const FORMAT_TAG: &str = "stitchkit-pattern";

/// Value of the `version` field written by [`to_json`] and the only
/// version [`from_json`] accepts.
pub const FORMAT_VERSION: u32 = 1;

/// Separator between symbols within a row.
const SYMBOL_SEPARATOR: char = ' ';

#[derive(Debug, Serialize, Deserialize)]
struct PatternDocument {
    format: String,
    version: u32,
    width: u32,
    height: u32,
    #[serde(deserialize_with = "deserialize_legend")]
    legend: IndexMap<String, String>,
    cells: Vec<String>,
}

/// Reads the legend object in document order, failing on a repeated key
/// instead of letting the last occurrence win.
fn deserialize_legend<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LegendVisitor;

    impl<'de> Visitor<'de> for LegendVisitor {
        type Value = IndexMap<String, String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("an object mapping color keys to symbols")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut legend = IndexMap::new();
            while let Some((key, symbol)) = access.next_entry::<String, String>()? {
                match legend.entry(key) {
                    Entry::Occupied(entry) => {
                        return Err(de::Error::custom(format!(
                            "duplicate legend key {:?}",
                            entry.key(),
                        )));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(symbol);
                    }
                }
            }
            Ok(legend)
        }
    }

    deserializer.deserialize_map(LegendVisitor)
}

/// Serialize a pattern as a pretty-printed JSON document.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_json(pattern: &Pattern) -> Result<String, ExportError> {
    let separator = SYMBOL_SEPARATOR.to_string();
    let document = PatternDocument {
        format: FORMAT_TAG.to_owned(),
        version: FORMAT_VERSION,
        width: pattern.dimensions().width,
        height: pattern.dimensions().height,
        legend: pattern
            .palette()
            .iter()
            .map(|entry| (entry.key(), entry.symbol.clone()))
            .collect(),
        cells: pattern
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.symbol)
                    .collect::<Vec<_>>()
                    .join(&separator)
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Load a pattern from a JSON document produced by [`to_json`].
///
/// # Errors
///
/// Returns [`PipelineError::MalformedSavedPattern`] if the JSON does not
/// parse, the format tag or version is wrong, the dimensions are zero,
/// the row count or a row length does not match, a legend key is not a
/// canonical `#RRGGBB` color, a symbol is empty, contains whitespace or
/// is repeated, a cell uses a symbol missing from the legend, or a
/// legend entry is used by no cell.
pub fn from_json(json: &str) -> Result<Pattern, PipelineError> {
    let malformed = PipelineError::MalformedSavedPattern;

    let document: PatternDocument =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    if document.format != FORMAT_TAG {
        return Err(malformed(format!(
            "unexpected format {:?}, expected {FORMAT_TAG:?}",
            document.format,
        )));
    }
    if document.version != FORMAT_VERSION {
        return Err(malformed(format!(
            "unsupported version {}, expected {FORMAT_VERSION}",
            document.version,
        )));
    }

    let dimensions = Dimensions::new(document.width, document.height);
    if dimensions.is_empty() {
        return Err(malformed(format!("dimensions {dimensions} must be positive")));
    }
    let width = usize::try_from(document.width).map_err(|e| malformed(e.to_string()))?;
    let height = usize::try_from(document.height).map_err(|e| malformed(e.to_string()))?;
    if document.cells.len() != height {
        return Err(malformed(format!(
            "expected {height} rows, found {}",
            document.cells.len(),
        )));
    }

    let mut palette = Vec::with_capacity(document.legend.len());
    let mut index_of: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, (key, symbol)) in document.legend.iter().enumerate() {
        let color = Rgb::from_hex(key)
            .filter(|color| color.hex() == *key)
            .ok_or_else(|| malformed(format!("invalid legend key {key:?}")))?;
        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return Err(malformed(format!(
                "invalid symbol {symbol:?} for {key}: must be non-empty without whitespace",
            )));
        }
        if index_of.insert(symbol.as_str(), index).is_some() {
            return Err(malformed(format!("duplicate legend symbol {symbol:?}")));
        }
        palette.push((color, symbol.clone()));
    }

    // Grown from the rows actually present; the claimed width is only
    // trusted once every row has matched it.
    let mut cells = Vec::new();
    for (y, row) in document.cells.iter().enumerate() {
        let found = row.split(SYMBOL_SEPARATOR).count();
        if found != width {
            return Err(malformed(format!(
                "row {y} has {found} cells, expected {width}"
            )));
        }
        for symbol in row.split(SYMBOL_SEPARATOR) {
            let index = index_of
                .get(symbol)
                .ok_or_else(|| malformed(format!("row {y} uses unknown symbol {symbol:?}")))?;
            cells.push(*index);
        }
    }

    Pattern::from_parts(dimensions, palette, cells)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use stitchkit_pipeline::{StitchGrid, SymbolAlphabet, legend};

    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn quadrants() -> Pattern {
        let grid =
            StitchGrid::from_cells(Dimensions::new(2, 2), vec![RED, BLUE, RED, BLUE]).unwrap();
        legend::assign_symbols(&grid, SymbolAlphabet::Letters)
    }

    fn document(legend: &str, cells: &str) -> String {
        format!(
            r#"{{"format":"stitchkit-pattern","version":1,"width":2,"height":2,"legend":{legend},"cells":{cells}}}"#
        )
    }

    fn assert_malformed(json: &str, needle: &str) {
        match from_json(json) {
            Err(PipelineError::MalformedSavedPattern(msg)) => {
                assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}");
            }
            other => panic!("expected MalformedSavedPattern, got {other:?}"),
        }
    }

    #[test]
    fn writes_ordered_legend_and_symbol_rows() {
        let json = to_json(&quadrants()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], FORMAT_TAG);
        assert_eq!(value["version"], 1);
        assert_eq!(value["width"], 2);
        assert_eq!(value["cells"], serde_json::json!(["B A", "B A"]));

        let keys: Vec<&String> = value["legend"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["#0000FF", "#FF0000"]);
    }

    #[test]
    fn round_trip_restores_pattern_and_legend() {
        let pattern = quadrants();
        let loaded = from_json(&to_json(&pattern).unwrap()).unwrap();
        assert_eq!(loaded, pattern);
        assert_eq!(loaded.legend(), pattern.legend());
    }

    #[test]
    fn round_trip_keeps_multi_character_glyph_symbols() {
        let grid = StitchGrid::from_fn(Dimensions::new(6, 5), |x, y| {
            Rgb::new(u8::try_from(x * 40).unwrap(), u8::try_from(y * 50).unwrap(), 3)
        });
        let pattern = legend::assign_symbols(&grid, SymbolAlphabet::Glyphs);
        assert!(pattern.palette().iter().any(|e| e.symbol.chars().count() == 2));
        let loaded = from_json(&to_json(&pattern).unwrap()).unwrap();
        assert_eq!(loaded, pattern);
    }

    #[test]
    fn accepts_hand_written_document() {
        let json = document(r##"{"#FF0000":"x","#0000FF":"y"}"##, r#"["x y","y y"]"#);
        let pattern = from_json(&json).unwrap();
        assert_eq!(pattern.cell(0, 0).unwrap().color, RED);
        assert_eq!(pattern.palette()[1].count, 3);
    }

    #[test]
    fn rejects_invalid_json() {
        assert_malformed("{not json", "");
    }

    #[test]
    fn rejects_wrong_format_tag() {
        let json = document(r##"{"#FF0000":"A"}"##, r#"["A A","A A"]"#)
            .replace("stitchkit-pattern", "something-else");
        assert_malformed(&json, "unexpected format");
    }

    #[test]
    fn rejects_unknown_version() {
        let json = document(r##"{"#FF0000":"A"}"##, r#"["A A","A A"]"#)
            .replace("\"version\":1", "\"version\":2");
        assert_malformed(&json, "unsupported version 2");
    }

    #[test]
    fn rejects_zero_dimensions() {
        let json = document(r##"{"#FF0000":"A"}"##, "[]").replace("\"width\":2", "\"width\":0");
        assert_malformed(&json, "must be positive");
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let json = document(r##"{"#FF0000":"A"}"##, r#"["A A"]"#);
        assert_malformed(&json, "expected 2 rows");
    }

    #[test]
    fn rejects_row_length_mismatch() {
        let json = document(r##"{"#FF0000":"A"}"##, r#"["A A","A A A"]"#);
        assert_malformed(&json, "row 1 has 3 cells");
    }

    #[test]
    fn rejects_invalid_hex_key() {
        let json = document(r##"{"#GG0000":"A"}"##, r#"["A A","A A"]"#);
        assert_malformed(&json, "invalid legend key");
        let json = document(r##"{"#ff0000":"A"}"##, r#"["A A","A A"]"#);
        assert_malformed(&json, "invalid legend key");
    }

    #[test]
    fn rejects_duplicate_symbol() {
        let json = document(r##"{"#FF0000":"A","#0000FF":"A"}"##, r#"["A A","A A"]"#);
        assert_malformed(&json, "duplicate legend symbol");
    }

    #[test]
    fn rejects_unknown_symbol() {
        let json = document(r##"{"#FF0000":"A"}"##, r#"["A A","A Q"]"#);
        assert_malformed(&json, "unknown symbol \"Q\"");
    }

    #[test]
    fn rejects_unused_legend_entry() {
        let json = document(r##"{"#FF0000":"A","#0000FF":"B"}"##, r#"["A A","A A"]"#);
        assert_malformed(&json, "not used by any cell");
    }

    #[test]
    fn rejects_oversized_width_without_allocating_it() {
        let json = r##"{"format":"stitchkit-pattern","version":1,"width":4294967295,"height":1,"legend":{"#FF0000":"A"},"cells":["A"]}"##;
        assert_malformed(json, "row 0 has 1 cells, expected 4294967295");
    }

    #[test]
    fn rejects_duplicate_legend_key() {
        let json = r##"{"format":"stitchkit-pattern","version":1,"width":2,"height":1,"legend":{"#FF0000":"A","#FF0000":"B"},"cells":["B B"]}"##;
        assert_malformed(json, "duplicate legend key \"#FF0000\"");
    }

    #[test]
    fn rejects_whitespace_in_symbol() {
        let json = document(r##"{"#FF0000":"A B"}"##, r#"["A A","A A"]"#);
        assert_malformed(&json, "without whitespace");
    }
}
