//! The finished pattern: a symbol-labelled grid plus its legend.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Rgb, StitchGrid};

/// One palette color with its symbol and usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// Representative color.
    pub color: Rgb,
    /// Unique printable symbol.
    pub symbol: String,
    /// Number of cells using this entry.
    pub count: usize,
}

impl PaletteEntry {
    /// Stable identifier: the canonical `#RRGGBB` key.
    #[must_use]
    pub fn key(&self) -> String {
        self.color.hex()
    }
}

/// A resolved pattern cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'a> {
    /// The cell's palette color.
    pub color: Rgb,
    /// The symbol printed in the cell.
    pub symbol: &'a str,
}

/// Ordered mapping from canonical color key to symbol.
///
/// Iteration order is palette order. Equality is order-sensitive, so two
/// legends are equal only if they list the same pairs in the same order.
#[derive(Debug, Clone, Default, Eq)]
pub struct Legend(IndexMap<String, String>);

impl Legend {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the legend has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The symbol for a color, if it is in the palette.
    #[must_use]
    pub fn symbol_for(&self, color: Rgb) -> Option<&str> {
        self.0.get(&color.hex()).map(String::as_str)
    }

    /// `(key, symbol)` pairs in palette order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PartialEq for Legend {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl FromIterator<(String, String)> for Legend {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A cross-stitch pattern.
///
/// Cells are stored row-major as indices into the palette; every palette
/// entry is used by at least one cell, colors and symbols are pairwise
/// distinct, and entry counts match the cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    dimensions: Dimensions,
    palette: Vec<PaletteEntry>,
    cells: Vec<usize>,
}

impl Pattern {
    /// Construct from parts already known to satisfy the invariants.
    pub(crate) const fn from_validated(
        dimensions: Dimensions,
        palette: Vec<PaletteEntry>,
        cells: Vec<usize>,
    ) -> Self {
        Self {
            dimensions,
            palette,
            cells,
        }
    }

    /// Rebuild a pattern from an ordered `(color, symbol)` palette and
    /// row-major palette indices, as read back from a saved document.
    ///
    /// Usage counts are recomputed from the cells.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MalformedSavedPattern`] if the dimensions
    /// are zero, the cell count does not match, an index is out of range,
    /// a color or symbol is repeated, a symbol is empty, or a palette
    /// entry is used by no cell.
    pub fn from_parts(
        dimensions: Dimensions,
        palette: Vec<(Rgb, String)>,
        cells: Vec<usize>,
    ) -> Result<Self, PipelineError> {
        let malformed = |msg: String| Err(PipelineError::MalformedSavedPattern(msg));

        if dimensions.is_empty() {
            return malformed(format!("dimensions {dimensions} must be positive"));
        }
        if cells.len() != dimensions.cell_count() {
            return malformed(format!(
                "expected {} cells for {dimensions}, found {}",
                dimensions.cell_count(),
                cells.len(),
            ));
        }

        let mut colors = BTreeSet::new();
        let mut symbols = BTreeSet::new();
        for (color, symbol) in &palette {
            if symbol.is_empty() {
                return malformed(format!("empty symbol for {color}"));
            }
            if !colors.insert(*color) {
                return malformed(format!("duplicate legend color {color}"));
            }
            if !symbols.insert(symbol.as_str()) {
                return malformed(format!("duplicate legend symbol {symbol:?}"));
            }
        }

        let mut counts = vec![0usize; palette.len()];
        for &index in &cells {
            match counts.get_mut(index) {
                Some(count) => *count += 1,
                None => return malformed(format!("cell refers to unknown palette entry {index}")),
            }
        }
        if let Some(unused) = counts.iter().position(|&c| c == 0) {
            return malformed(format!(
                "legend entry {} is not used by any cell",
                palette[unused].0,
            ));
        }

        let palette = palette
            .into_iter()
            .zip(counts)
            .map(|((color, symbol), count)| PaletteEntry {
                color,
                symbol,
                count,
            })
            .collect();

        Ok(Self {
            dimensions,
            palette,
            cells,
        })
    }

    /// Pattern dimensions in stitches.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Palette entries in legend order.
    #[must_use]
    pub fn palette(&self) -> &[PaletteEntry] {
        &self.palette
    }

    /// Row-major palette indices.
    #[must_use]
    pub fn cell_indices(&self) -> &[usize] {
        &self.cells
    }

    /// The legend: canonical color key to symbol, in palette order.
    #[must_use]
    pub fn legend(&self) -> Legend {
        self.palette
            .iter()
            .map(|entry| (entry.key(), entry.symbol.clone()))
            .collect()
    }

    /// The palette entry for a symbol.
    #[must_use]
    pub fn entry_for_symbol(&self, symbol: &str) -> Option<&PaletteEntry> {
        self.palette.iter().find(|entry| entry.symbol == symbol)
    }

    /// The cell at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn cell(&self, x: u32, y: u32) -> Option<Cell<'_>> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let index =
            usize::try_from(u64::from(y) * u64::from(self.dimensions.width) + u64::from(x)).ok()?;
        let entry = self.palette.get(*self.cells.get(index)?)?;
        Some(Cell {
            color: entry.color,
            symbol: &entry.symbol,
        })
    }

    /// Iterate over rows of resolved cells, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell<'_>>> {
        let width = usize::try_from(self.dimensions.width).unwrap_or(usize::MAX);
        self.cells.chunks(width.max(1)).map(|row| {
            row.iter()
                .filter_map(|&index| self.palette.get(index))
                .map(|entry| Cell {
                    color: entry.color,
                    symbol: &entry.symbol,
                })
                .collect()
        })
    }

    /// The pattern's colors as a plain grid.
    #[must_use]
    pub fn to_grid(&self) -> StitchGrid {
        StitchGrid::from_fn(self.dimensions, |x, y| {
            self.cell(x, y).map_or(Rgb::new(0, 0, 0), |cell| cell.color)
        })
    }

    /// Usage count per symbol.
    #[must_use]
    pub fn symbol_counts(&self) -> BTreeMap<&str, usize> {
        self.palette
            .iter()
            .map(|entry| (entry.symbol.as_str(), entry.count))
            .collect()
    }
}
