//! Symbol assignment: give every palette color a unique printable token.
//!
//! Palette colors are ordered by descending cell count, ties broken by
//! ascending hex key. The color at position `i` gets the `i`-th symbol of
//! the alphabet in bijective base-N numbering, so with the default
//! letters alphabet the sequence is `A`, `B`, ..., `Z`, `AA`, `AB`, ...
//! Assignment is a pure function of the ordered palette.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pattern::{PaletteEntry, Pattern};
use crate::types::{Rgb, StitchGrid};

/// Uppercase Latin letters.
const LETTERS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];

/// Geometric glyphs that stay distinguishable at small chart sizes.
const GLYPHS: [&str; 20] = [
    "●", "■", "▲", "◆", "★", "♥", "♣", "♠", "✚", "✖", "○", "□", "△", "◇", "☆", "♡", "♧", "♤", "▼",
    "▽",
];

/// The ordered alphabet legend symbols are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SymbolAlphabet {
    /// `A`-`Z`, then `AA`, `AB`, ...
    #[default]
    Letters,
    /// Geometric glyphs (`●`, `■`, `▲`, ...), then two-glyph pairs.
    Glyphs,
}

impl SymbolAlphabet {
    /// The single-symbol digits of this alphabet, in order.
    #[must_use]
    pub const fn digits(self) -> &'static [&'static str] {
        match self {
            Self::Letters => &LETTERS,
            Self::Glyphs => &GLYPHS,
        }
    }

    /// The symbol at position `index` (bijective base-N).
    ///
    /// Distinct indices always produce distinct symbols.
    #[must_use]
    pub fn symbol(self, index: usize) -> String {
        let digits = self.digits();
        let base = digits.len();
        let mut parts = Vec::new();
        let mut n = index + 1;
        while n > 0 {
            n -= 1;
            parts.push(digits[n % base]);
            n /= base;
        }
        parts.reverse();
        parts.concat()
    }
}

impl fmt::Display for SymbolAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Letters => f.write_str("Letters"),
            Self::Glyphs => f.write_str("Glyphs"),
        }
    }
}

/// Build the final [`Pattern`] from a palette-reduced grid.
///
/// Every distinct color in `grid` becomes one palette entry. Entries are
/// ordered by descending cell count (ties by ascending hex) and labelled
/// from `alphabet` in that order.
#[must_use]
pub fn assign_symbols(grid: &StitchGrid, alphabet: SymbolAlphabet) -> Pattern {
    let mut counts: BTreeMap<Rgb, usize> = BTreeMap::new();
    for &color in grid.cells() {
        *counts.entry(color).or_insert(0) += 1;
    }
    let mut ordered: Vec<(Rgb, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let index_of: BTreeMap<Rgb, usize> = ordered
        .iter()
        .enumerate()
        .map(|(index, &(color, _))| (color, index))
        .collect();

    let palette: Vec<PaletteEntry> = ordered
        .iter()
        .enumerate()
        .map(|(index, &(color, count))| PaletteEntry {
            color,
            symbol: alphabet.symbol(index),
            count,
        })
        .collect();

    let cells = grid
        .cells()
        .iter()
        .map(|color| index_of.get(color).copied().unwrap_or(0))
        .collect();

    Pattern::from_validated(grid.dimensions(), palette, cells)
}
