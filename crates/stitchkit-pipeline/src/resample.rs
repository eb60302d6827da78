//! Resampling a source image onto the stitch grid.
//!
//! Every target cell `(x, y)` covers the source range
//! `[x * src_w / w, (x + 1) * src_w / w)` horizontally and the analogous
//! range vertically. Source pixels are assigned to cells by integer
//! flooring of those bounds, so when downsampling every source pixel
//! contributes to exactly one cell.
//!
//! When upsampling, a cell's range can be narrower than one pixel and
//! contain no pixel index at all; the nearest pixel to the range center
//! is used instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Rgb, RgbaImage, StitchGrid};

/// How a cell's color is derived from its source region.
///
/// A single policy is applied to every cell of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sampling {
    /// Per-channel mean of every source pixel in the region, rounded
    /// half-up. Falls back to the center pixel for sub-pixel regions.
    #[default]
    Average,
    /// The single source pixel nearest the region center.
    Center,
}

impl fmt::Display for Sampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Average => f.write_str("Average"),
            Self::Center => f.write_str("Center"),
        }
    }
}

/// Half-open range of source pixel indices along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u32,
    end: u32,
}

impl Span {
    const fn single(index: u32) -> Self {
        Self {
            start: index,
            end: index + 1,
        }
    }

    const fn len(self) -> u32 {
        self.end - self.start
    }
}

/// Compute the source span for target `index` out of `target` cells over
/// a `source`-pixel axis. Requires `index < target` and `source > 0`.
fn source_span(index: u32, target: u32, source: u32, sampling: Sampling) -> Span {
    let (i, t, s) = (u64::from(index), u64::from(target), u64::from(source));

    // (2i + 1) < 2t, so the center is always < source and fits in u32.
    #[allow(clippy::cast_possible_truncation)]
    let center = ((2 * i + 1) * s / (2 * t)) as u32;

    match sampling {
        Sampling::Center => Span::single(center),
        Sampling::Average => {
            // Both bounds are <= source.
            #[allow(clippy::cast_possible_truncation)]
            let (start, end) = ((i * s / t) as u32, ((i + 1) * s / t) as u32);
            if end > start {
                Span { start, end }
            } else {
                Span::single(center)
            }
        }
    }
}

/// Mean color over a rectangular region, rounded half-up per channel.
fn region_mean(image: &RgbaImage, columns: Span, rows: Span) -> Rgb {
    let mut sums = [0u64; 3];
    for y in rows.start..rows.end {
        for x in columns.start..columns.end {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            sums[0] += u64::from(r);
            sums[1] += u64::from(g);
            sums[2] += u64::from(b);
        }
    }
    let count = u64::from(columns.len()) * u64::from(rows.len());
    // Mean of u8 samples never exceeds 255.
    #[allow(clippy::cast_possible_truncation)]
    let channel = |sum: u64| ((sum + count / 2) / count) as u8;
    Rgb::new(channel(sums[0]), channel(sums[1]), channel(sums[2]))
}

/// Resample `image` onto a grid of exactly `dimensions` cells.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] if either stitch count
/// is zero, and [`PipelineError::EmptyInput`] if the source image has
/// no pixels.
pub fn resample(
    image: &RgbaImage,
    dimensions: Dimensions,
    sampling: Sampling,
) -> Result<StitchGrid, PipelineError> {
    if dimensions.is_empty() {
        return Err(PipelineError::InvalidDimensions {
            width: dimensions.width,
            height: dimensions.height,
        });
    }
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(PipelineError::EmptyInput);
    }

    let columns: Vec<Span> = (0..dimensions.width)
        .map(|x| source_span(x, dimensions.width, src_width, sampling))
        .collect();
    let rows: Vec<Span> = (0..dimensions.height)
        .map(|y| source_span(y, dimensions.height, src_height, sampling))
        .collect();

    let mut cells = Vec::with_capacity(dimensions.cell_count());
    for &row in &rows {
        for &column in &columns {
            cells.push(region_mean(image, column, row));
        }
    }

    StitchGrid::from_cells(dimensions, cells)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(color))
    }

    /// Left half red, right half blue.
    fn halves(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn default_sampling_is_average() {
        assert_eq!(Sampling::default(), Sampling::Average);
    }

    #[test]
    fn spans_partition_the_axis_when_downsampling() {
        let spans: Vec<Span> = (0..3)
            .map(|i| source_span(i, 3, 10, Sampling::Average))
            .collect();
        assert_eq!(spans[0], Span { start: 0, end: 3 });
        assert_eq!(spans[1], Span { start: 3, end: 6 });
        assert_eq!(spans[2], Span { start: 6, end: 10 });
    }

    #[test]
    fn spans_fall_back_to_center_when_upsampling() {
        // 2 source pixels onto 5 cells: ranges [0, 0.4), [0.4, 0.8),
        // [0.8, 1.2), [1.2, 1.6), [1.6, 2.0).
        let spans: Vec<u32> = (0..5)
            .map(|i| source_span(i, 5, 2, Sampling::Average))
            .map(|s| {
                assert_eq!(s.len(), 1);
                s.start
            })
            .collect();
        assert_eq!(spans, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn center_sampling_is_single_pixel() {
        let span = source_span(1, 3, 9, Sampling::Center);
        assert_eq!(span, Span::single(4));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let img = solid(4, 4, [0, 0, 0, 255]);
        let result = resample(&img, Dimensions::new(0, 2), Sampling::Average);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 0,
                height: 2
            })
        ));
    }

    #[test]
    fn empty_source_rejected() {
        let img = RgbaImage::new(0, 0);
        let result = resample(&img, Dimensions::new(2, 2), Sampling::Average);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn output_has_requested_dimensions() {
        let img = solid(37, 23, [10, 20, 30, 255]);
        for (w, h) in [(1, 1), (5, 7), (37, 23), (100, 3)] {
            let grid = resample(&img, Dimensions::new(w, h), Sampling::Average).unwrap();
            assert_eq!(grid.dimensions(), Dimensions::new(w, h));
            assert_eq!(grid.cells().len(), usize::try_from(w * h).unwrap());
        }
    }

    #[test]
    fn quadrants_map_to_cells() {
        let grid = resample(&halves(4, 4), Dimensions::new(2, 2), Sampling::Average).unwrap();
        assert_eq!(grid.cells(), &[RED, BLUE, RED, BLUE]);
    }

    #[test]
    fn average_blends_region() {
        // 2x1 image of black and white averaged into a single cell.
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let grid = resample(&img, Dimensions::new(1, 1), Sampling::Average).unwrap();
        // (0 + 255 + 1) / 2 = 128 with half-up rounding.
        assert_eq!(grid.cells(), &[Rgb::new(128, 128, 128)]);
    }

    #[test]
    fn center_sampling_never_blends() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let grid = resample(&img, Dimensions::new(1, 1), Sampling::Center).unwrap();
        assert_eq!(grid.cells(), &[Rgb::new(255, 255, 255)]);
    }

    #[test]
    fn alpha_is_discarded() {
        let img = solid(3, 3, [40, 50, 60, 0]);
        let grid = resample(&img, Dimensions::new(1, 1), Sampling::Average).unwrap();
        assert_eq!(grid.cells(), &[Rgb::new(40, 50, 60)]);
    }

    #[test]
    fn upsampling_replicates_pixels() {
        let img = halves(2, 1);
        let grid = resample(&img, Dimensions::new(4, 2), Sampling::Average).unwrap();
        assert_eq!(grid.cells(), &[RED, RED, BLUE, BLUE, RED, RED, BLUE, BLUE]);
    }

    #[test]
    fn identity_size_copies_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            image::Rgba([u8::try_from(x * 10).unwrap(), u8::try_from(y * 10).unwrap(), 7, 255])
        });
        let grid = resample(&img, Dimensions::new(3, 2), Sampling::Average).unwrap();
        assert_eq!(grid.get(2, 1), Some(Rgb::new(20, 10, 7)));
        assert_eq!(grid.get(0, 0), Some(Rgb::new(0, 0, 7)));
    }
}
