//! PNG preview: the pattern as a block image, one `N x N` square per
//! stitch, with optional grid lines.

use image::{ImageEncoder, Rgb as Pixel, RgbImage};

use stitchkit_pipeline::Pattern;

use crate::ExportError;
use crate::svg::MAJOR_GRID_INTERVAL;

/// Light grid color drawn between stitches.
const MINOR_GRID: Pixel<u8> = Pixel([160, 160, 160]);
/// Dark grid color drawn every [`MAJOR_GRID_INTERVAL`] stitches.
const MAJOR_GRID: Pixel<u8> = Pixel([0, 0, 0]);

/// Preview rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Edge length of one stitch block in pixels.
    pub cell_size: u32,
    /// Whether to overlay grid lines on the blocks.
    pub grid: bool,
}

impl PreviewOptions {
    /// Default block size in pixels.
    pub const DEFAULT_CELL_SIZE: u32 = 10;
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            cell_size: Self::DEFAULT_CELL_SIZE,
            grid: true,
        }
    }
}

/// Render the pattern into an RGB image.
///
/// Grid lines occupy the top and left pixel row/column of each block;
/// the line at every [`MAJOR_GRID_INTERVAL`]th stitch is dark. The
/// right and bottom edges of the image get a closing dark line.
///
/// # Errors
///
/// Returns [`ExportError::InvalidCellSize`] if `cell_size` is zero, or
/// with grid lines enabled below 2 (no room for color), and
/// [`ExportError::ImageTooLarge`] if the image would not fit in `u32`
/// pixel dimensions.
pub fn render_preview(pattern: &Pattern, options: PreviewOptions) -> Result<RgbImage, ExportError> {
    let min_cell = if options.grid { 2 } else { 1 };
    if options.cell_size < min_cell {
        return Err(ExportError::InvalidCellSize(options.cell_size));
    }
    let dimensions = pattern.dimensions();
    let width = dimensions
        .width
        .checked_mul(options.cell_size)
        .ok_or(ExportError::ImageTooLarge)?;
    let height = dimensions
        .height
        .checked_mul(options.cell_size)
        .ok_or(ExportError::ImageTooLarge)?;

    let cell = options.cell_size;
    let mut image = RgbImage::from_fn(width, height, |px, py| {
        let (x, y) = (px / cell, py / cell);
        let color = pattern
            .cell(x, y)
            .map_or(Pixel([0, 0, 0]), |stitch| {
                Pixel([stitch.color.r, stitch.color.g, stitch.color.b])
            });
        if !options.grid {
            return color;
        }
        let on_column_line = px % cell == 0;
        let on_row_line = py % cell == 0;
        let major = (on_column_line && x % MAJOR_GRID_INTERVAL == 0)
            || (on_row_line && y % MAJOR_GRID_INTERVAL == 0);
        if major {
            MAJOR_GRID
        } else if on_column_line || on_row_line {
            MINOR_GRID
        } else {
            color
        }
    });

    if options.grid {
        for py in 0..height {
            image.put_pixel(width - 1, py, MAJOR_GRID);
        }
        for px in 0..width {
            image.put_pixel(px, height - 1, MAJOR_GRID);
        }
    }

    Ok(image)
}

/// Render the preview and encode it as PNG bytes.
///
/// # Errors
///
/// As [`render_preview`], plus [`ExportError::PngEncode`] if encoding
/// fails.
pub fn to_png(pattern: &Pattern, options: PreviewOptions) -> Result<Vec<u8>, ExportError> {
    let image = render_preview(pattern, options)?;
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(png_bytes)
}
