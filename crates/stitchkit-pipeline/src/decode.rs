//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF) and produces an
//! RGBA buffer for the resampler. This is the only step that touches an
//! encoded format; everything downstream works on pixel data.

use image::RgbaImage;

use crate::types::PipelineError;

/// Decode raw image bytes into an RGBA image.
///
/// Whatever the `image` crate can sniff and decode is accepted. The
/// alpha channel is kept here and ignored later by the resampler.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty or the
/// decoded image has no pixels.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    Ok(rgba)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as PNG bytes.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_keeps_colors() {
        let img = RgbaImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                image::Rgba([200, 10, 20, 255])
            } else {
                image::Rgba([5, 6, 7, 128])
            }
        });
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.get_pixel(0, 1).0, [200, 10, 20, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [5, 6, 7, 128]);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbaImage::from_pixel(17, 31, image::Rgba([128, 64, 32, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
    }
}
