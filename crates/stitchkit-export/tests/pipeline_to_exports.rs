//! Integration test: generate a pattern from an in-memory image and push
//! it through every export format.

#![allow(clippy::unwrap_used)]

use image::{Rgba, RgbaImage};
use stitchkit_export::{ChartOptions, PreviewOptions, SvgMetadata};
use stitchkit_pipeline::{PipelineConfig, Rgb};

/// Concentric rings with soft edges, giving the reducer real work.
fn target_image(size: u32) -> RgbaImage {
    let center = f64::from(size) / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = f64::from(x) - center;
        let dy = f64::from(y) - center;
        let ring = (dx.hypot(dy) / 6.0) % 3.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shade = (ring * 85.0) as u8;
        Rgba([shade, 255 - shade, 128, 255])
    })
}

fn generate() -> stitchkit_pipeline::Pattern {
    let config = PipelineConfig {
        width_stitches: 24,
        height_stitches: 24,
        max_colors: 6,
        ..PipelineConfig::default()
    };
    stitchkit_pipeline::generate(&target_image(96), &config).unwrap()
}

#[test]
fn saved_pattern_loads_back_identically() {
    let pattern = generate();
    let json = stitchkit_export::to_json(&pattern).unwrap();
    let loaded = stitchkit_export::from_json(&json).unwrap();

    assert_eq!(loaded, pattern);
    assert_eq!(loaded.legend(), pattern.legend());
    for y in 0..24 {
        for x in 0..24 {
            assert_eq!(loaded.cell(x, y), pattern.cell(x, y));
        }
    }
}

#[test]
fn chart_covers_every_stitch_and_legend_entry() {
    let pattern = generate();
    let meta = SvgMetadata {
        title: Some("rings"),
        ..SvgMetadata::default()
    };
    let svg = stitchkit_export::to_svg(&pattern, &ChartOptions::default(), &meta);

    assert!(svg.contains("<title>rings</title>"));
    // One square per stitch plus one swatch per legend entry.
    assert_eq!(
        svg.matches("<rect").count(),
        24 * 24 + pattern.palette().len()
    );
    for entry in pattern.palette() {
        assert!(svg.contains(&format!("{} stitches", entry.count)));
        assert!(svg.contains(&entry.key()));
    }
}

#[test]
fn preview_matches_pattern_colors() {
    let pattern = generate();
    let options = PreviewOptions {
        cell_size: 5,
        grid: false,
    };
    let bytes = stitchkit_export::to_png(&pattern, options).unwrap();
    let preview = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(preview.dimensions(), (120, 120));

    let [r, g, b] = preview.get_pixel(7 * 5 + 2, 3 * 5 + 2).0;
    assert_eq!(Some(Rgb::new(r, g, b)), pattern.cell(7, 3).map(|c| c.color));
}
