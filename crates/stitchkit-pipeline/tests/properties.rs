//! End-to-end properties of pattern generation.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use image::Rgba;
use stitchkit_pipeline::{
    Dimensions, Pattern, PhysicalSize, PipelineConfig, PipelineError, Rgb, RgbaImage, Sampling,
    SymbolAlphabet, generate, generate_from_bytes,
};

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

/// A smooth two-axis gradient with many distinct colors.
fn photo_like(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        Rgba([
            u8::try_from(x * 255 / w.max(1)).unwrap(),
            u8::try_from(y * 255 / h.max(1)).unwrap(),
            u8::try_from((x + y) * 127 / (w + h)).unwrap(),
            255,
        ])
    })
}

fn config(w: u32, h: u32, k: u32) -> PipelineConfig {
    PipelineConfig {
        width_stitches: w,
        height_stitches: h,
        max_colors: k,
        ..PipelineConfig::default()
    }
}

fn distinct_cells(pattern: &Pattern) -> BTreeSet<Rgb> {
    pattern.to_grid().cells().iter().copied().collect()
}

#[test]
fn generation_is_deterministic() {
    let png = encode_png(&photo_like(90, 70));
    let cfg = config(30, 20, 8);
    let first = generate_from_bytes(&png, &cfg).unwrap();
    for _ in 0..3 {
        let again = generate_from_bytes(&png, &cfg).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.legend(), again.legend());
    }
}

#[test]
fn palette_size_is_min_of_distinct_and_bound() {
    let img = photo_like(64, 64);
    for k in [1, 2, 5, 12, 30] {
        let pattern = generate(&img, &config(16, 16, k)).unwrap();
        let distinct = distinct_cells(&pattern).len();
        assert_eq!(pattern.legend().len(), usize::try_from(k).unwrap());
        assert_eq!(distinct, pattern.legend().len(), "k={k}");
    }
}

#[test]
fn output_matches_requested_grid() {
    let img = photo_like(33, 47);
    for (w, h) in [(1, 1), (10, 3), (33, 47), (80, 120)] {
        let pattern = generate(&img, &config(w, h, 10)).unwrap();
        assert_eq!(pattern.dimensions(), Dimensions::new(w, h));
        assert_eq!(pattern.rows().count(), usize::try_from(h).unwrap());
        assert!(
            pattern
                .rows()
                .all(|row| row.len() == usize::try_from(w).unwrap())
        );
    }
}

#[test]
fn single_color_image_gives_single_entry() {
    let img = RgbaImage::from_pixel(23, 9, Rgba([12, 200, 99, 255]));
    let pattern = generate(&img, &config(7, 4, 30)).unwrap();
    let legend = pattern.legend();
    let entries: Vec<(&str, &str)> = legend.iter().collect();
    assert_eq!(entries, vec![("#0CC863", "A")]);
    assert_eq!(pattern.palette()[0].count, 28);
}

#[test]
fn few_colors_survive_unchanged() {
    let colors = [
        Rgb::new(10, 20, 30),
        Rgb::new(200, 100, 0),
        Rgb::new(0, 255, 128),
    ];
    let img = RgbaImage::from_fn(6, 2, |x, _| {
        let c = colors[usize::try_from(x / 2).unwrap()];
        Rgba([c.r, c.g, c.b, 255])
    });
    let pattern = generate(&img, &config(6, 2, 3)).unwrap();
    let expected: BTreeSet<Rgb> = colors.into_iter().collect();
    assert_eq!(distinct_cells(&pattern), expected);
}

#[test]
fn symbols_are_unique_and_keys_canonical() {
    let pattern = generate(&photo_like(50, 50), &config(25, 25, 28)).unwrap();
    let legend = pattern.legend();
    let symbols: BTreeSet<&str> = legend.iter().map(|(_, s)| s).collect();
    assert_eq!(symbols.len(), legend.len());
    for (key, _) in legend.iter() {
        assert_eq!(key.len(), 7);
        assert!(key.starts_with('#'));
        assert_eq!(Rgb::from_hex(key).unwrap().hex(), key);
    }
    // 28 colors overflow the 26 letters into two-letter symbols.
    assert!(symbols.contains("AA"));
    assert!(symbols.contains("AB"));
}

fn quadrant_image() -> RgbaImage {
    RgbaImage::from_fn(4, 4, |x, _| {
        if x < 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
}

fn assert_quadrant_pattern(pattern: &Pattern) {
    let red = Rgb::new(255, 0, 0);
    let blue = Rgb::new(0, 0, 255);
    let rows: Vec<Vec<Rgb>> = pattern
        .rows()
        .map(|row| row.iter().map(|c| c.color).collect())
        .collect();
    assert_eq!(rows, vec![vec![red, blue], vec![red, blue]]);

    let legend = pattern.legend();
    let entries: Vec<(&str, &str)> = legend.iter().collect();
    assert_eq!(entries, vec![("#0000FF", "A"), ("#FF0000", "B")]);
}

#[test]
fn quadrant_scenario() {
    let bytes = encode_png(&quadrant_image());
    let pattern = generate_from_bytes(&bytes, &config(2, 2, 30)).unwrap();
    assert_quadrant_pattern(&pattern);
}

#[test]
fn quadrant_scenario_at_exact_palette_bound() {
    let bytes = encode_png(&quadrant_image());
    let pattern = generate_from_bytes(&bytes, &config(2, 2, 2)).unwrap();
    assert_quadrant_pattern(&pattern);
}

#[test]
fn center_sampling_never_invents_colors() {
    let img = photo_like(40, 40);
    let source: BTreeSet<Rgb> = img.pixels().map(|p| Rgb::from(*p)).collect();
    let cfg = PipelineConfig {
        sampling: Sampling::Center,
        ..config(13, 9, 200)
    };
    let pattern = generate(&img, &cfg).unwrap();
    assert!(distinct_cells(&pattern).is_subset(&source));
}

#[test]
fn glyph_alphabet_is_used_when_configured() {
    let cfg = PipelineConfig {
        symbols: SymbolAlphabet::Glyphs,
        ..config(8, 8, 3)
    };
    let pattern = generate(&photo_like(16, 16), &cfg).unwrap();
    let symbols: Vec<String> = pattern.palette().iter().map(|e| e.symbol.clone()).collect();
    assert_eq!(symbols, vec!["●", "■", "▲"]);
}

#[test]
fn physical_size_drives_grid() {
    // 100 mm x 150 mm on 14-count fabric.
    let size = PhysicalSize {
        width_mm: 100.0,
        height_mm: 150.0,
        count_per_inch: 14.0,
    };
    let cfg = PipelineConfig::from_physical(size, 30).unwrap();
    assert_eq!(cfg.dimensions(), Dimensions::new(55, 83));
    let pattern = generate(&photo_like(20, 30), &cfg).unwrap();
    assert_eq!(pattern.dimensions(), Dimensions::new(55, 83));
}

#[test]
fn errors_are_reported_not_defaulted() {
    let img = photo_like(4, 4);
    assert!(matches!(
        generate(&img, &config(0, 4, 3)),
        Err(PipelineError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        generate(&img, &config(4, 4, 0)),
        Err(PipelineError::InvalidPaletteSize(0))
    ));
    assert!(matches!(
        generate(&RgbaImage::new(0, 0), &config(4, 4, 3)),
        Err(PipelineError::EmptyInput)
    ));
}
