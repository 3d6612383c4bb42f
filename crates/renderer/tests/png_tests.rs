//! Tests for frame PNG encoding.
//!
//! Encoded output is decoded again with the `image` crate, so these tests
//! check that the files are valid PNGs, not just that bytes came out.

use image::{Rgb, RgbImage};
use renderer::palette::{PaletteLut, PaletteName};
use renderer::png::{encode_frame_png, encode_indexed, encode_rgb, encode_rgb_auto};

// ============================================================================
// Helper functions
// ============================================================================

/// Color type byte from the IHDR chunk
fn color_type(png: &[u8]) -> u8 {
    png[8 + 8 + 9]
}

fn decode(png: &[u8]) -> RgbImage {
    image::load_from_memory(png)
        .expect("encoder output must decode")
        .to_rgb8()
}

/// A horizontal palette ramp, one LUT entry per column.
fn ramp_frame(width: u32, height: u32, palette: PaletteName) -> RgbImage {
    let lut = PaletteLut::build(palette, 512, 0.0);
    let values: Vec<f32> = (0..height)
        .flat_map(|_| (0..width).map(move |x| x as f32 / (width - 1) as f32))
        .collect();
    lut.apply(&values, width, height).unwrap()
}

// ============================================================================
// Mode selection
// ============================================================================

#[test]
fn test_few_colors_use_indexed() {
    let frame = ramp_frame(64, 8, PaletteName::Dusk);
    let png = encode_frame_png(&frame).unwrap();
    assert_eq!(color_type(&png), 3);
}

#[test]
fn test_many_colors_use_truecolor() {
    let frame = RgbImage::from_fn(40, 10, |x, y| Rgb([x as u8 * 6, y as u8 * 20, (x + y) as u8]));
    let png = encode_frame_png(&frame).unwrap();
    assert_eq!(color_type(&png), 2);
}

#[test]
fn test_large_frame_takes_parallel_path() {
    // 320x120 is above the parallel extraction threshold
    let frame = ramp_frame(320, 120, PaletteName::Twilight);
    let png = encode_frame_png(&frame).unwrap();
    assert_eq!(decode(&png), frame);
}

// ============================================================================
// Round trips through a real decoder
// ============================================================================

#[test]
fn test_indexed_decodes_to_same_pixels() {
    let frame = ramp_frame(50, 4, PaletteName::Coral);
    let png = encode_frame_png(&frame).unwrap();
    assert_eq!(decode(&png), frame);
}

#[test]
fn test_truecolor_decodes_to_same_pixels() {
    let frame = RgbImage::from_fn(17, 3, |x, y| Rgb([x as u8 * 15, 255 - y as u8 * 80, 42]));
    let png = encode_rgb(frame.as_raw(), 17, 3).unwrap();
    assert_eq!(decode(&png), frame);
}

#[test]
fn test_explicit_indexed() {
    let palette = [[0, 0, 0], [255, 255, 255]];
    let indices = [0, 1, 1, 0];
    let png = encode_indexed(2, 2, &palette, &indices).unwrap();
    let img = decode(&png);
    assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(img.get_pixel(1, 0), &Rgb([255, 255, 255]));
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_indexed_rejects_bad_input() {
    assert!(encode_indexed(2, 1, &[], &[0, 0]).is_err());
    assert!(encode_indexed(2, 2, &[[1, 2, 3]], &[0, 0]).is_err());
}

#[test]
fn test_auto_rejects_short_buffer() {
    assert!(encode_rgb_auto(&[0; 10], 2, 2).is_err());
}
