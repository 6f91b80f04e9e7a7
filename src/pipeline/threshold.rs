//! Per-pixel grayscale + fixed-threshold classification.
//!
//! Each pixel's perceptual luminosity is
//!
//! ```text
//! L = 0.299·R + 0.587·G + 0.114·B
//! ```
//!
//! evaluated in `f64` left to right, and R, G and B are all set to 255 when
//! `L > 150`, otherwise 0. The comparison is strict: `L == 150` is black.
//! Alpha is never touched. Neither the weights nor the threshold are
//! configurable.

use super::raster::PixelBuffer;
use serde::Serialize;

pub const LUMA_RED: f64 = 0.299;
pub const LUMA_GREEN: f64 = 0.587;
pub const LUMA_BLUE: f64 = 0.114;

/// Luminosity strictly above this becomes white.
pub const THRESHOLD: f64 = 150.0;

/// Perceptual luminosity of an 8-bit RGB triple.
#[inline]
pub fn luminosity(r: u8, g: u8, b: u8) -> f64 {
    LUMA_RED * f64::from(r) + LUMA_GREEN * f64::from(g) + LUMA_BLUE * f64::from(b)
}

/// 255 if `luma > THRESHOLD`, else 0.
#[inline]
pub fn classify(luma: f64) -> u8 {
    if luma > THRESHOLD {
        255
    } else {
        0
    }
}

/// How many pixels ended up on each side of the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixelCounts {
    pub black: u64,
    pub white: u64,
}

/// Binarize every pixel of `buffer` in place.
pub fn binarize_pixels(buffer: &mut PixelBuffer) -> PixelCounts {
    let mut counts = PixelCounts::default();

    for px in buffer.as_raw_mut().chunks_exact_mut(4) {
        let v = classify(luminosity(px[0], px[1], px[2]));
        px[0] = v;
        px[1] = v;
        px[2] = v;
        // px[3] (alpha) is passed through.
        if v == 255 {
            counts.white += 1;
        } else {
            counts.black += 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(pixels: &[[u8; 4]]) -> PixelBuffer {
        let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
        PixelBuffer::from_raw(pixels.len() as u32, 1, raw).unwrap()
    }

    #[test]
    fn luminosity_weights() {
        assert!((luminosity(100, 150, 50) - 123.65).abs() < 1e-9);
        assert!((luminosity(200, 200, 200) - 198.4).abs() < 1e-9);
        assert_eq!(luminosity(0, 0, 0), 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify(150.0), 0);
        assert_eq!(classify(150.000_001), 255);
        assert_eq!(classify(149.9), 0);
    }

    #[test]
    fn dark_green_goes_black() {
        let mut b = buffer(&[[100, 150, 50, 77]]);
        binarize_pixels(&mut b);
        assert_eq!(b.pixel(0, 0), [0, 0, 0, 77]);
    }

    #[test]
    fn light_gray_goes_white() {
        let mut b = buffer(&[[200, 200, 200, 12]]);
        binarize_pixels(&mut b);
        assert_eq!(b.pixel(0, 0), [255, 255, 255, 12]);
    }

    #[test]
    fn every_pixel_is_pure_and_alpha_kept() {
        let input: Vec<[u8; 4]> = (0..=255u8)
            .map(|i| [i, i.wrapping_mul(7), i.wrapping_mul(13), i.wrapping_add(3)])
            .collect();
        let mut b = buffer(&input);
        let counts = binarize_pixels(&mut b);

        assert_eq!(counts.black + counts.white, 256);
        for (x, orig) in input.iter().enumerate() {
            let [r, g, bl, a] = b.pixel(x as u32, 0);
            assert!(r == 0 || r == 255);
            assert_eq!(r, g);
            assert_eq!(g, bl);
            assert_eq!(a, orig[3]);
        }
    }

    #[test]
    fn already_binary_is_fixed_point() {
        let input = [[255, 255, 255, 255], [0, 0, 0, 255], [0, 0, 0, 0]];
        let mut b = buffer(&input);
        let counts = binarize_pixels(&mut b);
        assert_eq!(counts, PixelCounts { black: 2, white: 1 });
        for (x, orig) in input.iter().enumerate() {
            assert_eq!(b.pixel(x as u32, 0), *orig);
        }
    }

    #[test]
    fn primaries() {
        // Pure green: L = 149.685 → black. Pure red/blue are darker still.
        let mut b = buffer(&[[0, 255, 0, 255], [255, 0, 0, 255], [255, 255, 0, 255]]);
        binarize_pixels(&mut b);
        assert_eq!(b.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(b.pixel(1, 0), [0, 0, 0, 255]);
        // Yellow: L = 225.93 → white.
        assert_eq!(b.pixel(2, 0), [255, 255, 255, 255]);
    }
}
