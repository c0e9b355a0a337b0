use image::{GrayImage, Luma, RgbImage};

use crate::blur::{gaussian_blur, BlurSize};

// BT.601 luma weights in 14-bit fixed point; they sum to 1 << 14.
const LUMA_SHIFT: u32 = 14;
const WEIGHT_R: u32 = 4899;
const WEIGHT_G: u32 = 9617;
const WEIGHT_B: u32 = 1868;
const ROUNDING: u32 = 1 << (LUMA_SHIFT - 1);

/// Perceptual luma of one RGB sample.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * WEIGHT_R + g as u32 * WEIGHT_G + b as u32 * WEIGHT_B + ROUNDING;
    (y >> LUMA_SHIFT) as u8
}

/// Convert a color frame to single-channel luminance.
pub fn to_luma(frame: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(frame.width(), frame.height());
    for (out, px) in gray.pixels_mut().zip(frame.pixels()) {
        let [r, g, b] = px.0;
        *out = Luma([luma(r, g, b)]);
    }
    gray
}

/// Luminance conversion followed by the Gaussian blur.
pub fn preprocess(frame: &RgbImage, blur: BlurSize) -> GrayImage {
    gaussian_blur(&to_luma(frame), blur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn weights_sum_to_unity() {
        assert_eq!(WEIGHT_R + WEIGHT_G + WEIGHT_B, 1 << LUMA_SHIFT);
    }

    #[test]
    fn primaries_use_perceptual_weights() {
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
    }

    #[test]
    fn grey_input_is_preserved() {
        for v in [1u8, 17, 128, 200, 254] {
            assert_eq!(luma(v, v, v), v);
        }
    }

    #[test]
    fn not_a_channel_average() {
        // (255 + 0 + 0) / 3 would be 85
        assert_ne!(luma(255, 0, 0), 85);
    }

    #[test]
    fn preprocess_keeps_dimensions() {
        let frame = RgbImage::from_pixel(17, 11, Rgb([10, 200, 30]));
        let gray = preprocess(&frame, BlurSize::new(5).unwrap());
        assert_eq!(gray.dimensions(), (17, 11));
        let expected = luma(10, 200, 30);
        assert!(gray.pixels().all(|p| p.0[0] == expected));
    }
}
