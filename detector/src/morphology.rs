use image::{GrayImage, Luma};

use crate::threshold::DynamicThreshold;

/// Mask value for a pixel with motion.
pub const MOTION: u8 = 255;
/// Mask value for a static pixel.
pub const BACKGROUND: u8 = 0;

/// Pixels strictly above the threshold become [`MOTION`], the rest [`BACKGROUND`].
pub fn binarize(diff: &GrayImage, threshold: &DynamicThreshold) -> GrayImage {
    let cutoff = threshold.value();
    let mut out = GrayImage::new(diff.width(), diff.height());
    for (dst, src) in out.pixels_mut().zip(diff.pixels()) {
        let v = if src.0[0] as f64 > cutoff { MOTION } else { BACKGROUND };
        *dst = Luma([v]);
    }
    out
}

// Applies `op` over the 3x3 neighbourhood of every pixel. Neighbours outside
// the image are skipped, so the border neither erodes nor dilates.
fn filter_3x3(img: &GrayImage, op: fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, dst) in out.enumerate_pixels_mut() {
        let mut acc = img.get_pixel(x, y).0[0];
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                acc = op(acc, img.get_pixel(nx, ny).0[0]);
            }
        }
        *dst = Luma([acc]);
    }
    out
}

/// Minimum filter with a 3x3 all-ones structuring element.
pub fn erode(img: &GrayImage) -> GrayImage {
    filter_3x3(img, u8::min)
}

/// Maximum filter with a 3x3 all-ones structuring element.
pub fn dilate(img: &GrayImage) -> GrayImage {
    filter_3x3(img, u8::max)
}

/// One opening pass: erosion followed by dilation.
pub fn open(img: &GrayImage) -> GrayImage {
    dilate(&erode(img))
}
