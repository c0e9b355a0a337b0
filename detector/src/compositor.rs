use image::buffer::ConvertBuffer;
use image::{GrayImage, Luma, RgbImage};

use crate::morphology::{BACKGROUND, MOTION};

/// Paint every motion pixel of `mask` onto a black canvas of the same size.
pub fn compose_mask(mask: &GrayImage) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(mask.width(), mask.height(), Luma([BACKGROUND]));
    for (dst, src) in canvas.pixels_mut().zip(mask.pixels()) {
        if src.0[0] == MOTION {
            *dst = Luma([MOTION]);
        }
    }
    canvas
}

/// Replicate a single-channel image into three identical channels.
pub fn to_rgb(gray: &GrayImage) -> RgbImage {
    gray.convert()
}
