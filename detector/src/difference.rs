use framediff_common::config::CombineMode;
use image::{GrayImage, Luma};

fn zip_with(a: &GrayImage, b: &GrayImage, op: impl Fn(u8, u8) -> u8) -> GrayImage {
    let mut out = GrayImage::new(a.width(), a.height());
    for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        *dst = Luma([op(pa.0[0], pb.0[0])]);
    }
    out
}

/// Per-pixel `|a - b|`.
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, |x, y| x.abs_diff(y))
}

/// Merge two difference frames. A pixel stays zero only if it is zero in both.
pub fn combine(a: &GrayImage, b: &GrayImage, mode: CombineMode) -> GrayImage {
    match mode {
        CombineMode::BitwiseOr => zip_with(a, b, |x, y| x | y),
        CombineMode::Maximum => zip_with(a, b, |x, y| x.max(y)),
    }
}

/// `combine(|older - newer|, |newer - current|)`.
pub fn three_frame_difference(
    older: &GrayImage,
    newer: &GrayImage,
    current: &GrayImage,
    mode: CombineMode,
) -> GrayImage {
    let diff1 = abs_diff(older, newer);
    let diff2 = abs_diff(newer, current);
    combine(&diff1, &diff2, mode)
}
