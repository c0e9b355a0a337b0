use framediff_common::config::{MAX_BLUR_SIZE, MIN_BLUR_SIZE};
use image::GrayImage;

use crate::error::DetectorError;

/// Side of the square Gaussian kernel used by the preprocessor.
///
/// Always odd and within `MIN_BLUR_SIZE..=MAX_BLUR_SIZE`. Even values inside
/// the range are rounded up to the next odd value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurSize(u32);

impl BlurSize {
    pub fn new(value: u32) -> Result<Self, DetectorError> {
        if !(MIN_BLUR_SIZE..=MAX_BLUR_SIZE).contains(&value) {
            return Err(DetectorError::InvalidBlurSize {
                value,
                min: MIN_BLUR_SIZE,
                max: MAX_BLUR_SIZE,
            });
        }
        let size = if value % 2 == 0 { value + 1 } else { value };
        Ok(Self(size))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn radius(self) -> usize {
        (self.0 / 2) as usize
    }
}

impl Default for BlurSize {
    fn default() -> Self {
        Self(13)
    }
}

/// Sigma for a kernel of side `ksize` when none is given explicitly.
pub fn sigma_for_kernel(ksize: u32) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights of length `ksize`.
///
/// Small kernels use the fixed tables of the usual convention; larger ones are
/// sampled from the Gaussian with [`sigma_for_kernel`].
pub fn gaussian_kernel(ksize: u32) -> Vec<f64> {
    match ksize {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = sigma_for_kernel(ksize);
            let scale = -0.5 / (sigma * sigma);
            let center = (ksize as f64 - 1.0) * 0.5;
            let mut weights: Vec<f64> = (0..ksize)
                .map(|i| {
                    let x = i as f64 - center;
                    (scale * x * x).exp()
                })
                .collect();
            let sum: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= sum;
            }
            weights
        }
    }
}

/// Map an out-of-range index back into `0..len`, mirroring about the edge
/// samples without repeating them (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable Gaussian blur with a square kernel of side `size`.
pub fn gaussian_blur(src: &GrayImage, size: BlurSize) -> GrayImage {
    let (width, height) = src.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let kernel = gaussian_kernel(size.get());
    let radius = size.radius() as isize;
    let (w, h) = (width as usize, height as usize);
    let data = src.as_raw();

    let mut horizontal = vec![0.0f64; w * h];
    for y in 0..h {
        let row = &data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - radius, w);
                acc += weight * row[sx] as f64;
            }
            horizontal[y * w + x] = acc;
        }
    }

    for (i, pixel) in out.pixels_mut().enumerate() {
        let (x, y) = (i % w, i / w);
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, h);
            acc += weight * horizontal[sy * w + x];
        }
        pixel.0[0] = acc.round().clamp(0.0, 255.0) as u8;
    }
    out
}
