use image::GrayImage;

/// Multiplier applied to the mean difference intensity.
pub const MEAN_SCALE: f64 = 1.5;
/// Lowest threshold a frame can produce.
pub const MIN_THRESHOLD: f64 = 10.0;
/// Highest threshold a frame can produce.
pub const MAX_THRESHOLD: f64 = 50.0;

/// Per-frame binarization cutoff derived from the combined difference.
///
/// Only ever reported; it never feeds back into later frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicThreshold {
    mean: f64,
    value: f64,
}

impl DynamicThreshold {
    /// Threshold for a difference frame: `clamp(mean * 1.5, 10, 50)`.
    pub fn estimate(diff: &GrayImage) -> Self {
        Self::from_mean(mean_intensity(diff))
    }

    pub fn from_mean(mean: f64) -> Self {
        let value = (mean * MEAN_SCALE).clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        Self { mean, value }
    }

    /// Mean intensity of the difference frame this threshold came from.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Integer form for display, truncated toward zero.
    pub fn truncated(&self) -> u8 {
        self.value as u8
    }
}

/// Arithmetic mean of every sample; zero for an empty image.
pub fn mean_intensity(img: &GrayImage) -> f64 {
    let samples = img.as_raw();
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&v| v as u64).sum();
    sum as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn mean_of_mixed_frame() {
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(1, 0, Luma([20]));
        img.put_pixel(0, 1, Luma([30]));
        img.put_pixel(1, 1, Luma([40]));
        assert!((mean_intensity(&img) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn scales_mean_within_bounds() {
        let t = DynamicThreshold::estimate(&GrayImage::from_pixel(8, 8, Luma([20])));
        assert!((t.value() - 30.0).abs() < 1e-12);
        assert!((t.mean() - 20.0).abs() < 1e-12);
        assert_eq!(t.truncated(), 30);
    }

    #[test]
    fn static_scene_clamps_to_floor() {
        let t = DynamicThreshold::estimate(&GrayImage::new(8, 8));
        assert_eq!(t.value(), MIN_THRESHOLD);
        assert_eq!(t.truncated(), 10);
    }

    #[test]
    fn scene_cut_clamps_to_ceiling() {
        let t = DynamicThreshold::estimate(&GrayImage::from_pixel(8, 8, Luma([255])));
        assert_eq!(t.value(), MAX_THRESHOLD);
        assert_eq!(t.truncated(), 50);
    }

    #[test]
    fn display_value_truncates() {
        // 15 * 1.5 = 22.5
        let t = DynamicThreshold::from_mean(15.0);
        assert_eq!(t.truncated(), 22);
        // 33.3 * 1.5 = 49.95
        assert_eq!(DynamicThreshold::from_mean(33.3).truncated(), 49);
    }

    #[test]
    fn always_within_bounds() {
        for mean in (0..=255).map(|m| m as f64) {
            let t = DynamicThreshold::from_mean(mean);
            assert!((MIN_THRESHOLD..=MAX_THRESHOLD).contains(&t.value()));
            assert!((10..=50).contains(&t.truncated()));
        }
    }
}
