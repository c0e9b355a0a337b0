use framediff_common::config::{CombineMode, DetectorConfig};
use framediff_common::frame::{Dimensions, Phase};
use image::{GrayImage, RgbImage};
use tracing::{debug, trace};

use crate::blur::BlurSize;
use crate::compositor::{compose_mask, to_rgb};
use crate::difference::three_frame_difference;
use crate::error::DetectorError;
use crate::history::HistoryBuffer;
use crate::morphology::{binarize, open};
use crate::observer::ThresholdObserver;
use crate::preprocess::preprocess;
use crate::threshold::DynamicThreshold;

/// Result of feeding one frame to a [`MotionDetector`].
#[derive(Debug, Clone)]
pub enum Detection {
    /// Not enough history yet; `output` is the preprocessed frame itself.
    Warmup { output: RgbImage },
    /// Steady state: `mask` is the denoised binary mask and `output` its
    /// three-channel rendering.
    Motion {
        output: RgbImage,
        mask: GrayImage,
        threshold: DynamicThreshold,
    },
}

impl Detection {
    /// The image to display for this frame.
    pub fn output(&self) -> &RgbImage {
        match self {
            Detection::Warmup { output } | Detection::Motion { output, .. } => output,
        }
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        match self {
            Detection::Motion { mask, .. } => Some(mask),
            Detection::Warmup { .. } => None,
        }
    }

    pub fn threshold(&self) -> Option<&DynamicThreshold> {
        match self {
            Detection::Motion { threshold, .. } => Some(threshold),
            Detection::Warmup { .. } => None,
        }
    }

    pub fn is_warmup(&self) -> bool {
        matches!(self, Detection::Warmup { .. })
    }
}

/// Threshold, binarize, open and composite one combined difference frame.
pub fn detect_motion(combined: &GrayImage) -> (GrayImage, DynamicThreshold) {
    let threshold = DynamicThreshold::estimate(combined);
    let opened = open(&binarize(combined, &threshold));
    (compose_mask(&opened), threshold)
}

/// Streaming three-frame motion detector for a single video session.
///
/// Holds the frame history of one stream; concurrent streams each need their
/// own detector.
pub struct MotionDetector {
    history: HistoryBuffer,
    combine: CombineMode,
    observers: Vec<Box<dyn ThresholdObserver>>,
}

impl MotionDetector {
    pub fn new(combine: CombineMode) -> Self {
        Self {
            history: HistoryBuffer::new(),
            combine,
            observers: Vec::new(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.combine)
    }

    pub fn add_observer(&mut self, observer: impl ThresholdObserver + 'static) {
        debug!(observer = observer.name(), "threshold observer registered");
        self.observers.push(Box::new(observer));
    }

    pub fn phase(&self) -> Phase {
        self.history.phase()
    }

    /// Dimensions fixed by the first frame since the last reset.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.history.dimensions()
    }

    /// Process one frame with a raw blur size from the configuration surface.
    ///
    /// The blur size is validated before any pixel work. On error the frame
    /// history is left untouched.
    pub fn process(
        &mut self,
        frame: &RgbImage,
        blur_size: u32,
    ) -> Result<Detection, DetectorError> {
        let blur = BlurSize::new(blur_size)?;
        self.process_with(frame, blur)
    }

    pub fn process_with(
        &mut self,
        frame: &RgbImage,
        blur: BlurSize,
    ) -> Result<Detection, DetectorError> {
        let dims = Dimensions::new(frame.width(), frame.height());
        if dims.is_empty() {
            return Err(DetectorError::EmptyFrame(dims));
        }
        if let Some(expected) = self.history.dimensions() {
            if expected != dims {
                return Err(DetectorError::DimensionMismatch {
                    expected,
                    got: dims,
                });
            }
        }

        let current = preprocess(frame, blur);

        let detection = match self.history.window() {
            None => {
                trace!(
                    phase = %self.history.phase(),
                    blur = blur.get(),
                    "warm-up frame, passing through"
                );
                Detection::Warmup {
                    output: to_rgb(&current),
                }
            }
            Some((older, newer)) => {
                let combined = three_frame_difference(older, newer, &current, self.combine);
                let (mask, threshold) = detect_motion(&combined);
                debug!(
                    mean = format!("{:.2}", threshold.mean()),
                    threshold = threshold.truncated(),
                    blur = blur.get(),
                    "motion mask computed"
                );
                Detection::Motion {
                    output: to_rgb(&mask),
                    mask,
                    threshold,
                }
            }
        };

        if let Some(threshold) = detection.threshold() {
            for observer in &mut self.observers {
                observer.on_threshold(threshold);
            }
        }

        self.history.push(current);
        Ok(detection)
    }

    /// Drop the frame history; the next two frames are warm-up frames again.
    pub fn reset(&mut self) {
        if self.history.phase() != Phase::Empty {
            debug!(phase = %self.history.phase(), "detector reset");
        }
        self.history.reset();
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(CombineMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::{BACKGROUND, MOTION};
    use image::{Luma, Rgb};
    use std::sync::{Arc, Mutex};

    const W: u32 = 32;
    const H: u32 = 24;

    fn flat(value: u8) -> RgbImage {
        RgbImage::from_pixel(W, H, Rgb([value, value, value]))
    }

    fn with_square(background: u8, fg: u8, x0: u32, y0: u32, size: u32) -> RgbImage {
        let mut img = flat(background);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                img.put_pixel(x, y, Rgb([fg, fg, fg]));
            }
        }
        img
    }

    // Deterministic pseudo-random frame.
    fn noise(seed: u32) -> RgbImage {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        RgbImage::from_fn(W, H, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            Rgb([v, v.wrapping_add(40), v.wrapping_mul(3)])
        })
    }

    fn lit(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == MOTION).count()
    }

    #[test]
    fn first_two_frames_pass_through() {
        let mut detector = MotionDetector::default();
        let blur = BlurSize::new(5).unwrap();
        for (i, frame) in [noise(1), noise(2)].iter().enumerate() {
            let detection = detector.process(frame, 5).unwrap();
            assert!(detection.is_warmup(), "frame {i} should be warm-up");
            assert!(detection.threshold().is_none());
            assert_eq!(detection.output(), &to_rgb(&preprocess(frame, blur)));
        }
        assert_eq!(detector.phase(), Phase::Ready);

        let third = detector.process(&noise(3), 5).unwrap();
        assert!(!third.is_warmup());
        assert!(third.mask().is_some());
    }

    #[test]
    fn change_between_last_two_frames_is_flagged() {
        let mut detector = MotionDetector::default();
        let background = flat(100);
        detector.process(&background, 3).unwrap();
        detector.process(&background, 3).unwrap();

        let moved = with_square(100, 220, 12, 8, 7);
        let detection = detector.process(&moved, 3).unwrap();
        let mask = detection.mask().unwrap();
        assert_eq!(mask.get_pixel(15, 11).0[0], MOTION);
        assert_eq!(mask.get_pixel(0, 0).0[0], BACKGROUND);
        assert_eq!(detection.output().get_pixel(15, 11), &Rgb([255, 255, 255]));
    }

    #[test]
    fn union_flags_pixel_changed_in_either_pair() {
        for combine in [CombineMode::BitwiseOr, CombineMode::Maximum] {
            let mut detector = MotionDetector::new(combine);
            detector.process(&flat(60), 3).unwrap();
            detector.process(&with_square(60, 200, 4, 4, 6), 3).unwrap();
            // Square at (4,4) disappears, a new one at (20,12) appears.
            let detection = detector.process(&with_square(60, 200, 20, 12, 6), 3).unwrap();
            let mask = detection.mask().unwrap();
            assert_eq!(mask.get_pixel(6, 6).0[0], MOTION, "{combine:?}");
            assert_eq!(mask.get_pixel(22, 14).0[0], MOTION, "{combine:?}");
        }
    }

    #[test]
    fn static_scene_has_empty_mask_and_floor_threshold() {
        let mut detector = MotionDetector::default();
        let frame = noise(7);
        detector.process(&frame, 9).unwrap();
        detector.process(&frame, 9).unwrap();
        let detection = detector.process(&frame, 9).unwrap();
        assert_eq!(lit(detection.mask().unwrap()), 0);
        assert_eq!(detection.threshold().unwrap().truncated(), 10);
    }

    #[test]
    fn scene_cut_saturates_threshold() {
        let mut detector = MotionDetector::default();
        detector.process(&flat(0), 3).unwrap();
        detector.process(&flat(0), 3).unwrap();
        let detection = detector.process(&flat(255), 3).unwrap();
        assert_eq!(detection.threshold().unwrap().truncated(), 50);
        assert_eq!(lit(detection.mask().unwrap()), (W * H) as usize);
    }

    #[test]
    fn threshold_stays_within_bounds() {
        let mut detector = MotionDetector::default();
        for seed in 0..12 {
            if let Some(t) = detector.process(&noise(seed), 3).unwrap().threshold() {
                assert!((10.0..=50.0).contains(&t.value()), "seed {seed}: {}", t.value());
            }
        }
    }

    #[test]
    fn isolated_difference_pixel_is_removed() {
        let mut combined = GrayImage::new(20, 20);
        combined.put_pixel(2, 2, Luma([200]));
        for y in 10..14 {
            for x in 10..14 {
                combined.put_pixel(x, y, Luma([200]));
            }
        }
        let (mask, threshold) = detect_motion(&combined);
        // mean = 17 * 200 / 400 = 8.5
        assert!((threshold.value() - 12.75).abs() < 1e-9);
        assert_eq!(mask.get_pixel(2, 2).0[0], BACKGROUND);
        for y in 10..14 {
            for x in 10..14 {
                assert_eq!(mask.get_pixel(x, y).0[0], MOTION);
            }
        }
        assert_eq!(lit(&mask), 16);
    }

    #[test]
    fn reset_restarts_warmup() {
        let mut detector = MotionDetector::default();
        detector.reset();
        assert_eq!(detector.phase(), Phase::Empty);

        for seed in 0..4 {
            detector.process(&noise(seed), 7).unwrap();
        }
        detector.reset();
        assert_eq!(detector.phase(), Phase::Empty);
        assert!(detector.dimensions().is_none());

        let mut fresh = MotionDetector::default();
        for seed in 10..12 {
            let a = detector.process(&noise(seed), 7).unwrap();
            let b = fresh.process(&noise(seed), 7).unwrap();
            assert!(a.is_warmup());
            assert_eq!(a.output(), b.output());
        }
    }

    #[test]
    fn reset_allows_new_dimensions() {
        let mut detector = MotionDetector::default();
        detector.process(&flat(10), 3).unwrap();
        detector.reset();
        let small = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        assert!(detector.process(&small, 3).unwrap().is_warmup());
        assert_eq!(detector.dimensions(), Some(Dimensions::new(8, 8)));
    }

    #[test]
    fn invalid_blur_leaves_state_untouched() {
        let mut detector = MotionDetector::default();
        detector.process(&flat(10), 3).unwrap();
        let err = detector.process(&flat(10), 33).unwrap_err();
        assert!(matches!(err, DetectorError::InvalidBlurSize { value: 33, .. }));
        assert_eq!(detector.phase(), Phase::Warming);
    }

    #[test]
    fn even_blur_is_coerced() {
        let frame = noise(4);
        let mut a = MotionDetector::default();
        let mut b = MotionDetector::default();
        let even = a.process(&frame, 14).unwrap();
        let odd = b.process(&frame, 15).unwrap();
        assert_eq!(even.output(), odd.output());
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let mut detector = MotionDetector::default();
        detector.process(&flat(10), 3).unwrap();
        detector.process(&flat(10), 3).unwrap();
        let other = RgbImage::new(W + 1, H);
        let err = detector.process(&other, 3).unwrap_err();
        assert_eq!(
            err,
            DetectorError::DimensionMismatch {
                expected: Dimensions::new(W, H),
                got: Dimensions::new(W + 1, H),
            }
        );
        assert_eq!(detector.phase(), Phase::Ready);
        // The session continues with correctly sized frames.
        assert!(detector.process(&flat(10), 3).is_ok());
    }

    #[test]
    fn empty_frame_rejected_without_state_change() {
        let mut detector = MotionDetector::default();
        let err = detector.process(&RgbImage::new(0, 0), 3).unwrap_err();
        assert_eq!(err, DetectorError::EmptyFrame(Dimensions::new(0, 0)));
        assert_eq!(detector.phase(), Phase::Empty);

        detector.process(&flat(10), 3).unwrap();
        assert!(detector.process(&RgbImage::new(W, 0), 3).is_err());
        assert_eq!(detector.phase(), Phase::Warming);
    }

    #[test]
    fn identical_sessions_are_deterministic() {
        let frames: Vec<_> = (0..8).map(noise).collect();
        let mut a = MotionDetector::default();
        let mut b = MotionDetector::default();
        for frame in &frames {
            let da = a.process(frame, 11).unwrap();
            let db = b.process(frame, 11).unwrap();
            assert_eq!(da.output(), db.output());
            assert_eq!(da.mask(), db.mask());
            assert_eq!(
                da.threshold().map(|t| t.truncated()),
                db.threshold().map(|t| t.truncated())
            );
        }
    }

    #[test]
    fn observers_see_steady_state_thresholds_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut detector = MotionDetector::default();
        detector.add_observer(move |t: &DynamicThreshold| {
            sink.lock().unwrap().push(t.truncated());
        });

        detector.process(&flat(0), 3).unwrap();
        detector.process(&flat(0), 3).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        detector.process(&flat(0), 3).unwrap();
        detector.process(&flat(255), 3).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![10, 50]);
    }
}
