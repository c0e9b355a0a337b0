use crate::threshold::DynamicThreshold;

/// Receives the dynamic threshold of every frame that produced a motion mask.
///
/// Warm-up frames are not reported.
pub trait ThresholdObserver: Send {
    fn on_threshold(&mut self, threshold: &DynamicThreshold);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<F> ThresholdObserver for F
where
    F: FnMut(&DynamicThreshold) + Send,
{
    fn on_threshold(&mut self, threshold: &DynamicThreshold) {
        self(threshold)
    }
}
