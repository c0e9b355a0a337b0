//! Three-frame differencing motion detector.
//!
//! Each call to [`MotionDetector::process`] takes one color frame and returns
//! either a warm-up pass-through image or a binary motion mask together with
//! the dynamic threshold that produced it.

pub mod blur;
pub mod compositor;
pub mod difference;
pub mod error;
pub mod history;
pub mod morphology;
pub mod observer;
pub mod pipeline;
pub mod preprocess;
pub mod threshold;

pub use blur::BlurSize;
pub use error::DetectorError;
pub use framediff_common::config::CombineMode;
pub use framediff_common::frame::{Dimensions, Phase};
pub use observer::ThresholdObserver;
pub use pipeline::{Detection, MotionDetector};
pub use threshold::DynamicThreshold;
