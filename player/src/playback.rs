use std::future::Future;
use std::time::Duration;

use framediff_common::config::PlaybackConfig;
use framediff_detector::{DynamicThreshold, MotionDetector};
use image::RgbImage;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::sink::FrameSink;
use crate::source::FrameSource;
use crate::PlayerError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames: u64,
    pub masks: u64,
    pub rewinds: u64,
    pub last_threshold: Option<u8>,
}

/// Detector and sink, moved onto a blocking thread for each frame.
struct Stage {
    detector: MotionDetector,
    sink: FrameSink,
}

impl Stage {
    /// Detect and persist one frame, returning the threshold once a mask was
    /// produced.
    fn process(
        &mut self,
        seq: u64,
        frame: &RgbImage,
        blur_size: u32,
    ) -> Result<Option<u8>, PlayerError> {
        let phase = self.detector.phase();
        let detection = self.detector.process(frame, blur_size)?;
        self.sink.write(seq, phase, frame, &detection)?;
        Ok(detection.threshold().map(|t| t.truncated()))
    }
}

/// Drives a frame source through the detector at a fixed pace.
pub struct Player {
    source: FrameSource,
    // Empty only if a frame worker panicked.
    stage: Option<Stage>,
    blur_size: u32,
    config: PlaybackConfig,
    summary: PlaybackSummary,
}

impl Player {
    pub fn new(
        source: FrameSource,
        mut detector: MotionDetector,
        sink: FrameSink,
        blur_size: u32,
        config: PlaybackConfig,
    ) -> Self {
        detector.add_observer(|t: &DynamicThreshold| {
            debug!(
                threshold = t.truncated(),
                mean = format!("{:.2}", t.mean()),
                "dynamic threshold"
            );
        });
        Self {
            source,
            stage: Some(Stage { detector, sink }),
            blur_size,
            config,
            summary: PlaybackSummary::default(),
        }
    }

    /// Play until the source ends (or forever when looping), `max_frames` is
    /// reached, or `shutdown` resolves. A pending frame read is abandoned on
    /// shutdown.
    pub async fn run(
        &mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PlaybackSummary, PlayerError> {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            source = self.source.kind(),
            interval_ms = self.config.interval_ms,
            looping = self.config.looping,
            blur_size = self.blur_size,
            "playback started"
        );

        let mut frames_since_rewind: u64 = 0;
        loop {
            if let Some(max) = self.config.max_frames {
                if self.summary.frames >= max {
                    info!(max_frames = max, "frame limit reached");
                    break;
                }
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("stop requested");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("stop requested while reading a frame");
                    break;
                }
                next = self.source.next_frame() => next?,
            };

            match next {
                Some(frame) => {
                    self.process(frame).await?;
                    frames_since_rewind += 1;
                }
                None => {
                    debug!(frames = self.summary.frames, "end of stream");
                    self.rewind().await?;
                    if !self.config.looping {
                        break;
                    }
                    if frames_since_rewind == 0 {
                        warn!("source produced no frames after rewind, stopping");
                        break;
                    }
                    frames_since_rewind = 0;
                }
            }
        }

        let stage = self.stage_mut()?;
        stage.sink.flush()?;
        let written = stage.sink.written();
        info!(
            frames = self.summary.frames,
            masks = self.summary.masks,
            written,
            rewinds = self.summary.rewinds,
            "playback finished"
        );
        Ok(self.summary.clone())
    }

    /// Run detection and output for one frame on the blocking pool.
    async fn process(&mut self, frame: RgbImage) -> Result<(), PlayerError> {
        let mut stage = self.stage.take().ok_or_else(lost_stage)?;
        let seq = self.summary.frames;
        let blur_size = self.blur_size;

        let (stage, result) = tokio::task::spawn_blocking(move || {
            let result = stage.process(seq, &frame, blur_size);
            (stage, result)
        })
        .await
        .map_err(|e| PlayerError::Worker(e.to_string()))?;
        self.stage = Some(stage);

        if let Some(threshold) = result? {
            self.summary.masks += 1;
            self.summary.last_threshold = Some(threshold);
        }
        self.summary.frames += 1;
        Ok(())
    }

    /// Seek back to the first frame and start a fresh detector session.
    pub async fn rewind(&mut self) -> Result<(), PlayerError> {
        self.source.rewind().await?;
        self.stage_mut()?.detector.reset();
        self.summary.rewinds += 1;
        debug!(rewinds = self.summary.rewinds, "rewound to first frame");
        Ok(())
    }

    fn stage_mut(&mut self) -> Result<&mut Stage, PlayerError> {
        self.stage.as_mut().ok_or_else(lost_stage)
    }
}

fn lost_stage() -> PlayerError {
    PlayerError::Worker("detector state lost to an earlier worker panic".into())
}
