use framediff_common::config::OutputConfig;
use framediff_common::frame::{FrameError, FrameRecord, Phase};
use framediff_detector::Detection;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const THRESHOLD_LOG: &str = "thresholds.jsonl";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Image {
        path: String,
        source: image::ImageError,
    },
    #[error(transparent)]
    Record(#[from] FrameError),
}

/// Headless display surface: writes masks, optional previews and the
/// per-frame threshold log into the output directory.
pub struct FrameSink {
    dir: PathBuf,
    preview_size: Option<(u32, u32)>,
    log: BufWriter<File>,
    written: u64,
}

impl FrameSink {
    pub fn create(config: &OutputConfig) -> Result<Self, SinkError> {
        std::fs::create_dir_all(&config.dir).map_err(|e| io_error(&config.dir, e))?;
        let log_path = config.dir.join(THRESHOLD_LOG);
        let log = File::create(&log_path).map_err(|e| io_error(&log_path, e))?;
        let preview_size = config
            .write_preview
            .then_some((config.preview_width, config.preview_height));
        info!(dir = %config.dir.display(), preview = ?preview_size, "frame sink ready");
        Ok(Self {
            dir: config.dir.clone(),
            preview_size,
            log: BufWriter::new(log),
            written: 0,
        })
    }

    /// Persist one processed frame. `phase` is the detector phase before the
    /// frame was processed.
    pub fn write(
        &mut self,
        seq: u64,
        phase: Phase,
        original: &RgbImage,
        detection: &Detection,
    ) -> Result<(), SinkError> {
        let mask_path = self.dir.join(format!("mask_{seq:06}.png"));
        save(detection.output(), &mask_path)?;

        if let Some((width, height)) = self.preview_size {
            let preview = side_by_side(original, detection.output(), width, height);
            save(&preview, &self.dir.join(format!("preview_{seq:06}.png")))?;
        }

        let threshold = detection.threshold().map(|t| t.truncated());
        let line = FrameRecord::new(seq, phase, threshold).to_json_line()?;
        self.log
            .write_all(line.as_bytes())
            .map_err(|e| io_error(&self.dir.join(THRESHOLD_LOG), e))?;

        self.written += 1;
        debug!(seq, phase = %phase, threshold, "frame written");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.log
            .flush()
            .map_err(|e| io_error(&self.dir.join(THRESHOLD_LOG), e))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Original and processed frames resized to `width`x`height` and placed side
/// by side.
pub fn side_by_side(
    original: &RgbImage,
    processed: &RgbImage,
    width: u32,
    height: u32,
) -> RgbImage {
    let left = imageops::resize(original, width, height, FilterType::Lanczos3);
    let right = imageops::resize(processed, width, height, FilterType::Lanczos3);
    let mut canvas = RgbImage::new(width * 2, height);
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, width as i64, 0);
    canvas
}

fn save(img: &RgbImage, path: &Path) -> Result<(), SinkError> {
    img.save(path).map_err(|e| SinkError::Image {
        path: path.display().to_string(),
        source: e,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}
