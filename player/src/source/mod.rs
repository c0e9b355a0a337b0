pub mod sequence;
pub mod video;

use framediff_common::config::SourceConfig;
use image::RgbImage;
use std::path::Path;

use sequence::ImageSequence;
use video::VideoFile;

/// File extensions decoded through ffmpeg.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: String,
        source: image::ImageError,
    },
    #[error("no frames found in {0}")]
    NoFrames(String),
    #[error("unsupported source {0}: expected a frame directory or a video file")]
    Unsupported(String),
    #[error("failed to spawn {0}")]
    Spawn(String),
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("ffmpeg decoder failed: {0}")]
    Decoder(String),
    #[error("truncated frame: got {got} bytes, expected {expected}")]
    TruncatedFrame { got: usize, expected: usize },
}

/// A sequential color frame supplier that can be rewound to its first frame.
pub enum FrameSource {
    Sequence(ImageSequence),
    Video(VideoFile),
}

impl FrameSource {
    /// Open the configured path as an image sequence (directory) or a video
    /// file.
    pub async fn open(config: &SourceConfig) -> Result<Self, SourceError> {
        let path = config.path.as_path();
        if path.is_dir() {
            return Ok(FrameSource::Sequence(ImageSequence::open(path)?));
        }
        if is_video_path(path) {
            return Ok(FrameSource::Video(VideoFile::open(config).await?));
        }
        Err(SourceError::Unsupported(path.display().to_string()))
    }

    /// Next frame, or `None` at end of stream.
    pub async fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        match self {
            FrameSource::Sequence(seq) => seq.next_frame(),
            FrameSource::Video(video) => video.next_frame().await,
        }
    }

    /// Seek back to the first frame.
    pub async fn rewind(&mut self) -> Result<(), SourceError> {
        match self {
            FrameSource::Sequence(seq) => {
                seq.rewind();
                Ok(())
            }
            FrameSource::Video(video) => video.rewind().await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FrameSource::Sequence(_) => "sequence",
            FrameSource::Video(_) => "video",
        }
    }
}

/// Returns true if the extension names a container ffmpeg should decode.
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
