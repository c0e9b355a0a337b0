use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Smallest Gaussian kernel side accepted by the detector.
pub const MIN_BLUR_SIZE: u32 = 3;
/// Largest Gaussian kernel side accepted by the detector.
pub const MAX_BLUR_SIZE: u32 = 31;
/// Largest preview side; two previews are laid side by side on one canvas.
pub const MAX_PREVIEW_SIDE: u32 = 8192;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// A video file or a directory of still frames.
    pub path: PathBuf,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_blur_size")]
    pub blur_size: u32,
    #[serde(default)]
    pub combine: CombineMode,
}

/// How the two pairwise differences are merged into one difference frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Bitwise union of the two 8-bit magnitudes.
    #[default]
    BitwiseOr,
    /// Per-pixel maximum of the two magnitudes.
    Maximum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Keep playing from the first frame after the source is exhausted.
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_write_preview")]
    pub write_preview: bool,
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,
    #[serde(default = "default_preview_height")]
    pub preview_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_size: default_blur_size(),
            combine: CombineMode::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            looping: false,
            max_frames: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_preview: default_write_preview(),
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let blur = self.detector.blur_size;
        if !(MIN_BLUR_SIZE..=MAX_BLUR_SIZE).contains(&blur) {
            return Err(ConfigError::Invalid(format!(
                "detector.blur_size must be within {MIN_BLUR_SIZE}..={MAX_BLUR_SIZE}, got {blur}"
            )));
        }
        if self.playback.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "playback.interval_ms must be greater than zero".into(),
            ));
        }
        let (width, height) = (self.output.preview_width, self.output.preview_height);
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "output preview size must be non-zero, got {width}x{height}"
            )));
        }
        if width > MAX_PREVIEW_SIDE || height > MAX_PREVIEW_SIDE {
            return Err(ConfigError::Invalid(format!(
                "output preview size must be at most {MAX_PREVIEW_SIDE} per side, got {width}x{height}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_blur_size() -> u32 {
    13
}
fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}
fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}
fn default_interval_ms() -> u64 {
    30
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}
fn default_write_preview() -> bool {
    true
}
fn default_preview_width() -> u32 {
    600
}
fn default_preview_height() -> u32 {
    480
}
fn default_log_level() -> String {
    "info".into()
}
