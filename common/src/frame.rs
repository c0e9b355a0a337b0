use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial size of a frame, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where a detector session is in its warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No frames seen since the session started or was reset.
    Empty,
    /// Exactly one frame held.
    Warming,
    /// Two frames held; every further frame yields a motion mask.
    Ready,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Empty => "empty",
            Phase::Warming => "warming",
            Phase::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// One line of the per-frame threshold log.
///
/// Serialized as a single JSON object per line:
///
/// ```text
/// {"seq":0,"phase":"empty","threshold":null}
/// {"seq":2,"phase":"ready","threshold":17}
/// ```
///
/// `phase` is the detector phase *before* the frame was processed, so the two
/// warm-up frames of a session are logged as `empty` and `warming`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub seq: u64,
    pub phase: Phase,
    pub threshold: Option<u8>,
}

impl FrameRecord {
    pub fn new(seq: u64, phase: Phase, threshold: Option<u8>) -> Self {
        Self {
            seq,
            phase,
            threshold,
        }
    }

    /// Serialize to one JSON line, including the trailing newline.
    pub fn to_json_line(&self) -> Result<String, FrameError> {
        let mut line = serde_json::to_string(self).map_err(FrameError::Encode)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_json_line(line: &str) -> Result<Self, FrameError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(FrameError::EmptyLine);
        }
        serde_json::from_str(trimmed).map_err(FrameError::Decode)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to encode frame record: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode frame record: {0}")]
    Decode(serde_json::Error),
    #[error("frame record line is empty")]
    EmptyLine,
}
