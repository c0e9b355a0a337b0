use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::SourceError;

/// Still-image extensions accepted in a frame directory.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A directory of still frames played in file-name order.
pub struct ImageSequence {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir).map_err(|e| SourceError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() && is_image_path(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(SourceError::NoFrames(dir.display().to_string()));
        }
        info!(dir = %dir.display(), frames = files.len(), "image sequence opened");
        Ok(Self { files, cursor: 0 })
    }

    pub fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        let img = image::open(path).map_err(|e| SourceError::Decode {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!(path = %path.display(), cursor = self.cursor, "frame decoded");
        self.cursor += 1;
        Ok(Some(img.to_rgb8()))
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
