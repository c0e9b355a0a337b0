//! Source configs for tests, including stand-in ffmpeg and ffprobe shell
//! scripts for driving the video source without a real decoder installed.

use framediff_common::config::SourceConfig;
use std::path::Path;
#[cfg(unix)]
use std::{os::unix::fs::PermissionsExt, path::PathBuf};

/// ffprobe body reporting a single 4x2 video stream.
#[cfg(unix)]
pub const PROBE_4X2: &str = r#"echo '{"streams":[{"width":4,"height":2}]}'"#;

pub fn sequence_source(path: &Path) -> SourceConfig {
    SourceConfig {
        path: path.to_path_buf(),
        ffmpeg: "ffmpeg".into(),
        ffprobe: "ffprobe".into(),
    }
}

#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[cfg(unix)]
/// A video source config whose tools are the given script bodies.
pub fn video_source(dir: &Path, ffprobe: &str, ffmpeg: &str) -> SourceConfig {
    SourceConfig {
        path: dir.join("clip.mp4"),
        ffmpeg: script(dir, "ffmpeg", ffmpeg),
        ffprobe: script(dir, "ffprobe", ffprobe),
    }
}
