use framediff_common::config::SourceConfig;
use framediff_common::frame::Dimensions;
use image::RgbImage;
use serde::Deserialize;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SourceError;

/// Bytes of ffmpeg stderr kept for error reports.
const STDERR_TAIL_BYTES: usize = 4096;

/// A video file decoded by an ffmpeg child process into raw RGB24 frames.
pub struct VideoFile {
    path: PathBuf,
    ffmpeg: PathBuf,
    dims: Dimensions,
    decoder: Option<Decoder>,
    frames_read: u64,
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
    stderr: JoinHandle<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

impl VideoFile {
    pub async fn open(config: &SourceConfig) -> Result<Self, SourceError> {
        let dims = probe_dimensions(&config.ffprobe, &config.path).await?;
        let mut video = Self {
            path: config.path.clone(),
            ffmpeg: config.ffmpeg.clone(),
            dims,
            decoder: None,
            frames_read: 0,
        };
        video.spawn_decoder()?;
        info!(path = %config.path.display(), dims = %dims, "video opened");
        Ok(video)
    }

    fn spawn_decoder(&mut self) -> Result<(), SourceError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(decoder_args(&self.path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SourceError::Spawn(format!("{}: {e}", self.ffmpeg.display())))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Spawn("could not get ffmpeg stdout handle".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SourceError::Spawn("could not get ffmpeg stderr handle".into()))?;

        debug!(path = %self.path.display(), "ffmpeg decoder started");
        self.decoder = Some(Decoder {
            child,
            stdout,
            stderr: tokio::spawn(drain_stderr(stderr)),
        });
        self.frames_read = 0;
        Ok(())
    }

    pub async fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        let expected = self.dims.pixel_count() * 3;
        let mut buf = vec![0u8; expected];
        let filled = read_frame(&mut decoder.stdout, &mut buf)
            .await
            .map_err(|e| SourceError::Io {
                path: self.path.display().to_string(),
                source: e,
            })?;

        if filled < expected {
            self.finish_decoder().await?;
            if filled > 0 {
                return Err(SourceError::TruncatedFrame {
                    got: filled,
                    expected,
                });
            }
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.dims.width, self.dims.height, buf)
            .map(Some)
            .ok_or(SourceError::TruncatedFrame {
                got: filled,
                expected,
            })
    }

    /// Kill the running decoder and start again from the first frame.
    pub async fn rewind(&mut self) -> Result<(), SourceError> {
        if let Some(mut decoder) = self.decoder.take() {
            if let Err(e) = decoder.child.kill().await {
                warn!(error = %e, "failed to kill ffmpeg decoder");
            }
            decoder.stderr.abort();
        }
        self.spawn_decoder()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    // Reap the decoder at end of stream and surface its exit status.
    async fn finish_decoder(&mut self) -> Result<(), SourceError> {
        let Some(Decoder {
            mut child,
            stdout,
            stderr,
        }) = self.decoder.take()
        else {
            return Ok(());
        };
        drop(stdout);
        let status = child
            .wait()
            .await
            .map_err(|e| SourceError::Decoder(e.to_string()))?;
        let stderr = stderr.await.unwrap_or_else(|e| {
            warn!(error = %e, "ffmpeg stderr reader failed");
            String::new()
        });
        if !status.success() {
            return Err(SourceError::Decoder(format!("{status}: {stderr}")));
        }
        info!(frames = self.frames_read, "video decoding complete");
        Ok(())
    }
}

/// ffmpeg arguments decoding `path` to raw RGB24 on stdout.
///
/// Autorotation is disabled so frames keep the coded size ffprobe reports.
pub fn decoder_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        ["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]
            .into_iter()
            .map(OsString::from),
    );
    args
}

/// Fill `buf` from `reader`, returning the number of bytes read. Short only
/// at end of stream.
async fn read_frame<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// Consume ffmpeg's stderr as it is written so the decoder never blocks on a
// full pipe. Returns the last STDERR_TAIL_BYTES as text.
async fn drain_stderr<R>(mut stderr: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail: VecDeque<u8> = VecDeque::with_capacity(STDERR_TAIL_BYTES);
    let mut chunk = [0u8; 4096];
    let mut total = 0usize;
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                tail.extend(&chunk[..n]);
                let excess = tail.len().saturating_sub(STDERR_TAIL_BYTES);
                tail.drain(..excess);
            }
            Err(e) => {
                warn!(error = %e, "failed to read ffmpeg stderr");
                break;
            }
        }
    }
    if total > 0 {
        debug!(bytes = total, "ffmpeg stderr closed");
    }
    let bytes: Vec<u8> = tail.into_iter().collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

/// Query the first video stream's dimensions with ffprobe.
pub async fn probe_dimensions(ffprobe: &Path, path: &Path) -> Result<Dimensions, SourceError> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height", "-of", "json"])
        .arg(path)
        .output()
        .await
        .map_err(|e| SourceError::Spawn(format!("{}: {e}", ffprobe.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Probe(stderr.trim().to_string()));
    }
    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe(json: &str) -> Result<Dimensions, SourceError> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| SourceError::Probe(e.to_string()))?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| SourceError::Probe("no video stream".into()))?;
    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok(Dimensions::new(w, h)),
        _ => Err(SourceError::Probe("video stream has no dimensions".into())),
    }
}

/// Check whether ffmpeg can be run. Logs a warning if not.
pub async fn check_ffmpeg_available(ffmpeg: &Path) {
    match Command::new(ffmpeg).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!("ffmpeg is available");
        }
        Ok(_) => {
            warn!("ffmpeg returned non-zero for -version; video decoding may fail");
        }
        Err(e) => {
            warn!(
                error = %e,
                ffmpeg = %ffmpeg.display(),
                "ffmpeg not found; video sources will fail. \
                 Use a directory of frames or install ffmpeg."
            );
        }
    }
}
