mod playback;
mod sink;
mod source;
#[cfg(test)]
mod testutil;

use framediff_common::config::Config;
use framediff_detector::{DetectorError, MotionDetector};
use playback::Player;
use sink::{FrameSink, SinkError};
use source::{FrameSource, SourceError};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("frame worker failed: {0}")]
    Worker(String),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        source = %config.source.path.display(),
        blur_size = config.detector.blur_size,
        combine = ?config.detector.combine,
        interval_ms = config.playback.interval_ms,
        looping = config.playback.looping,
        output = %config.output.dir.display(),
        "starting framediff player"
    );

    if source::is_video_path(&config.source.path) {
        source::video::check_ffmpeg_available(&config.source.ffmpeg).await;
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "playback failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), PlayerError> {
    let source = FrameSource::open(&config.source).await?;
    let sink = FrameSink::create(&config.output)?;
    let detector = MotionDetector::from_config(&config.detector);

    let mut player = Player::new(
        source,
        detector,
        sink,
        config.detector.blur_size,
        config.playback.clone(),
    );
    let summary = player.run(shutdown_signal()).await?;
    info!(
        frames = summary.frames,
        masks = summary.masks,
        last_threshold = summary.last_threshold,
        "done"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
