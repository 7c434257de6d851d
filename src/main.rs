// src/main.rs

mod actuator;
mod config;
mod contours;
mod diagnostics;
mod direction;
mod morphology;
mod pipeline;
mod segmentation;
mod source;
mod thresholds;
mod types;

use anyhow::Result;
use pipeline::{TrackingPipeline, TrackingSession};
use source::{FrameSource, ImageSequenceSource};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{Config, SourceConfig, SourceKind};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ball_tracker={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🎯 Ball Tracker Starting");
    info!("✓ Configuration loaded from {}", config_path);

    let range = config.thresholds.bounds.range();
    info!(
        "HSV range: H {}-{} S {}-{} V {}-{} | bounds: left<{} right>{}",
        range.min[0],
        range.max[0],
        range.min[1],
        range.max[1],
        range.min[2],
        range.max[2],
        config.classifier.left_bound,
        config.classifier.right_bound
    );

    let source = open_source(&config.source)?;
    info!("✓ Frame source ready: {}", source.name());

    let actuator = actuator::from_config(&config.actuator)?;
    info!("✓ Actuator ready: {}", actuator.name());

    let thresholds = thresholds::from_config(&config.thresholds);
    let observer = diagnostics::from_config(&config.diagnostics)?;

    let mut session = TrackingSession::new(TrackingPipeline::new(&config), source, thresholds, actuator)
        .with_observer(observer);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
        let _ = stop_tx.send(true);
    });

    let summary = session.run(&config.schedule, stop_rx).await?;

    info!("\n📊 Session Report:");
    info!("  Ticks: {} ({:.1} FPS)", summary.ticks, summary.fps);
    info!(
        "  Ball seen: {} | not seen: {} | empty frames: {}",
        summary.frames_with_ball, summary.frames_without_ball, summary.empty_frames
    );
    info!(
        "  ⬅️  Left: {} | ➡️  Right: {} | re-asserted: {}",
        summary.left_commands, summary.right_commands, summary.reasserted_commands
    );
    if summary.source_errors > 0 || summary.actuator_failures > 0 {
        warn!(
            "  ⚠️  Source errors: {} | actuator failures: {}",
            summary.source_errors, summary.actuator_failures
        );
    }
    if summary.skipped_ticks > 0 {
        warn!(
            "  ⏱ {} tick(s) skipped (slowest pass {}µs)",
            summary.skipped_ticks, summary.max_tick_us
        );
    }
    info!("{}", serde_json::to_string(&summary)?);

    Ok(())
}

fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    match config.kind {
        SourceKind::Images => Ok(Box::new(ImageSequenceSource::open(&config.images_dir)?)),
        SourceKind::Camera => open_camera(config.camera_index),
    }
}

#[cfg(feature = "camera")]
fn open_camera(index: i32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(source::CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: i32) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Camera {} requested but this build has no camera support; rebuild with --features camera or set source.kind: images",
        index
    )
}
