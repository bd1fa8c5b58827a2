//! MeshSeq - Headless mesh sequence player
//!
//! Plays a clip against a simulated video clock in real time, loading
//! meshes from disk, and logs readiness and buffering as it goes.
//!
//! Usage: `meshseq [CLIP_BASE] [OPTIONS_JSON]`

use anyhow::{Context, Result};
use meshseq_core::{ClipLocator, PlayerOptions};
use meshseq_media::{DracoHeaderDecoder, FileMeshLoader};
use meshseq_stream::{GeometryResource, ManualClock, MeshSequencePlayer, PlaybackClock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Length of the simulated video.
const CLIP_DURATION_SECS: f64 = 10.0;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("MeshSeq player starting...");

    let mut args = std::env::args().skip(1);
    let clip = args.next().unwrap_or_else(|| "clips/demo".to_string());
    let mut options = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading player options from {}", path))?;
            PlayerOptions::from_json(&json)?
        }
        None => PlayerOptions {
            autoplay: true,
            ..Default::default()
        },
    };
    if options.clip.is_none() {
        options.clip = Some(ClipLocator::from(clip.as_str()));
    }
    let config = options.validate()?;

    let frame_secs = config.frame_rate.frame_duration_secs();
    let wall_limit = Duration::from_secs_f64(CLIP_DURATION_SECS * 4.0 + 5.0);

    let mut clock = ManualClock::new();
    clock.set_duration(Some(CLIP_DURATION_SECS));
    let loader = FileMeshLoader::new(".", DracoHeaderDecoder, config.max_concurrent_requests)?;

    let mut player = MeshSequencePlayer::new(config, clock, loader)?.with_observer(|change| {
        info!(
            ready = %change.ready_state,
            mesh = %change.mesh_ready_state,
            video = %change.video_ready_state,
            "Readiness changed"
        );
    });

    let started = Instant::now();
    let mut presented = 0u64;
    loop {
        player.poll_completions();

        player.clock_mut().advance(frame_secs);
        let timestamp = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(notification) = player.clock_mut().take_notification(timestamp) {
            player.on_video_frame(notification);
        }

        // Render pass.
        if let Some(mesh) = player.active_geometry() {
            presented += 1;
            debug!(
                frame = player.current_frame(),
                bytes = mesh.byte_size().unwrap_or(0),
                "draw"
            );
        }

        let clock = player.clock();
        if clock.is_paused() && !player.is_buffering() && clock.media_time() >= CLIP_DURATION_SECS {
            break;
        }
        if started.elapsed() > wall_limit {
            warn!("Stopping after {:?} without reaching the end of the clip", wall_limit);
            break;
        }
        std::thread::sleep(Duration::from_secs_f64(frame_secs));
    }

    let stats = player.loader().stats();
    info!(
        presented,
        max_frames = player.max_frames(),
        meshes_per_second = player.transfer().meshes_per_second(),
        loaded = stats.loaded,
        failed = stats.failed,
        "Playback finished"
    );
    Ok(())
}
