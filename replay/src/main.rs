mod config;
mod frame_loop;
mod scene;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{ReplaySettings, ReplayState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let scene_path = config::scene_path_from(std::env::args().nth(1));
    let fade_duration = config::fade_duration_ms();
    let show_collision_boxes = config::show_collision_boxes();

    let scene = match scene::load(&scene_path, fade_duration, show_collision_boxes).await {
        Ok(scene) => scene,
        Err(e) => {
            tracing::error!(error = ?e, "failed to load scene");
            return;
        }
    };
    tracing::info!(
        path = %scene_path.display(),
        tiles = scene.tiles.len(),
        buckets = scene.bucket_count(),
        zoom = scene.zoom,
        fade_duration,
        "scene loaded"
    );

    let settings = ReplaySettings {
        placement_interval_ms: config::placement_interval_ms(),
        viewport: config::viewport_size(),
        cell_size: config::collision_grid_cell_px(),
        show_collision_boxes,
    };
    let mut state = ReplayState::new(scene, settings);

    let frames = frame_loop::run(
        &mut state,
        config::frame_interval(),
        config::max_frames(),
        frame_loop::wall_clock_ms,
        shutdown_signal(),
    )
    .await;

    tracing::info!(frames, "replay finished");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
