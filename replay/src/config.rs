use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCENE_PATH: &str = "scene.json";
pub const DEFAULT_FADE_DURATION_MS: u64 = 300;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16; // ~60 fps
pub const DEFAULT_PLACEMENT_INTERVAL_MS: u64 = 300;
pub const DEFAULT_MAX_FRAMES: u64 = 120;
pub const DEFAULT_COLLISION_GRID_CELL_PX: u32 = 25;
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 768;

/// Scene path from the first CLI argument, else `GLYPHFADE_SCENE`.
pub fn scene_path_from(arg: Option<String>) -> PathBuf {
    arg.filter(|value| !value.trim().is_empty())
        .or_else(|| std::env::var("GLYPHFADE_SCENE").ok())
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENE_PATH))
}

/// Fade length in milliseconds; zero makes every fade instantaneous.
pub fn fade_duration_ms() -> f64 {
    std::env::var("FADE_DURATION_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_FADE_DURATION_MS) as f64
}

pub fn frame_interval() -> Duration {
    std::env::var("FRAME_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS))
}

pub fn placement_interval_ms() -> f64 {
    std::env::var("PLACEMENT_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_PLACEMENT_INTERVAL_MS) as f64
}

/// Frames to run; `None` runs until shutdown.
pub fn max_frames() -> Option<u64> {
    let frames = std::env::var("MAX_FRAMES")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_FRAMES);
    (frames > 0).then_some(frames)
}

pub fn show_collision_boxes() -> bool {
    std::env::var("SHOW_COLLISION_BOXES")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

pub fn collision_grid_cell_px() -> u32 {
    std::env::var("COLLISION_GRID_CELL_PX")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_COLLISION_GRID_CELL_PX)
}

pub fn viewport_size() -> (u32, u32) {
    let dimension = |name: &str, default: u32| {
        std::env::var(name)
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(default)
    };
    (
        dimension("VIEWPORT_WIDTH", DEFAULT_VIEWPORT_WIDTH),
        dimension("VIEWPORT_HEIGHT", DEFAULT_VIEWPORT_HEIGHT),
    )
}
