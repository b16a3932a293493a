use glyphfade_engine::{GridIndex, PassSummary, PlacementPass, PlacementTile, update_fades};

use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplaySettings {
    pub placement_interval_ms: f64,
    pub viewport: (u32, u32),
    pub cell_size: u32,
    pub show_collision_boxes: bool,
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub frame: u64,
    /// Set when this frame ran a placement pass.
    pub placement: Option<PassSummary>,
    pub fading: bool,
    /// CRC32 over every packed opacity stream, in tile order.
    pub digest: u32,
    pub digest_changed: bool,
}

/// Tiles, collision index and clocks of a running replay.
pub struct ReplayState {
    pub zoom: f32,
    pub tiles: Vec<PlacementTile>,
    index: GridIndex,
    pass: PlacementPass,
    placement_interval_ms: f64,
    last_placement: Option<f64>,
    frame: u64,
    last_digest: Option<u32>,
}

impl ReplayState {
    pub fn new(scene: Scene, settings: ReplaySettings) -> Self {
        let (width, height) = settings.viewport;
        Self {
            zoom: scene.zoom,
            tiles: scene.tiles,
            index: GridIndex::new(width, height, settings.cell_size),
            pass: PlacementPass::new(settings.show_collision_boxes),
            placement_interval_ms: settings.placement_interval_ms,
            last_placement: None,
            frame: 0,
            last_digest: None,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    /// Run a placement pass if one is due, then advance every fade to `now`.
    pub fn step(&mut self, now: f64) -> FrameOutcome {
        let due = self
            .last_placement
            .is_none_or(|last| now - last >= self.placement_interval_ms);
        let placement = due.then(|| {
            self.last_placement = Some(now);
            self.pass.run(&mut self.index, &mut self.tiles, self.zoom)
        });

        let fading = update_fades(&mut self.tiles, now);
        let digest = self.opacity_digest();
        let digest_changed = self.last_digest != Some(digest);
        self.last_digest = Some(digest);
        self.frame += 1;

        FrameOutcome {
            frame: self.frame,
            placement,
            fading,
            digest,
            digest_changed,
        }
    }

    fn opacity_digest(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for tile in &self.tiles {
            for entry in &tile.buckets {
                let bucket = &entry.bucket;
                for stream in [&bucket.text_opacity, &bucket.icon_opacity].into_iter().flatten() {
                    hasher.update(stream.array.serialize());
                }
            }
        }
        hasher.finalize()
    }
}
