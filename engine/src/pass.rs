use std::cmp::Reverse;

use glam::Mat4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bucket::SymbolBucket;
use crate::collision_box::CollisionBoxArray;
use crate::fade::update_opacities;
use crate::grid::CollisionIndex;
use crate::opacity::FadeTiming;
use crate::place::{PlaceParams, PlacementStats, place};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Stable numeric key, unique per tile up to zoom 31.
    pub fn key(&self) -> u64 {
        let dim = 1u64 << self.z.min(31);
        (dim.wrapping_mul(u64::from(self.y)).wrapping_add(u64::from(self.x)))
            .wrapping_mul(32)
            .wrapping_add(u64::from(self.z))
    }
}

/// A bucket with the fade clock it shares between its instances.
#[derive(Debug)]
pub struct TileBucket {
    pub bucket: SymbolBucket,
    pub fade_timing: FadeTiming,
}

impl TileBucket {
    pub fn new(bucket: SymbolBucket, fade_duration: f64) -> Self {
        Self {
            bucket,
            fade_timing: FadeTiming::new(fade_duration),
        }
    }
}

/// Everything needed to place the buckets of one tile.
#[derive(Debug)]
pub struct PlacementTile {
    pub id: TileId,
    pub pixels_to_tile_units: f32,
    /// Tile units to collision-plane pixels.
    pub label_plane_matrix: Mat4,
    pub collision_boxes: CollisionBoxArray,
    pub buckets: Vec<TileBucket>,
}

impl PlacementTile {
    pub fn new(id: TileId, pixels_to_tile_units: f32, label_plane_matrix: Mat4, collision_boxes: CollisionBoxArray) -> Self {
        Self {
            id,
            pixels_to_tile_units,
            label_plane_matrix,
            collision_boxes,
            buckets: Vec::new(),
        }
    }

    pub fn with_bucket(mut self, bucket: TileBucket) -> Self {
        self.buckets.push(bucket);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub generation: u64,
    pub tiles: usize,
    pub buckets: usize,
    pub stats: PlacementStats,
}

/// Runs placement passes over a set of tiles against one collision index.
#[derive(Debug, Clone, Default)]
pub struct PlacementPass {
    pub show_collision_boxes: bool,
    generation: u64,
}

impl PlacementPass {
    pub fn new(show_collision_boxes: bool) -> Self {
        Self {
            show_collision_boxes,
            generation: 0,
        }
    }

    /// Completed passes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear `index` and place every bucket of every tile, best tiles first.
    pub fn run<I: CollisionIndex + ?Sized>(
        &mut self,
        index: &mut I,
        tiles: &mut [PlacementTile],
        zoom: f32,
    ) -> PassSummary {
        index.clear();
        tiles.sort_by_key(|tile| (Reverse(tile.id.z), tile.id.key()));

        let mut summary = PassSummary {
            generation: self.generation + 1,
            tiles: tiles.len(),
            ..PassSummary::default()
        };
        for tile in tiles.iter_mut() {
            let params = PlaceParams {
                show_debug: self.show_collision_boxes,
                zoom,
                pixels_to_tile_units: tile.pixels_to_tile_units,
                label_plane_matrix: &tile.label_plane_matrix,
                tile_id: tile.id,
            };
            for entry in tile.buckets.iter_mut() {
                let stats = place(&mut entry.bucket, index, &params, &tile.collision_boxes);
                summary.stats.merge(stats);
                summary.buckets += 1;
            }
        }

        self.generation = summary.generation;
        debug!(
            generation = summary.generation,
            tiles = summary.tiles,
            buckets = summary.buckets,
            text_placed = summary.stats.text_placed,
            icon_placed = summary.stats.icon_placed,
            "placement pass complete"
        );
        summary
    }
}

/// Advance the fades of every bucket to `now`; buckets are independent and
/// run in parallel. Returns true while any bucket is still mid-fade.
pub fn update_fades(tiles: &mut [PlacementTile], now: f64) -> bool {
    tiles
        .par_iter_mut()
        .flat_map_iter(|tile| tile.buckets.iter_mut())
        .map(|entry| {
            update_opacities(&mut entry.bucket, &mut entry.fade_timing, now);
            entry.fade_timing.is_fading(now)
        })
        .reduce(|| false, |a, b| a || b)
}

/// Drop a tile's claims from `index` and the tile itself from `tiles`.
pub fn remove_tile<I: CollisionIndex + ?Sized>(
    index: &mut I,
    tiles: &mut Vec<PlacementTile>,
    id: TileId,
) -> Option<PlacementTile> {
    index.remove_tile(id);
    let position = tiles.iter().position(|tile| tile.id == id)?;
    Some(tiles.remove(position))
}
