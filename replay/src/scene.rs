use std::path::Path;

use anyhow::{Context, bail};
use glam::{Mat4, Vec2};
use serde::Deserialize;

use glyphfade_engine::{
    CollisionBoxArray, PlacedSymbol, PlacementTile, SizeData, SymbolBucket, SymbolInstance, SymbolLayout,
    TileBucket, TileId,
};

#[derive(Debug, Deserialize)]
struct SceneFile {
    zoom: f32,
    tiles: Vec<TileScene>,
}

fn default_pixels_to_tile_units() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
struct TileScene {
    id: TileId,
    #[serde(default = "default_pixels_to_tile_units")]
    pixels_to_tile_units: f32,
    /// Column-major; identity when absent.
    #[serde(default)]
    label_plane_matrix: Option<[f32; 16]>,
    #[serde(default)]
    collision_boxes: CollisionBoxArray,
    #[serde(default)]
    buckets: Vec<BucketScene>,
}

#[derive(Debug, Deserialize)]
struct BucketScene {
    zoom: f32,
    #[serde(default)]
    layout: SymbolLayout,
    #[serde(default)]
    text_size: SizeData,
    #[serde(default)]
    line_vertices: Vec<Vec2>,
    #[serde(default)]
    glyph_offsets: Vec<f32>,
    #[serde(default)]
    placed_glyphs: Vec<PlacedSymbol>,
    symbol_instances: Vec<SymbolInstance>,
}

/// Tiles ready for placement plus the view zoom they are placed at.
#[derive(Debug)]
pub struct Scene {
    pub zoom: f32,
    pub tiles: Vec<PlacementTile>,
}

impl Scene {
    pub fn bucket_count(&self) -> usize {
        self.tiles.iter().map(|tile| tile.buckets.len()).sum()
    }
}

pub async fn load(path: &Path, fade_duration: f64, collision_debug: bool) -> anyhow::Result<Scene> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read scene {}", path.display()))?;
    parse(&bytes, fade_duration, collision_debug).with_context(|| format!("invalid scene {}", path.display()))
}

pub fn parse(bytes: &[u8], fade_duration: f64, collision_debug: bool) -> anyhow::Result<Scene> {
    let file: SceneFile = serde_json::from_slice(bytes).context("failed to parse scene JSON")?;
    if file.tiles.is_empty() {
        bail!("scene has no tiles");
    }

    let mut tiles = Vec::with_capacity(file.tiles.len());
    for tile_scene in file.tiles {
        let TileId { z, x, y } = tile_scene.id;
        let matrix = tile_scene
            .label_plane_matrix
            .map(|columns| Mat4::from_cols_array(&columns))
            .unwrap_or(Mat4::IDENTITY);
        let mut tile = PlacementTile::new(
            tile_scene.id,
            tile_scene.pixels_to_tile_units,
            matrix,
            tile_scene.collision_boxes,
        );

        for (bucket_index, bucket_scene) in tile_scene.buckets.into_iter().enumerate() {
            let mut bucket = SymbolBucket::new(
                bucket_scene.zoom,
                bucket_scene.layout,
                bucket_scene.text_size,
                bucket_scene.symbol_instances,
            )
            .with_line_geometry(
                bucket_scene.placed_glyphs,
                bucket_scene.line_vertices,
                bucket_scene.glyph_offsets,
            );
            bucket
                .validate(&tile.collision_boxes)
                .with_context(|| format!("tile {z}/{x}/{y} bucket {bucket_index}"))?;
            if collision_debug {
                bucket = bucket.with_collision_debug(&tile.collision_boxes);
            }
            tile.buckets.push(TileBucket::new(bucket, fade_duration));
        }
        tiles.push(tile);
    }

    Ok(Scene {
        zoom: file.zoom,
        tiles,
    })
}
