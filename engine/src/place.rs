use glam::Mat4;
use tracing::{debug, trace};

use crate::bucket::SymbolBucket;
use crate::collision_box::{CollisionArrays, CollisionBoxArray};
use crate::debug::DebugEmitter;
use crate::grid::{CircleQuery, Claim, CollisionIndex};
use crate::pass::TileId;
use crate::symbol_size::{evaluate_size_for_feature, evaluate_size_for_zoom};

/// Per-pass inputs shared by every bucket of one tile.
#[derive(Debug, Clone, Copy)]
pub struct PlaceParams<'a> {
    pub show_debug: bool,
    /// Current view zoom.
    pub zoom: f32,
    pub pixels_to_tile_units: f32,
    pub label_plane_matrix: &'a Mat4,
    pub tile_id: TileId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementStats {
    pub text_placed: usize,
    pub text_rejected: usize,
    pub icon_placed: usize,
    pub icon_rejected: usize,
    pub duplicates: usize,
}

impl PlacementStats {
    pub fn merge(&mut self, other: PlacementStats) {
        self.text_placed += other.text_placed;
        self.text_rejected += other.text_rejected;
        self.icon_placed += other.icon_placed;
        self.icon_rejected += other.icon_rejected;
        self.duplicates += other.duplicates;
    }
}

/// Tie text and icon placement together according to which one may stand alone.
///
/// Returns the final `(place_glyph, place_icon)`.
pub fn couple_placement(
    place_glyph: bool,
    place_icon: bool,
    icon_without_text: bool,
    text_without_icon: bool,
) -> (bool, bool) {
    match (icon_without_text, text_without_icon) {
        (false, false) => {
            let both = place_glyph && place_icon;
            (both, both)
        }
        (true, false) => (place_glyph && place_icon, place_icon),
        (false, true) => (place_glyph, place_icon && place_glyph),
        (true, true) => (place_glyph, place_icon),
    }
}

/// Place every symbol instance of `bucket` greedily against `index`.
///
/// Each accepted shape is committed before the next instance is tested, so
/// the outcome depends on instance order and on the buckets placed before
/// this one in the same pass.
pub fn place<I: CollisionIndex + ?Sized>(
    bucket: &mut SymbolBucket,
    index: &mut I,
    params: &PlaceParams<'_>,
    boxes: &CollisionBoxArray,
) -> PlacementStats {
    let SymbolBucket {
        zoom: bucket_zoom,
        layout,
        text_size,
        symbol_instances,
        placed_glyphs,
        line_vertices,
        glyph_offsets,
        collision_box_debug,
        collision_circle_debug,
        ..
    } = bucket;
    let (layout, text_size) = (&*layout, &*text_size);

    let scale = 2f32.powf(params.zoom - *bucket_zoom);
    let partial_size = evaluate_size_for_zoom(text_size, params.zoom);
    let pitch_with_map = layout.pitch_with_map();
    let mut emitter = DebugEmitter::new(
        params.show_debug,
        collision_box_debug.as_mut(),
        collision_circle_debug.as_mut(),
    );
    let mut stats = PlacementStats::default();

    for instance in symbol_instances.iter_mut() {
        debug_assert!(
            instance.text_box_end_index <= boxes.len() && instance.icon_box_end_index <= boxes.len(),
            "instance {} box ranges exceed {} collision boxes",
            instance.key,
            boxes.len()
        );

        let has_text = instance.has_text();
        let has_icon = instance.has_icon();
        let text_range = instance.text_box_range();
        let icon_range = instance.icon_box_range();
        let arrays = instance
            .collision_arrays
            .get_or_insert_with(|| CollisionArrays::deserialize(boxes, text_range, icon_range));

        let icon_without_text = layout.text_optional || !has_text;
        let text_without_icon = layout.icon_optional || !has_icon;

        let mut text_box_claims: Vec<Claim> = Vec::new();
        let mut icon_box_claims: Vec<Claim> = Vec::new();
        let mut circle_claims: Vec<Claim> = Vec::new();

        if instance.is_duplicate {
            stats.duplicates += 1;
        } else {
            if let Some(text_box) = &arrays.text_box {
                text_box_claims = index.place_box(
                    text_box,
                    layout.text_allow_overlap,
                    scale,
                    params.pixels_to_tile_units,
                    params.label_plane_matrix,
                );
            }

            if let Some(icon_box) = &arrays.icon_box {
                icon_box_claims = index.place_box(
                    icon_box,
                    layout.icon_allow_overlap,
                    scale,
                    params.pixels_to_tile_units,
                    params.label_plane_matrix,
                );
            }

            let placed_symbol = instance
                .placed_text_symbol_indices
                .first()
                .and_then(|&symbol_index| placed_glyphs.get(symbol_index));
            if let (true, Some(placed_symbol)) = (arrays.has_text_circles(), placed_symbol) {
                let font_size = evaluate_size_for_feature(text_size, partial_size, placed_symbol);
                let query = CircleQuery {
                    scale,
                    pixels_to_tile_units: params.pixels_to_tile_units,
                    key: &instance.key,
                    placed_symbol,
                    line_vertices: line_vertices.as_slice(),
                    glyph_offsets: glyph_offsets.as_slice(),
                    font_size,
                    label_plane_matrix: params.label_plane_matrix,
                    debug: params.show_debug,
                    pitch_with_map,
                };
                circle_claims =
                    index.place_circles(&mut arrays.text_circles, layout.text_allow_overlap, &query);
            }
        }

        let raw_glyph = !text_box_claims.is_empty() || !circle_claims.is_empty();
        let raw_icon = !icon_box_claims.is_empty();
        let (place_glyph, place_icon) =
            couple_placement(raw_glyph, raw_icon, icon_without_text, text_without_icon);

        instance.placed_text = place_glyph;
        instance.placed_icon = place_icon;

        if has_text && !instance.is_duplicate {
            if place_glyph {
                stats.text_placed += 1;
            } else {
                stats.text_rejected += 1;
                trace!(key = %instance.key, raw_glyph, "text rejected");
            }
        }
        if has_icon && !instance.is_duplicate {
            if place_icon {
                stats.icon_placed += 1;
            } else {
                stats.icon_rejected += 1;
                trace!(key = %instance.key, raw_icon, "icon rejected");
            }
        }

        if place_glyph {
            index.insert_box(
                &text_box_claims,
                layout.text_ignore_placement,
                params.tile_id,
                instance.text_box_start_index,
            );
            index.insert_circles(
                &circle_claims,
                layout.text_ignore_placement,
                params.tile_id,
                instance.text_box_start_index,
            );
        }
        if place_icon {
            index.insert_box(
                &icon_box_claims,
                layout.icon_ignore_placement,
                params.tile_id,
                instance.icon_box_start_index,
            );
        }

        if arrays.text_box.is_some() {
            emitter.emit_box(place_glyph);
        }
        if arrays.icon_box.is_some() {
            emitter.emit_box(place_icon);
        }
        emitter.emit_circles(&arrays.text_circles, place_glyph, instance.is_duplicate);
    }

    emitter.finish();

    debug!(
        tile = ?params.tile_id,
        scale,
        text_placed = stats.text_placed,
        text_rejected = stats.text_rejected,
        icon_placed = stats.icon_placed,
        icon_rejected = stats.icon_rejected,
        duplicates = stats.duplicates,
        "placed bucket"
    );
    stats
}
