//! Uniform-grid collision index over the viewport.

use std::ops::Range;

use glam::{Mat4, Vec2, Vec4};
use tracing::trace;

use crate::bucket::PlacedSymbol;
use crate::collision_box::{CollisionBox, CollisionCircle};
use crate::pass::TileId;

/// Glyph offsets are laid out for a font of this size.
pub const ONE_EM: f32 = 24.0;

pub const DEFAULT_CELL_SIZE: u32 = 25;

/// A shape in viewport pixels that a symbol wants to occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Claim {
    Box { x1: f32, y1: f32, x2: f32, y2: f32 },
    Circle { x: f32, y: f32, radius: f32 },
}

impl Claim {
    /// Bounding rectangle as `[x1, y1, x2, y2]`.
    pub fn bounds(&self) -> [f32; 4] {
        match *self {
            Claim::Box { x1, y1, x2, y2 } => [x1, y1, x2, y2],
            Claim::Circle { x, y, radius } => [x - radius, y - radius, x + radius, y + radius],
        }
    }

    /// Strict overlap: shapes that only touch do not intersect.
    pub fn intersects(&self, other: &Claim) -> bool {
        match (*self, *other) {
            (Claim::Box { .. }, Claim::Box { .. }) => rects_overlap(self.bounds(), other.bounds()),
            (
                Claim::Circle { x, y, radius },
                Claim::Circle {
                    x: ox,
                    y: oy,
                    radius: oradius,
                },
            ) => {
                let reach = radius + oradius;
                Vec2::new(x, y).distance_squared(Vec2::new(ox, oy)) < reach * reach
            }
            (Claim::Circle { x, y, radius }, Claim::Box { .. }) => {
                circle_overlaps_rect(Vec2::new(x, y), radius, other.bounds())
            }
            (Claim::Box { .. }, Claim::Circle { x, y, radius }) => {
                circle_overlaps_rect(Vec2::new(x, y), radius, self.bounds())
            }
        }
    }
}

#[inline]
fn rects_overlap(a: [f32; 4], b: [f32; 4]) -> bool {
    a[0] < b[2] && a[2] > b[0] && a[1] < b[3] && a[3] > b[1]
}

#[inline]
fn circle_overlaps_rect(center: Vec2, radius: f32, rect: [f32; 4]) -> bool {
    let closest = center.clamp(Vec2::new(rect[0], rect[1]), Vec2::new(rect[2], rect[3]));
    center.distance_squared(closest) < radius * radius
}

/// Everything circle placement needs besides the circles themselves.
#[derive(Debug, Clone, Copy)]
pub struct CircleQuery<'a> {
    pub scale: f32,
    pub pixels_to_tile_units: f32,
    pub key: &'a str,
    pub placed_symbol: &'a PlacedSymbol,
    pub line_vertices: &'a [Vec2],
    pub glyph_offsets: &'a [f32],
    pub font_size: f32,
    pub label_plane_matrix: &'a Mat4,
    pub debug: bool,
    pub pitch_with_map: bool,
}

/// The spatial index a placement pass claims space in.
///
/// `place_*` only tests; an empty result means the shape was rejected.
/// `insert_*` commits the claims a `place_*` call returned.
pub trait CollisionIndex {
    fn place_box(
        &self,
        collision_box: &CollisionBox,
        allow_overlap: bool,
        scale: f32,
        pixels_to_tile_units: f32,
        label_plane_matrix: &Mat4,
    ) -> Vec<Claim>;

    fn place_circles(
        &self,
        circles: &mut [CollisionCircle],
        allow_overlap: bool,
        query: &CircleQuery<'_>,
    ) -> Vec<Claim>;

    fn insert_box(
        &mut self,
        claims: &[Claim],
        ignore_placement: bool,
        tile: TileId,
        priority_key: usize,
    );

    fn insert_circles(
        &mut self,
        claims: &[Claim],
        ignore_placement: bool,
        tile: TileId,
        priority_key: usize,
    );

    /// Drop every claim owned by `tile`.
    fn remove_tile(&mut self, tile: TileId);

    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    claim: Claim,
    tile: TileId,
    priority_key: usize,
}

/// Collision index backed by a uniform grid of `cell_size` pixel cells.
///
/// Each cell holds the indices of the committed claims overlapping it. Claims
/// committed with `ignore_placement` are kept aside and never hit-tested.
#[derive(Debug, Clone)]
pub struct GridIndex {
    width: f32,
    height: f32,
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
    entries: Vec<Entry>,
    ignored: Vec<Entry>,
}

impl GridIndex {
    pub fn new(width: u32, height: u32, cell_size: u32) -> Self {
        let cell_size = cell_size.max(1);
        let cols = width.div_ceil(cell_size).max(1) as usize;
        let rows = height.div_ceil(cell_size).max(1) as usize;

        Self {
            width: width as f32,
            height: height as f32,
            cell_size: cell_size as f32,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            entries: Vec::new(),
            ignored: Vec::new(),
        }
    }

    /// Committed claims that block later symbols.
    pub fn claim_count(&self) -> usize {
        self.entries.len()
    }

    /// Committed claims that block nothing.
    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }

    pub fn claims_for_tile(&self, tile: TileId) -> impl Iterator<Item = (Claim, usize)> + '_ {
        self.entries
            .iter()
            .chain(self.ignored.iter())
            .filter(move |entry| entry.tile == tile)
            .map(|entry| (entry.claim, entry.priority_key))
    }

    /// Cells covered by `bounds`, or `None` when it lies entirely off the grid.
    fn cell_range(&self, bounds: [f32; 4]) -> Option<(Range<usize>, Range<usize>)> {
        let [x1, y1, x2, y2] = bounds;
        let on_grid = x2 > 0.0 && y2 > 0.0 && x1 < self.width && y1 < self.height;
        if !on_grid {
            return None;
        }

        let col0 = ((x1.max(0.0) / self.cell_size).floor() as usize).min(self.cols - 1);
        let row0 = ((y1.max(0.0) / self.cell_size).floor() as usize).min(self.rows - 1);
        let col1 = ((x2.min(self.width) / self.cell_size).ceil() as usize).clamp(col0 + 1, self.cols);
        let row1 = ((y2.min(self.height) / self.cell_size).ceil() as usize).clamp(row0 + 1, self.rows);
        Some((row0..row1, col0..col1))
    }

    fn collides(&self, claim: &Claim) -> bool {
        let Some((rows, cols)) = self.cell_range(claim.bounds()) else {
            return false;
        };
        rows.flat_map(|row| cols.clone().map(move |col| row * self.cols + col))
            .flat_map(|cell| self.cells[cell].iter())
            .any(|&index| self.entries[index].claim.intersects(claim))
    }

    fn insert(&mut self, claims: &[Claim], ignore_placement: bool, tile: TileId, priority_key: usize) {
        for &claim in claims {
            let entry = Entry {
                claim,
                tile,
                priority_key,
            };
            if ignore_placement {
                self.ignored.push(entry);
                continue;
            }
            let index = self.entries.len();
            self.entries.push(entry);
            self.index_cells(index);
        }
    }

    fn index_cells(&mut self, index: usize) {
        let Some((rows, cols)) = self.cell_range(self.entries[index].claim.bounds()) else {
            return;
        };
        for row in rows {
            for col in cols.clone() {
                self.cells[row * self.cols + col].push(index);
            }
        }
    }

    fn project(matrix: &Mat4, point: Vec2) -> (Vec2, f32) {
        let projected = *matrix * Vec4::new(point.x, point.y, 0.0, 1.0);
        let w = if projected.w.abs() > f32::EPSILON {
            projected.w
        } else {
            1.0
        };
        (Vec2::new(projected.x / w, projected.y / w), w)
    }
}

impl CollisionIndex for GridIndex {
    fn place_box(
        &self,
        collision_box: &CollisionBox,
        allow_overlap: bool,
        scale: f32,
        pixels_to_tile_units: f32,
        label_plane_matrix: &Mat4,
    ) -> Vec<Claim> {
        let (center, _) = Self::project(label_plane_matrix, collision_box.anchor);
        let tile_to_pixels = 1.0 / (scale * pixels_to_tile_units);
        let claim = Claim::Box {
            x1: center.x + collision_box.x1 * tile_to_pixels,
            y1: center.y + collision_box.y1 * tile_to_pixels,
            x2: center.x + collision_box.x2 * tile_to_pixels,
            y2: center.y + collision_box.y2 * tile_to_pixels,
        };

        if !allow_overlap && self.collides(&claim) {
            return Vec::new();
        }
        vec![claim]
    }

    fn place_circles(
        &self,
        circles: &mut [CollisionCircle],
        allow_overlap: bool,
        query: &CircleQuery<'_>,
    ) -> Vec<Claim> {
        let symbol = query.placed_symbol;
        let tile_units_per_pixel = query.scale * query.pixels_to_tile_units;

        let glyphs = query.glyph_offsets.get(symbol.glyph_range()).unwrap_or(&[]);
        let (Some(&first), Some(&last)) = (glyphs.first(), glyphs.last()) else {
            trace!(key = query.key, "no glyphs to place along line");
            return Vec::new();
        };
        let em_scale = query.font_size / ONE_EM * tile_units_per_pixel;
        let start_offset = first.min(last) * em_scale;
        let end_offset = first.max(last) * em_scale;

        let fits = label_fits_line(symbol, query.line_vertices, start_offset, end_offset);
        if !fits && !query.debug {
            trace!(key = query.key, "label does not fit its line");
            return Vec::new();
        }

        for circle in circles.iter_mut() {
            let distance = circle.signed_distance_from_anchor;
            circle.used = distance >= start_offset - circle.radius && distance <= end_offset + circle.radius;
        }
        if !fits {
            return Vec::new();
        }

        let mut claims = Vec::with_capacity(circles.len());
        for circle in circles.iter().filter(|circle| circle.used) {
            let (center, w) = Self::project(query.label_plane_matrix, circle.anchor);
            let mut radius = circle.radius / tile_units_per_pixel;
            if query.pitch_with_map {
                radius /= w;
            }
            let claim = Claim::Circle {
                x: center.x,
                y: center.y,
                radius,
            };
            if !allow_overlap && self.collides(&claim) {
                return Vec::new();
            }
            claims.push(claim);
        }
        claims
    }

    fn insert_box(
        &mut self,
        claims: &[Claim],
        ignore_placement: bool,
        tile: TileId,
        priority_key: usize,
    ) {
        self.insert(claims, ignore_placement, tile, priority_key);
    }

    fn insert_circles(
        &mut self,
        claims: &[Claim],
        ignore_placement: bool,
        tile: TileId,
        priority_key: usize,
    ) {
        self.insert(claims, ignore_placement, tile, priority_key);
    }

    fn remove_tile(&mut self, tile: TileId) {
        self.ignored.retain(|entry| entry.tile != tile);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.tile != tile);
        if self.entries.len() == before {
            return;
        }

        for cell in &mut self.cells {
            cell.clear();
        }
        for index in 0..self.entries.len() {
            self.index_cells(index);
        }
    }

    fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.entries.clear();
        self.ignored.clear();
    }
}

/// Whether `[start_offset, end_offset]` around the anchor stays on the line.
fn label_fits_line(symbol: &PlacedSymbol, line_vertices: &[Vec2], start_offset: f32, end_offset: f32) -> bool {
    let Some(line) = line_vertices.get(symbol.line_range()) else {
        return false;
    };
    if line.len() < 2 || symbol.segment + 1 >= line.len() {
        return false;
    }

    let segment = symbol.segment;
    let backward = symbol.anchor.distance(line[segment])
        + line[..=segment]
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum::<f32>();
    let forward = symbol.anchor.distance(line[segment + 1])
        + line[segment + 1..]
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum::<f32>();

    -start_offset.min(0.0) <= backward && end_offset.max(0.0) <= forward
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: TileId = TileId { z: 0, x: 0, y: 0 };

    fn square(anchor: Vec2, half: f32) -> CollisionBox {
        CollisionBox {
            anchor,
            x1: -half,
            y1: -half,
            x2: half,
            y2: half,
        }
    }

    fn circle(x: f32, signed_distance_from_anchor: f32) -> CollisionCircle {
        CollisionCircle {
            anchor: Vec2::new(x, 50.0),
            radius: 5.0,
            signed_distance_from_anchor,
            used: true,
        }
    }

    fn line_symbol() -> PlacedSymbol {
        PlacedSymbol {
            anchor: Vec2::new(50.0, 50.0),
            segment: 0,
            line_start_index: 0,
            line_length: 2,
            glyph_start_index: 0,
            num_glyphs: 2,
            ..PlacedSymbol::default()
        }
    }

    fn query<'a>(
        symbol: &'a PlacedSymbol,
        line: &'a [Vec2],
        offsets: &'a [f32],
        matrix: &'a Mat4,
    ) -> CircleQuery<'a> {
        CircleQuery {
            scale: 1.0,
            pixels_to_tile_units: 1.0,
            key: "road",
            placed_symbol: symbol,
            line_vertices: line,
            glyph_offsets: offsets,
            font_size: ONE_EM,
            label_plane_matrix: matrix,
            debug: false,
            pitch_with_map: false,
        }
    }

    #[test]
    fn overlapping_boxes_collide() {
        let mut grid = GridIndex::new(200, 200, 25);
        let first = grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        assert_eq!(first.len(), 1);
        grid.insert_box(&first, false, TILE, 0);

        let second = grid.place_box(&square(Vec2::new(60.0, 55.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        assert!(second.is_empty());

        let overlapping = grid.place_box(&square(Vec2::new(60.0, 55.0), 10.0), true, 1.0, 1.0, &Mat4::IDENTITY);
        assert_eq!(overlapping.len(), 1);
    }

    #[test]
    fn touching_boxes_do_not_collide() {
        let mut grid = GridIndex::new(200, 200, 25);
        let first = grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&first, false, TILE, 0);
        let touching = grid.place_box(&square(Vec2::new(70.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        assert_eq!(touching.len(), 1);
    }

    #[test]
    fn box_extents_follow_scale_and_matrix() {
        let grid = GridIndex::new(400, 400, 25);
        let matrix = Mat4::from_translation(glam::Vec3::new(100.0, 0.0, 0.0));
        let claims = grid.place_box(&square(Vec2::new(10.0, 10.0), 8.0), false, 2.0, 2.0, &matrix);
        assert_eq!(
            claims,
            vec![Claim::Box {
                x1: 108.0,
                y1: 8.0,
                x2: 112.0,
                y2: 12.0,
            }]
        );
    }

    #[test]
    fn ignored_claims_block_nothing() {
        let mut grid = GridIndex::new(200, 200, 25);
        let claims = grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&claims, true, TILE, 0);
        assert_eq!(grid.ignored_count(), 1);
        assert_eq!(grid.claim_count(), 0);
        assert_eq!(
            grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY)
                .len(),
            1
        );
    }

    #[test]
    fn off_grid_shapes_never_collide() {
        let mut grid = GridIndex::new(100, 100, 25);
        let claims = grid.place_box(&square(Vec2::new(-50.0, -50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&claims, false, TILE, 0);
        assert_eq!(
            grid.place_box(&square(Vec2::new(-50.0, -50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY)
                .len(),
            1
        );
    }

    #[test]
    fn circle_rect_intersection() {
        let rect = Claim::Box {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
        };
        let near = Claim::Circle {
            x: 13.0,
            y: 5.0,
            radius: 4.0,
        };
        let touching = Claim::Circle {
            x: 14.0,
            y: 5.0,
            radius: 4.0,
        };
        let corner = Claim::Circle {
            x: 13.0,
            y: 13.0,
            radius: 4.0,
        };
        assert!(rect.intersects(&near));
        assert!(near.intersects(&rect));
        assert!(!rect.intersects(&touching));
        assert!(!rect.intersects(&corner));
    }

    #[test]
    fn circles_outside_glyph_extent_are_unused() {
        let grid = GridIndex::new(200, 200, 25);
        let symbol = line_symbol();
        let line = [Vec2::new(0.0, 50.0), Vec2::new(150.0, 50.0)];
        let offsets = [-10.0, 10.0];
        let matrix = Mat4::IDENTITY;
        let mut circles = [circle(40.0, -10.0), circle(50.0, 0.0), circle(80.0, 30.0)];

        let claims = grid.place_circles(&mut circles, false, &query(&symbol, &line, &offsets, &matrix));
        assert_eq!(claims.len(), 2);
        assert!(circles[0].used && circles[1].used);
        assert!(!circles[2].used);
    }

    #[test]
    fn label_longer_than_line_is_rejected() {
        let grid = GridIndex::new(200, 200, 25);
        let symbol = line_symbol();
        let line = [Vec2::new(45.0, 50.0), Vec2::new(150.0, 50.0)];
        let offsets = [-10.0, 10.0];
        let matrix = Mat4::IDENTITY;
        let mut circles = [circle(50.0, 0.0), circle(90.0, 40.0)];

        let claims = grid.place_circles(&mut circles, false, &query(&symbol, &line, &offsets, &matrix));
        assert!(claims.is_empty());
        assert!(circles[1].used, "used flags are untouched outside debug mode");

        let debug = CircleQuery {
            debug: true,
            ..query(&symbol, &line, &offsets, &matrix)
        };
        assert!(grid.place_circles(&mut circles, false, &debug).is_empty());
        assert!(!circles[1].used);
    }

    #[test]
    fn circles_collide_with_committed_boxes() {
        let mut grid = GridIndex::new(200, 200, 25);
        let blocker = grid.place_box(&square(Vec2::new(50.0, 50.0), 3.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&blocker, false, TILE, 0);

        let symbol = line_symbol();
        let line = [Vec2::new(0.0, 50.0), Vec2::new(150.0, 50.0)];
        let offsets = [-5.0, 5.0];
        let matrix = Mat4::IDENTITY;
        let mut circles = [circle(50.0, 0.0)];
        let q = query(&symbol, &line, &offsets, &matrix);

        assert!(grid.place_circles(&mut circles, false, &q).is_empty());
        assert_eq!(grid.place_circles(&mut circles, true, &q).len(), 1);
    }

    #[test]
    fn pitched_circles_shrink_with_distance() {
        let grid = GridIndex::new(200, 200, 25);
        let symbol = line_symbol();
        let line = [Vec2::new(0.0, 50.0), Vec2::new(150.0, 50.0)];
        let offsets = [0.0, 0.0];
        let mut matrix = Mat4::IDENTITY;
        matrix.w_axis.w = 2.0;
        let mut circles = [circle(50.0, 0.0)];

        let viewport = query(&symbol, &line, &offsets, &matrix);
        let pitched = CircleQuery {
            pitch_with_map: true,
            ..viewport
        };
        let radius = |claims: Vec<Claim>| match claims.first() {
            Some(Claim::Circle { radius, .. }) => *radius,
            other => panic!("expected a circle claim, got {other:?}"),
        };
        assert_eq!(radius(grid.place_circles(&mut circles, false, &viewport)), 5.0);
        assert_eq!(radius(grid.place_circles(&mut circles, false, &pitched)), 2.5);
    }

    #[test]
    fn remove_tile_frees_its_space() {
        let mut grid = GridIndex::new(200, 200, 25);
        let other = TileId { z: 1, x: 0, y: 0 };
        let a = grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&a, false, TILE, 0);
        let b = grid.place_box(&square(Vec2::new(150.0, 150.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY);
        grid.insert_box(&b, false, other, 4);

        grid.remove_tile(TILE);
        assert_eq!(grid.claim_count(), 1);
        assert_eq!(grid.claims_for_tile(other).map(|(_, key)| key).collect::<Vec<_>>(), vec![4]);
        assert_eq!(
            grid.place_box(&square(Vec2::new(50.0, 50.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY)
                .len(),
            1
        );
        assert!(
            grid.place_box(&square(Vec2::new(150.0, 150.0), 10.0), false, 1.0, 1.0, &Mat4::IDENTITY)
                .is_empty()
        );
    }
}
