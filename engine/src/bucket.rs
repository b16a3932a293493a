use std::ops::Range;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision_box::{CollisionArrays, CollisionBoxArray};
use crate::error::EngineError;
use crate::layout::SymbolLayout;
use crate::opacity::OpacityState;
use crate::symbol_size::SizeData;
use crate::vertex::{CollisionDebugVertex, VertexArray, VertexStream};

/// A glyph run laid out along a line, referenced by text symbol instances.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacedSymbol {
    /// Label anchor in tile units.
    pub anchor: Vec2,
    /// Segment of the line (relative to `line_start_index`) holding the anchor.
    pub segment: usize,
    pub line_start_index: usize,
    pub line_length: usize,
    pub glyph_start_index: usize,
    pub num_glyphs: usize,
    /// Font sizes times ten.
    pub lower_size: u16,
    pub upper_size: u16,
    /// Set while the text is fully faded out so its position is not recomputed.
    pub hidden: bool,
}

impl PlacedSymbol {
    pub fn line_range(&self) -> Range<usize> {
        self.line_start_index..self.line_start_index + self.line_length
    }

    pub fn glyph_range(&self) -> Range<usize> {
        self.glyph_start_index..self.glyph_start_index + self.num_glyphs
    }
}

/// One candidate label and/or icon of a tile bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SymbolInstance {
    pub key: String,
    pub text_box_start_index: usize,
    pub text_box_end_index: usize,
    pub icon_box_start_index: usize,
    pub icon_box_end_index: usize,
    /// A higher resolution copy lives in a child tile; never placed.
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub placed_text: bool,
    #[serde(default)]
    pub placed_icon: bool,
    #[serde(default)]
    pub text_opacity_state: OpacityState,
    #[serde(default)]
    pub icon_opacity_state: OpacityState,
    #[serde(default)]
    pub num_glyph_vertices: usize,
    #[serde(default)]
    pub num_vertical_glyph_vertices: usize,
    #[serde(default)]
    pub num_icon_vertices: usize,
    #[serde(default)]
    pub placed_text_symbol_indices: Vec<usize>,
    /// Filled from the box array on first placement.
    #[serde(skip)]
    pub collision_arrays: Option<CollisionArrays>,
}

impl SymbolInstance {
    pub fn new(key: impl Into<String>, text_boxes: Range<usize>, icon_boxes: Range<usize>) -> Self {
        Self {
            key: key.into(),
            text_box_start_index: text_boxes.start,
            text_box_end_index: text_boxes.end,
            icon_box_start_index: icon_boxes.start,
            icon_box_end_index: icon_boxes.end,
            ..Self::default()
        }
    }

    pub fn has_text(&self) -> bool {
        self.text_box_start_index != self.text_box_end_index
    }

    pub fn has_icon(&self) -> bool {
        self.icon_box_start_index != self.icon_box_end_index
    }

    pub fn text_box_range(&self) -> Range<usize> {
        self.text_box_start_index..self.text_box_end_index
    }

    pub fn icon_box_range(&self) -> Range<usize> {
        self.icon_box_start_index..self.icon_box_end_index
    }

    /// Packed text opacity entries written per frame (horizontal and vertical glyphs).
    pub fn text_opacity_entries(&self) -> usize {
        (self.num_glyph_vertices + self.num_vertical_glyph_vertices) / 4
    }

    pub fn icon_opacity_entries(&self) -> usize {
        self.num_icon_vertices / 4
    }
}

/// All symbols of one style layer within one tile.
#[derive(Debug)]
pub struct SymbolBucket {
    /// Zoom the bucket's geometry was built for.
    pub zoom: f32,
    pub layout: SymbolLayout,
    pub text_size: SizeData,
    pub symbol_instances: Vec<SymbolInstance>,
    pub placed_glyphs: Vec<PlacedSymbol>,
    pub line_vertices: Vec<Vec2>,
    pub glyph_offsets: Vec<f32>,
    pub text_opacity: Option<VertexStream<u32>>,
    pub icon_opacity: Option<VertexStream<u32>>,
    pub collision_box_debug: Option<VertexStream<CollisionDebugVertex>>,
    pub collision_circle_debug: Option<VertexStream<CollisionDebugVertex>>,
    /// Timestamp (ms) of the last fade update.
    pub fade_start_time: f64,
}

impl SymbolBucket {
    /// Build a bucket; opacity streams exist only for modalities some instance has.
    pub fn new(
        zoom: f32,
        layout: SymbolLayout,
        text_size: SizeData,
        symbol_instances: Vec<SymbolInstance>,
    ) -> Self {
        let text_opacity = symbol_instances
            .iter()
            .any(SymbolInstance::has_text)
            .then(VertexStream::new);
        let icon_opacity = symbol_instances
            .iter()
            .any(SymbolInstance::has_icon)
            .then(VertexStream::new);

        Self {
            zoom,
            layout,
            text_size,
            symbol_instances,
            placed_glyphs: Vec::new(),
            line_vertices: Vec::new(),
            glyph_offsets: Vec::new(),
            text_opacity,
            icon_opacity,
            collision_box_debug: None,
            collision_circle_debug: None,
            fade_start_time: 0.0,
        }
    }

    pub fn with_line_geometry(
        mut self,
        placed_glyphs: Vec<PlacedSymbol>,
        line_vertices: Vec<Vec2>,
        glyph_offsets: Vec<f32>,
    ) -> Self {
        self.placed_glyphs = placed_glyphs;
        self.line_vertices = line_vertices;
        self.glyph_offsets = glyph_offsets;
        self
    }

    /// Build the collision debug geometry: one quad per box, one per circle.
    pub fn with_collision_debug(mut self, boxes: &CollisionBoxArray) -> Self {
        let mut box_vertices = VertexArray::new();
        let mut circle_vertices = VertexArray::new();
        for instance in &self.symbol_instances {
            let arrays = CollisionArrays::deserialize(
                boxes,
                instance.text_box_range(),
                instance.icon_box_range(),
            );
            let quads = usize::from(arrays.text_box.is_some()) + usize::from(arrays.icon_box.is_some());
            box_vertices.extend_repeat(CollisionDebugVertex::default(), quads * 4);
            circle_vertices.extend_repeat(
                CollisionDebugVertex::default(),
                arrays.text_circles.len() * 4,
            );
        }
        self.collision_box_debug = Some(VertexStream::from_array(box_vertices));
        self.collision_circle_debug = Some(VertexStream::from_array(circle_vertices));
        self
    }

    /// Check every index an instance or placed symbol points at.
    pub fn validate(&self, boxes: &CollisionBoxArray) -> Result<(), EngineError> {
        for (instance_index, instance) in self.symbol_instances.iter().enumerate() {
            for (modality, range) in [
                ("text", instance.text_box_range()),
                ("icon", instance.icon_box_range()),
            ] {
                if range.start > range.end {
                    return Err(EngineError::InvertedBoxRange {
                        instance: instance_index,
                        modality,
                        start: range.start,
                        end: range.end,
                    });
                }
                if range.end > boxes.len() {
                    return Err(EngineError::BoxRangeOutOfBounds {
                        instance: instance_index,
                        modality,
                        start: range.start,
                        end: range.end,
                        len: boxes.len(),
                    });
                }
            }
            if let Some(&index) = instance
                .placed_text_symbol_indices
                .iter()
                .find(|&&index| index >= self.placed_glyphs.len())
            {
                return Err(EngineError::PlacedSymbolOutOfBounds {
                    instance: instance_index,
                    index,
                    len: self.placed_glyphs.len(),
                });
            }
        }

        for (index, symbol) in self.placed_glyphs.iter().enumerate() {
            let glyphs = symbol.glyph_range();
            if glyphs.end > self.glyph_offsets.len() {
                return Err(EngineError::GlyphOffsetsOutOfBounds {
                    index,
                    start: glyphs.start,
                    end: glyphs.end,
                    len: self.glyph_offsets.len(),
                });
            }
            let line = symbol.line_range();
            if line.end > self.line_vertices.len() {
                return Err(EngineError::LineVerticesOutOfBounds {
                    index,
                    start: line.start,
                    end: line.end,
                    len: self.line_vertices.len(),
                });
            }
        }
        Ok(())
    }
}
