use thiserror::Error;

/// A bucket whose indices do not fit the geometry they point into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("instance {instance}: {modality} box range {start}..{end} exceeds {len} collision boxes")]
    BoxRangeOutOfBounds {
        instance: usize,
        modality: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("instance {instance}: {modality} box range {start}..{end} is inverted")]
    InvertedBoxRange {
        instance: usize,
        modality: &'static str,
        start: usize,
        end: usize,
    },

    #[error("instance {instance}: placed symbol {index} does not exist ({len} placed symbols)")]
    PlacedSymbolOutOfBounds {
        instance: usize,
        index: usize,
        len: usize,
    },

    #[error("placed symbol {index}: glyphs {start}..{end} exceed {len} glyph offsets")]
    GlyphOffsetsOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("placed symbol {index}: line {start}..{end} exceeds {len} line vertices")]
    LineVerticesOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}
