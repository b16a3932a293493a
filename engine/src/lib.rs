//! Symbol placement and opacity fading for vector tile labels.
//!
//! A placement pass greedily claims collision space for every symbol of
//! every tile in priority order; each frame afterwards walks every symbol's
//! opacity toward its placement decision and repacks the per-vertex opacity
//! attribute consumed by the symbol shaders.

pub mod bucket;
pub mod collision_box;
pub mod debug;
pub mod error;
pub mod fade;
pub mod grid;
pub mod layout;
pub mod opacity;
pub mod pass;
pub mod place;
pub mod symbol_size;
pub mod vertex;

pub use bucket::{PlacedSymbol, SymbolBucket, SymbolInstance};
pub use collision_box::{CollisionArrays, CollisionBox, CollisionBoxArray, CollisionBoxEntry, CollisionCircle};
pub use error::EngineError;
pub use fade::update_opacities;
pub use grid::{CircleQuery, Claim, CollisionIndex, GridIndex};
pub use layout::{PitchAlignment, SymbolLayout};
pub use opacity::{FadeTiming, OpacityState, VisibilityChange, pack_opacity, unpack_opacity, update_opacity};
pub use pass::{PassSummary, PlacementPass, PlacementTile, TileBucket, TileId, remove_tile, update_fades};
pub use place::{PlaceParams, PlacementStats, couple_placement, place};
pub use symbol_size::{SizeData, evaluate_size_for_feature, evaluate_size_for_zoom};
pub use vertex::{CollisionDebugVertex, VertexArray, VertexBuffer, VertexStream};
