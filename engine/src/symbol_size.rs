use serde::{Deserialize, Serialize};

use crate::bucket::PlacedSymbol;

/// Default `text-size` in pixels.
pub const DEFAULT_TEXT_SIZE: f32 = 16.0;

/// Per-feature sizes are stored on placed symbols multiplied by this factor.
pub const SIZE_PACK_FACTOR: f32 = 10.0;

fn default_base() -> f32 {
    1.0
}

/// How a bucket's text size varies with zoom and feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum SizeData {
    Constant {
        size: f32,
    },
    /// Per feature, fixed across zoom.
    Source,
    /// Zoom-dependent, same for every feature.
    Camera {
        zoom_range: [f32; 2],
        size_range: [f32; 2],
        #[serde(default = "default_base")]
        base: f32,
    },
    /// Per feature and zoom-dependent: features carry lower/upper sizes.
    Composite {
        zoom_range: [f32; 2],
        #[serde(default = "default_base")]
        base: f32,
    },
}

impl Default for SizeData {
    fn default() -> Self {
        Self::Constant {
            size: DEFAULT_TEXT_SIZE,
        }
    }
}

/// The zoom-dependent part of a size, shared by all features of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartiallyEvaluatedSize {
    pub size: f32,
    /// Interpolation position between a feature's lower and upper size.
    pub t: f32,
}

/// Exponential interpolation factor of `input` between `lower` and `upper`.
pub fn interpolation_factor(input: f32, base: f32, lower: f32, upper: f32) -> f32 {
    let difference = upper - lower;
    let progress = input - lower;
    if difference == 0.0 {
        0.0
    } else if base == 1.0 {
        progress / difference
    } else {
        (base.powf(progress) - 1.0) / (base.powf(difference) - 1.0)
    }
}

pub fn evaluate_size_for_zoom(size_data: &SizeData, zoom: f32) -> PartiallyEvaluatedSize {
    match *size_data {
        SizeData::Constant { size } => PartiallyEvaluatedSize { size, t: 0.0 },
        SizeData::Source => PartiallyEvaluatedSize::default(),
        SizeData::Camera {
            zoom_range: [min_zoom, max_zoom],
            size_range: [min_size, max_size],
            base,
        } => {
            let t = interpolation_factor(zoom, base, min_zoom, max_zoom).clamp(0.0, 1.0);
            PartiallyEvaluatedSize {
                size: lerp(min_size, max_size, t),
                t: 0.0,
            }
        }
        SizeData::Composite {
            zoom_range: [min_zoom, max_zoom],
            base,
        } => PartiallyEvaluatedSize {
            size: 0.0,
            t: interpolation_factor(zoom, base, min_zoom, max_zoom).clamp(0.0, 1.0),
        },
    }
}

pub fn evaluate_size_for_feature(
    size_data: &SizeData,
    partial: PartiallyEvaluatedSize,
    symbol: &PlacedSymbol,
) -> f32 {
    match size_data {
        SizeData::Source => f32::from(symbol.lower_size) / SIZE_PACK_FACTOR,
        SizeData::Composite { .. } => lerp(
            f32::from(symbol.lower_size) / SIZE_PACK_FACTOR,
            f32::from(symbol.upper_size) / SIZE_PACK_FACTOR,
            partial.t,
        ),
        SizeData::Constant { .. } | SizeData::Camera { .. } => partial.size,
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
