use std::ops::Range;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One entry of a tile's shared collision box array.
///
/// Anchors and extents are in tile units at the bucket's zoom. A zero
/// `radius` marks a box; a positive radius marks one circle of a line label.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CollisionBoxEntry {
    pub anchor: Vec2,
    #[serde(default)]
    pub x1: f32,
    #[serde(default)]
    pub y1: f32,
    #[serde(default)]
    pub x2: f32,
    #[serde(default)]
    pub y2: f32,
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub signed_distance_from_anchor: f32,
}

impl CollisionBoxEntry {
    pub fn new_box(anchor: Vec2, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            anchor,
            x1,
            y1,
            x2,
            y2,
            ..Self::default()
        }
    }

    pub fn new_circle(anchor: Vec2, radius: f32, signed_distance_from_anchor: f32) -> Self {
        Self {
            anchor,
            x1: -radius,
            y1: -radius,
            x2: radius,
            y2: radius,
            radius,
            signed_distance_from_anchor,
        }
    }

    pub fn is_box(&self) -> bool {
        self.radius == 0.0
    }
}

/// Collision geometry for every symbol instance of one tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionBoxArray {
    entries: Vec<CollisionBoxEntry>,
}

impl CollisionBoxArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: CollisionBoxEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CollisionBoxEntry> {
        self.entries.get(index)
    }

    fn range(&self, range: Range<usize>) -> &[CollisionBoxEntry] {
        debug_assert!(
            range.start <= range.end && range.end <= self.entries.len(),
            "collision box range {range:?} out of bounds for {} entries",
            self.entries.len()
        );
        self.entries.get(range).unwrap_or(&[])
    }
}

impl From<Vec<CollisionBoxEntry>> for CollisionBoxArray {
    fn from(entries: Vec<CollisionBoxEntry>) -> Self {
        Self { entries }
    }
}

/// Axis-aligned candidate box around an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBox {
    pub anchor: Vec2,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One circle of a curved label, in tile units at the bucket's zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCircle {
    pub anchor: Vec2,
    pub radius: f32,
    pub signed_distance_from_anchor: f32,
    /// Cleared by circle placement when the circle lies outside the label.
    pub used: bool,
}

/// Collision shapes of a single symbol instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionArrays {
    pub text_box: Option<CollisionBox>,
    pub icon_box: Option<CollisionBox>,
    pub text_circles: Vec<CollisionCircle>,
}

impl CollisionArrays {
    /// Split an instance's ranges of the shared array into boxes and circles.
    ///
    /// Only the first box of each modality counts; circles seen before the
    /// text box belong to the text.
    pub fn deserialize(
        array: &CollisionBoxArray,
        text_range: Range<usize>,
        icon_range: Range<usize>,
    ) -> Self {
        let mut arrays = Self::default();

        for entry in array.range(text_range) {
            if entry.is_box() {
                arrays.text_box = Some(CollisionBox::from(entry));
                break;
            }
            arrays.text_circles.push(CollisionCircle {
                anchor: entry.anchor,
                radius: entry.radius,
                signed_distance_from_anchor: entry.signed_distance_from_anchor,
                used: true,
            });
        }

        arrays.icon_box = array
            .range(icon_range)
            .iter()
            .find(|entry| entry.is_box())
            .map(CollisionBox::from);

        arrays
    }

    pub fn has_text_circles(&self) -> bool {
        !self.text_circles.is_empty()
    }
}

impl From<&CollisionBoxEntry> for CollisionBox {
    fn from(entry: &CollisionBoxEntry) -> Self {
        Self {
            anchor: entry.anchor,
            x1: entry.x1,
            y1: entry.y1,
            x2: entry.x2,
            y2: entry.y2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_array() -> CollisionBoxArray {
        let mut array = CollisionBoxArray::new();
        array.push(CollisionBoxEntry::new_circle(Vec2::new(0.0, 0.0), 4.0, -8.0));
        array.push(CollisionBoxEntry::new_circle(Vec2::new(8.0, 0.0), 4.0, 0.0));
        array.push(CollisionBoxEntry::new_box(Vec2::new(4.0, 0.0), -10.0, -5.0, 10.0, 5.0));
        array.push(CollisionBoxEntry::new_box(Vec2::new(99.0, 0.0), -1.0, -1.0, 1.0, 1.0));
        array.push(CollisionBoxEntry::new_box(Vec2::new(20.0, 20.0), -3.0, -3.0, 3.0, 3.0));
        array
    }

    #[test]
    fn circles_before_first_text_box_are_kept() {
        let arrays = CollisionArrays::deserialize(&sample_array(), 0..4, 4..5);
        assert_eq!(arrays.text_circles.len(), 2);
        assert!(arrays.text_circles.iter().all(|c| c.used));
        assert_eq!(arrays.text_circles[0].signed_distance_from_anchor, -8.0);

        let text_box = arrays.text_box.expect("text box");
        assert_eq!(text_box.anchor, Vec2::new(4.0, 0.0));
        assert_eq!(text_box.x2, 10.0);

        let icon_box = arrays.icon_box.expect("icon box");
        assert_eq!(icon_box.anchor, Vec2::new(20.0, 20.0));
    }

    #[test]
    fn empty_ranges_have_no_shapes() {
        let arrays = CollisionArrays::deserialize(&sample_array(), 3..3, 5..5);
        assert_eq!(arrays, CollisionArrays::default());
        assert!(!arrays.has_text_circles());
    }

    #[test]
    fn icon_range_ignores_circles() {
        let arrays = CollisionArrays::deserialize(&sample_array(), 0..0, 0..2);
        assert!(arrays.icon_box.is_none());
    }

    #[test]
    fn box_array_parses_from_json_list() {
        let array: CollisionBoxArray = serde_json::from_str(
            r#"[
                {"anchor": [1.0, 2.0], "x1": -1.0, "y1": -1.0, "x2": 1.0, "y2": 1.0},
                {"anchor": [3.0, 4.0], "radius": 2.0, "signed_distance_from_anchor": 5.0}
            ]"#,
        )
        .expect("array should parse");
        assert_eq!(array.len(), 2);
        assert!(array.get(0).is_some_and(CollisionBoxEntry::is_box));
        assert!(array.get(1).is_some_and(|e| !e.is_box()));
    }
}
