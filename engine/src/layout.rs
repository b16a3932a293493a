use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchAlignment {
    Map,
    #[default]
    Viewport,
}

/// Per-layer layout flags consulted during placement.
///
/// Field names serialize as their style property names (`text-allow-overlap`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SymbolLayout {
    pub text_optional: bool,
    pub icon_optional: bool,
    pub text_allow_overlap: bool,
    pub icon_allow_overlap: bool,
    pub text_ignore_placement: bool,
    pub icon_ignore_placement: bool,
    pub text_pitch_alignment: PitchAlignment,
}

impl SymbolLayout {
    pub fn pitch_with_map(&self) -> bool {
        self.text_pitch_alignment == PitchAlignment::Map
    }
}
