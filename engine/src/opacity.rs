use serde::{Deserialize, Serialize};

/// Fade state of one modality (text or icon) of a symbol instance.
///
/// `opacity` walks toward `target_opacity` at a rate of one full fade per
/// [`FadeTiming::duration`] and is clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpacityState {
    pub opacity: f32,
    /// Either `0.0` or `1.0`.
    pub target_opacity: f32,
    /// Timestamp (ms) of the last update.
    pub time: f64,
}

impl OpacityState {
    /// A fully hidden state stamped at `time`.
    pub fn new(time: f64) -> Self {
        Self {
            opacity: 0.0,
            target_opacity: 0.0,
            time,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.opacity == 0.0 && self.target_opacity == 0.0
    }

    pub fn is_fully_visible(&self) -> bool {
        self.opacity == 1.0 && self.target_opacity == 1.0
    }

    pub fn targets_visible(&self) -> bool {
        self.target_opacity == 1.0
    }
}

/// Fade timing shared by every instance of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTiming {
    /// Fade length in milliseconds. Zero means instantaneous.
    pub duration: f64,
    /// Timestamp (ms) of the most recent target flip of any instance.
    pub latest_start: f64,
}

impl FadeTiming {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            latest_start: f64::NEG_INFINITY,
        }
    }

    /// True while a fade that started at `latest_start` is still running.
    pub fn is_fading(&self, now: f64) -> bool {
        self.duration > 0.0 && now - self.latest_start < self.duration
    }

    fn increment(&self, elapsed: f64) -> f64 {
        if self.duration > 0.0 {
            elapsed / self.duration
        } else {
            1.0
        }
    }
}

impl Default for FadeTiming {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Visibility edge produced by a single [`update_opacity`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Unchanged,
    /// Was hidden in both the current and target sense, now targets visible.
    Shown,
    /// Was at least partly visible, now hidden in both senses.
    Hidden,
}

impl VisibilityChange {
    pub fn is_change(self) -> bool {
        self != Self::Unchanged
    }
}

/// Advance one opacity state to `now` and retarget it.
///
/// Duplicates are forced hidden without touching the timing. Otherwise the
/// opacity moves in the direction of the *previous* target by the elapsed
/// fraction of the fade, then the new target is recorded; a target flip
/// restarts the bucket's fade clock.
pub fn update_opacity(
    is_duplicate: bool,
    state: &mut OpacityState,
    target_visible: bool,
    now: f64,
    timing: &mut FadeTiming,
) -> VisibilityChange {
    let initial_visible = state.opacity != 0.0;
    let initial_target_visible = state.target_opacity != 0.0;

    if is_duplicate {
        state.opacity = 0.0;
        state.target_opacity = 0.0;
    } else {
        let target_opacity = if target_visible { 1.0 } else { 0.0 };
        if state.target_opacity != target_opacity {
            timing.latest_start = now;
        }
        // A clock that runs backwards must not reverse a fade.
        let increment = timing.increment((now - state.time).max(0.0));
        let delta = if state.targets_visible() {
            increment
        } else {
            -increment
        };
        state.opacity = (f64::from(state.opacity) + delta).clamp(0.0, 1.0) as f32;
        state.target_opacity = target_opacity;
        state.time = now;
    }

    if !initial_visible && !initial_target_visible && state.target_opacity != 0.0 {
        VisibilityChange::Shown
    } else if (initial_visible || initial_target_visible) && state.is_hidden() {
        VisibilityChange::Hidden
    } else {
        VisibilityChange::Unchanged
    }
}

/// Pack an opacity state into the 32-bit vertex attribute read by the shader.
///
/// Each byte lane holds `opacity * 127` in its upper seven bits and the
/// target bit in its lowest bit; all four lanes carry the same value.
pub fn pack_opacity(state: &OpacityState) -> u32 {
    if state.is_hidden() {
        return 0;
    }
    if state.is_fully_visible() {
        return u32::MAX;
    }
    let target_bit = u32::from(state.targets_visible());
    let opacity_bits = (state.opacity * 127.0).floor() as u32;
    let lane = (opacity_bits << 1) | target_bit;
    lane * 0x0101_0101
}

/// Decode the most significant lane of a packed opacity word.
pub fn unpack_opacity(packed: u32) -> (f32, bool) {
    let lane = (packed >> 24) as u8;
    (f32::from(lane >> 1) / 127.0, lane & 1 == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(opacity: f32, target_opacity: f32, time: f64) -> OpacityState {
        OpacityState {
            opacity,
            target_opacity,
            time,
        }
    }

    fn lanes(packed: u32) -> [u8; 4] {
        packed.to_be_bytes()
    }

    #[test]
    fn pack_boundaries() {
        assert_eq!(pack_opacity(&state(0.0, 0.0, 0.0)), 0);
        assert_eq!(pack_opacity(&state(1.0, 1.0, 0.0)), 0xFFFF_FFFF);
    }

    #[test]
    fn pack_fading_out_from_full() {
        let packed = pack_opacity(&state(1.0, 0.0, 0.0));
        assert_eq!(lanes(packed), [254, 254, 254, 254]);
        assert_eq!(packed, 0xFEFE_FEFE);
    }

    #[test]
    fn pack_fading_in_from_zero() {
        assert_eq!(pack_opacity(&state(0.0, 1.0, 0.0)), 0x0101_0101);
    }

    #[test]
    fn packed_lanes_are_identical_and_decode_alike() {
        for step in 0..=100 {
            let opacity = step as f32 / 100.0;
            for target in [0.0, 1.0] {
                let s = state(opacity, target, 0.0);
                if s.is_hidden() || s.is_fully_visible() {
                    continue;
                }
                let packed = pack_opacity(&s);
                let [a, b, c, d] = lanes(packed);
                assert!(a == b && b == c && c == d, "lanes differ for {s:?}");

                let (decoded, target_visible) = unpack_opacity(packed);
                assert_eq!(target_visible, target == 1.0);
                assert_eq!(decoded, (opacity * 127.0).floor() / 127.0);
            }
        }
    }

    #[test]
    fn zero_duration_is_instantaneous() {
        let mut timing = FadeTiming::new(0.0);
        let mut s = state(0.0, 1.0, 0.0);
        update_opacity(false, &mut s, true, 1.0, &mut timing);
        assert_eq!(s.opacity, 1.0);

        let mut s = state(1.0, 0.0, 0.0);
        update_opacity(false, &mut s, false, 1.0, &mut timing);
        assert_eq!(s.opacity, 0.0);
    }

    #[test]
    fn opacity_moves_toward_previous_target_by_elapsed_fraction() {
        let mut timing = FadeTiming::new(300.0);
        let mut s = state(0.0, 1.0, 0.0);
        update_opacity(false, &mut s, true, 150.0, &mut timing);
        assert_eq!(s.opacity, 0.5);
        update_opacity(false, &mut s, true, 300.0, &mut timing);
        assert_eq!(s.opacity, 1.0);
        assert_eq!(s.time, 300.0);
    }

    #[test]
    fn opacity_stays_in_unit_range() {
        let mut timing = FadeTiming::new(100.0);
        let mut s = state(0.9, 1.0, 0.0);
        update_opacity(false, &mut s, true, 10_000.0, &mut timing);
        assert_eq!(s.opacity, 1.0);

        let mut s = state(0.1, 0.0, 0.0);
        update_opacity(false, &mut s, false, 10_000.0, &mut timing);
        assert_eq!(s.opacity, 0.0);

        let mut s = state(0.5, 1.0, 50.0);
        update_opacity(false, &mut s, true, 0.0, &mut timing);
        assert_eq!(s.opacity, 0.5);
    }

    #[test]
    fn duplicates_are_forced_hidden() {
        let mut timing = FadeTiming::new(300.0);
        let mut s = state(0.7, 1.0, 10.0);
        let change = update_opacity(true, &mut s, true, 20.0, &mut timing);
        assert!(s.is_hidden());
        assert_eq!(change, VisibilityChange::Hidden);
        assert_eq!(timing.latest_start, f64::NEG_INFINITY);
    }

    #[test]
    fn target_flip_restarts_fade_clock() {
        let mut timing = FadeTiming::new(300.0);
        let mut s = state(0.0, 0.0, 0.0);
        update_opacity(false, &mut s, false, 50.0, &mut timing);
        assert_eq!(timing.latest_start, f64::NEG_INFINITY);
        assert!(!timing.is_fading(50.0));

        update_opacity(false, &mut s, true, 100.0, &mut timing);
        assert_eq!(timing.latest_start, 100.0);
        assert!(timing.is_fading(399.0));
        assert!(!timing.is_fading(400.0));
    }

    #[test]
    fn visibility_edges() {
        let mut timing = FadeTiming::new(300.0);

        let mut s = state(0.0, 0.0, 0.0);
        assert_eq!(
            update_opacity(false, &mut s, true, 0.0, &mut timing),
            VisibilityChange::Shown
        );
        assert_eq!(
            update_opacity(false, &mut s, true, 150.0, &mut timing),
            VisibilityChange::Unchanged
        );
        assert_eq!(
            update_opacity(false, &mut s, false, 200.0, &mut timing),
            VisibilityChange::Unchanged
        );
        assert_eq!(
            update_opacity(false, &mut s, false, 1_000.0, &mut timing),
            VisibilityChange::Hidden
        );
        assert_eq!(
            update_opacity(false, &mut s, false, 2_000.0, &mut timing),
            VisibilityChange::Unchanged
        );
    }
}
