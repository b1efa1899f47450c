/// Weapons must score strictly above this (after rounding) to count.
pub const DEFAULT_WEAPON_CONFIDENCE: f32 = 0.4;

/// Pixels added on every side of a person box before the overlap test.
pub const DEFAULT_EXTENSION: i32 = 50;

/// Tunable knobs for deciding what counts as a threat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatPolicy {
    pub weapon_confidence: f32,
    pub extension: i32,
    /// Highlight each person once per frame instead of once per nearby weapon.
    pub dedupe: bool,
}

impl Default for ThreatPolicy {
    fn default() -> Self {
        Self {
            weapon_confidence: DEFAULT_WEAPON_CONFIDENCE,
            extension: DEFAULT_EXTENSION,
            dedupe: false,
        }
    }
}
