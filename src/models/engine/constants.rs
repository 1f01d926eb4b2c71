//! Gameplay constants shared by the generator and the judgment engine.

/// Number of input lanes.
pub const NUM_LANES: usize = 5;

/// Points awarded per hit before the multiplier.
pub const BASE_POINTS: u32 = 50;

/// Multiplier ceiling.
pub const MAX_MULTIPLIER: u32 = 4;

/// Combo counts that raise the multiplier, paired with the new value.
pub const MULTIPLIER_MILESTONES: [(u32, u32); 3] = [(10, 2), (20, 3), (30, 4)];

/// Combo counts that only trigger a celebration.
pub const CELEBRATION_MILESTONES: [u32; 2] = [50, 100];

/// Shield charges granted by a shield bonus (overwrites, never stacks).
pub const SHIELD_CHARGES: u32 = 2;

/// Tolerance of the lightning lane auto-hit.
pub const LIGHTNING_WINDOW_MS: i64 = 50;

pub const LIGHTNING_DURATION_MS: i64 = 5_000;
pub const DOUBLE_POINTS_DURATION_MS: i64 = 5_000;
pub const NOTE_MAGNET_DURATION_MS: i64 = 3_000;

/// Beats are divided by this to get the hit window.
pub const HIT_WINDOW_BEAT_DIVISOR: f64 = 3.5;
/// Perfect window as a fraction of the hit window.
pub const PERFECT_WINDOW_RATIO: f64 = 0.4;
/// Note magnet scaling of the hit window.
pub const MAGNET_HIT_SCALE: f64 = 1.5;
/// Note magnet perfect window, as a fraction of the base hit window.
pub const MAGNET_PERFECT_RATIO: f64 = 0.8;
