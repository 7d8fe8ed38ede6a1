//! Tunables for one duel.

use std::time::Duration;

/// Continuous priming needed to begin a fresh round.
pub const DEFAULT_START_HOLD:   Duration = Duration::from_millis(3000);
/// Continuous priming needed to start a rematch once a winner is showing.
pub const DEFAULT_REMATCH_HOLD: Duration = Duration::from_millis(750);

/// Configuration for a [`DuelEngine`](crate::DuelEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct DuelConfig {
    /// Frame size in pixels; bounds for projectiles and the side split.
    pub frame_width:      f32,
    pub frame_height:     f32,
    /// Horizontal projectile speed, pixels per frame.
    pub projectile_speed: f32,
    /// Hit points each side starts a match with.
    pub starting_hp:      u8,
    pub start_hold:       Duration,
    pub rematch_hold:     Duration,
}

impl Default for DuelConfig {
    fn default() -> Self {
        DuelConfig {
            frame_width:      640.0,
            frame_height:     480.0,
            projectile_speed: 20.0,
            starting_hp:      3,
            start_hold:       DEFAULT_START_HOLD,
            rematch_hold:     DEFAULT_REMATCH_HOLD,
        }
    }
}
