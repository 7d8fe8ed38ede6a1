//! Left/right halves of the shared frame.

use enum_map::Enum;
use serde::Serialize;

/// Which half of the frame a hand (and therefore a player) occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Classify an x-coordinate against the vertical centre line of a frame
    /// `frame_width` pixels wide.  The centre line itself belongs to `Right`.
    pub fn classify(x: f32, frame_width: f32) -> Side {
        if x < frame_width / 2.0 { Side::Left } else { Side::Right }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left  => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Horizontal direction of travel for projectiles fired from this side.
    pub fn toward_opponent(self) -> f32 {
        match self {
            Side::Left  =>  1.0,
            Side::Right => -1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left  => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
