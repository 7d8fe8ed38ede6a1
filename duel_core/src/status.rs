//! Read-only view of a match for the presentation layer.

use serde::Serialize;

use crate::side::Side;
use crate::state::MatchState;

/// Snapshot of the fields the outside world may see.
///
/// Serializes to the `/status` payload shape:
///
/// ```json
/// {"playing":true,"primed":false,"left_hp":2,"right_hp":3,"winning_side":null,"game_over":false}
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusProjection {
    #[serde(rename = "playing")]
    pub is_playing:   bool,
    #[serde(rename = "primed")]
    pub is_primed:    bool,
    pub left_hp:      u8,
    pub right_hp:     u8,
    pub winning_side: Option<Side>,
    pub game_over:    bool,
}

impl StatusProjection {
    pub fn to_json(&self) -> String {
        // A struct of plain scalars cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&MatchState> for StatusProjection {
    fn from(s: &MatchState) -> Self {
        StatusProjection {
            is_playing:   s.is_playing(),
            is_primed:    s.is_primed(),
            left_hp:      s.left_hp(),
            right_hp:     s.right_hp(),
            winning_side: s.winning_side(),
            game_over:    s.winning_side().is_some(),
        }
    }
}
