//! Match-level state shared by the priming machine and the duel step.

use std::time::Instant;

use enum_map::EnumMap;

use crate::side::Side;

/// Hit points, winner and round/priming flags for one match.
///
/// Invariants, upheld by every mutator here:
///
/// * `winning_side.is_some()` exactly when one side's HP is 0;
/// * `is_playing` implies `winning_side.is_none()`.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchState {
    pub(crate) hp:           EnumMap<Side, u8>,
    pub(crate) full_hp:      u8,
    pub(crate) winning_side: Option<Side>,
    pub(crate) is_playing:   bool,
    pub(crate) is_primed:    bool,
    pub(crate) primed_since: Option<Instant>,
}

impl MatchState {
    pub fn new(full_hp: u8) -> Self {
        MatchState {
            hp:           EnumMap::from_fn(|_| full_hp),
            full_hp,
            winning_side: None,
            is_playing:   false,
            is_primed:    false,
            primed_since: None,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn hp(&self, side: Side) -> u8        { self.hp[side] }
    pub fn left_hp(&self) -> u8               { self.hp[Side::Left] }
    pub fn right_hp(&self) -> u8              { self.hp[Side::Right] }
    pub fn full_hp(&self) -> u8               { self.full_hp }
    pub fn winning_side(&self) -> Option<Side> { self.winning_side }
    pub fn is_playing(&self) -> bool          { self.is_playing }
    pub fn is_primed(&self) -> bool           { self.is_primed }
    pub fn primed_since(&self) -> Option<Instant> { self.primed_since }

    // ── transitions ───────────────────────────────────────────────────────

    /// Back to the initial state: full HP, no winner, not playing, not primed.
    pub(crate) fn reset(&mut self) {
        *self = MatchState::new(self.full_hp);
    }

    /// Full HP and no winner; priming flags are kept so a held rematch
    /// gesture carries straight into the new round.
    pub(crate) fn restore(&mut self) {
        self.hp = EnumMap::from_fn(|_| self.full_hp);
        self.winning_side = None;
    }

    /// Take one hit on `side`.  Returns the HP left.  At 0 the other side is
    /// declared the winner and the round stops.
    pub(crate) fn damage(&mut self, side: Side) -> u8 {
        let hp = &mut self.hp[side];
        *hp = hp.saturating_sub(1);
        let left = *hp;
        if left == 0 {
            self.winning_side = Some(side.opposite());
            self.is_playing   = false;
            self.primed_since = None;
        }
        left
    }

    /// Check both invariants.
    pub fn is_consistent(&self) -> bool {
        let someone_out = self.hp.values().any(|&hp| hp == 0);
        let bounded     = self.hp.values().all(|&hp| hp <= self.full_hp);
        bounded
            && self.winning_side.is_some() == someone_out
            && !(self.is_playing && self.winning_side.is_some())
    }
}
