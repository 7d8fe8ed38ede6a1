//! Priming: the "both hands up, opposite sides" gesture that starts a round.
//!
//! The machine only reads and writes the priming and round flags on
//! [`MatchState`].  Anything heavier (restoring HP, dropping projectiles) is
//! requested through the returned [`PrimingOutcome`] and carried out by the
//! engine.

use std::time::{Duration, Instant};

use crate::config::DuelConfig;
use crate::pose::SidedHands;
use crate::state::MatchState;

/// What the engine must do after a priming update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimingOutcome {
    /// Nothing beyond the flag updates already applied.
    Unchanged,
    /// Hands were lost mid-round; the round has been stopped with no winner.
    Aborted,
    /// Held long enough on a fresh or aborted match: begin a round.
    StartRound,
    /// Held long enough while a winner was showing: reset the match, then
    /// begin a round.
    Rematch,
}

/// Hold-time thresholds for starting and restarting rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimingStateMachine {
    pub start_hold:   Duration,
    pub rematch_hold: Duration,
}

impl PrimingStateMachine {
    pub fn new(config: &DuelConfig) -> Self {
        PrimingStateMachine {
            start_hold:   config.start_hold,
            rematch_hold: config.rematch_hold,
        }
    }

    /// Feed one frame's hands.
    pub fn advance(&self, state: &mut MatchState, hands: &SidedHands, now: Instant) -> PrimingOutcome {
        let Some((left, right)) = hands.both() else {
            state.is_primed    = false;
            state.primed_since = None;
            if state.is_playing {
                state.is_playing = false;
                return PrimingOutcome::Aborted;
            }
            return PrimingOutcome::Unchanged;
        };

        let primed = left.is_raised() && right.is_raised();
        match (state.is_primed, primed) {
            (false, true) => state.primed_since = Some(now),
            (true, false) => state.primed_since = None,
            _ => {}
        }
        state.is_primed = primed;

        if !primed || state.is_playing {
            return PrimingOutcome::Unchanged;
        }

        // A round that ended under a held gesture cleared the clock; restart it.
        let since = *state.primed_since.get_or_insert(now);
        let held  = now.saturating_duration_since(since);

        if state.winning_side.is_some() {
            if held >= self.rematch_hold { PrimingOutcome::Rematch } else { PrimingOutcome::Unchanged }
        } else if held >= self.start_hold {
            PrimingOutcome::StartRound
        } else {
            PrimingOutcome::Unchanged
        }
    }

    /// Fraction (0.0–1.0) of the currently required hold that has elapsed.
    /// 0.0 when not primed or already playing.
    pub fn progress(&self, state: &MatchState, now: Instant) -> f32 {
        let Some(since) = state.primed_since.filter(|_| state.is_primed && !state.is_playing) else {
            return 0.0;
        };
        let needed = if state.winning_side.is_some() { self.rematch_hold } else { self.start_hold };
        if needed.is_zero() {
            return 1.0;
        }
        let held = now.saturating_duration_since(since);
        (held.as_secs_f32() / needed.as_secs_f32()).min(1.0)
    }
}
