//! # duel_core
//!
//! Game core for a two-player, gesture-controlled duel.  Two players share one
//! camera frame, one on each half.  They *prime* by holding both index fingers
//! raised, then *fire* by flicking the finger down.  Each firing edge launches
//! a projectile toward the other half of the frame; a projectile that lands
//! inside a hand's hitbox costs that side one hit point.
//!
//! ## Per-frame pipeline
//!
//! ```text
//!   hands ──► Side::classify ──► PrimingStateMachine ──► duel step ──► StatusProjection
//! ```
//!
//! [`DuelEngine::step`] runs the whole pipeline for one observation.  The
//! engine never blocks and never fails; a frame with no hands is simply a frame
//! in which priming is broken.
//!
//! ## Timing
//!
//! | Situation | Hold required before the round starts |
//! |---|---|
//! | Fresh match, or after an aborted round | [`DEFAULT_START_HOLD`] (3.0 s) |
//! | A winner is on screen | [`DEFAULT_REMATCH_HOLD`] (0.75 s), then the match resets |

pub mod side;
pub mod pose;
pub mod projectile;
pub mod config;
pub mod state;
pub mod priming;
pub mod engine;
pub mod status;

pub use side::Side;
pub use pose::{HandPose, Point, SidedHands};
pub use projectile::Projectile;
pub use config::{DuelConfig, DEFAULT_REMATCH_HOLD, DEFAULT_START_HOLD};
pub use state::MatchState;
pub use priming::{PrimingOutcome, PrimingStateMachine};
pub use engine::{DuelEngine, FrameReport, Hit};
pub use status::StatusProjection;
