//! # duel_arena
//!
//! Runs a [`duel_core`] match on a dedicated worker thread, fed by a hand pose
//! source, with MIDI sound cues and a software-rendered preview window.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hands | Action |
//! |---|---|---|
//! | Both index fingers up, one hand per half | Both | Prime; held 3 s starts a round |
//! | Same, while a winner is showing | Both | Held 0.75 s resets and starts a rematch |
//! | Index finger flicked down | Either | Fire one projectile at the other half |
//! | A hand leaves the frame | Either | Abort the round (no winner) |
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard shortcuts drive two simulated hands.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | `1` / `0` | Show / hide left / right hand |
//! | `W` `S` / `Up` `Down` | Move left / right hand |
//! | `D` / `Left` (hold) | Pull left / right trigger |
//! | `R` | Reset match |
//! | `Escape` | Quit |

pub mod error;
pub mod source;
pub mod worker;
pub mod cues;
pub mod visualizer;
pub mod app;

pub use error::ArenaError;
pub use worker::{Arena, ArenaSnapshot};
