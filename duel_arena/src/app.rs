//! Top-level wiring: pose source → worker → window, plus a headless runner.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use duel_core::{DuelConfig, Side, StatusProjection};

use crate::cues::{CueSettings, Cues};
use crate::error::ArenaError;
use crate::source::{SimInput, SimPoseSource};
use crate::visualizer::{Visualizer, WindowEvent};
use crate::worker::Arena;

// ════════════════════════════════════════════════════════════════════════════
// ArenaConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub duel:           DuelConfig,
    /// Pause after each worker frame; 10 ms caps the loop near 100 fps.
    pub frame_interval: Duration,
    /// `None` mutes sound cues.
    pub cues:           Option<CueSettings>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            duel:           DuelConfig::default(),
            frame_interval: Duration::from_millis(10),
            cues:           Some(CueSettings::default()),
        }
    }
}

impl ArenaConfig {
    fn spawn_cues(&self) -> Cues {
        match self.cues {
            Some(settings) => Cues::spawn(settings),
            None           => Cues::silent(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the windowed application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the pose source
/// (simulation by default, hardware with `--features leap`), the worker and
/// the preview window, and drives the window at ~60 fps until it closes.
pub fn run(cfg: ArenaConfig) -> Result<(), ArenaError> {
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    #[cfg(not(feature = "leap"))]
    let source = SimPoseSource::new(sim_rx, &cfg.duel);
    #[cfg(feature = "leap")]
    let source = {
        drop(sim_rx);
        crate::source::LeapPoseSource::open(&cfg.duel)?
    };

    let mut arena = Arena::spawn(source, cfg.duel.clone(), cfg.frame_interval, cfg.spawn_cues())?;
    let mut vis = Visualizer::new(
        sim_tx,
        cfg.duel.frame_width as usize,
        cfg.duel.frame_height as usize,
    )?;
    info!("preview window open");

    while vis.is_open() && arena.is_running() {
        match vis.poll_input() {
            WindowEvent::Quit  => break,
            WindowEvent::Reset => arena.reset(),
            WindowEvent::None  => {}
        }
        vis.render(&arena.snapshot());
    }

    arena.stop();
    info!(status = %arena.status().to_json(), "arena closed");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// run_headless() — scripted simulation without a window
// ════════════════════════════════════════════════════════════════════════════

/// Frames between scripted trigger pulls once a round is live.
const HEADLESS_FIRE_EVERY: u64 = 20;

/// Run the simulated source with no window for up to `frames` worker frames.
///
/// Both simulated hands start primed, so a round begins after the start hold.
/// From then on the left hand pulls its trigger every
/// [`HEADLESS_FIRE_EVERY`] frames.  Stops early once a winner is decided.
pub fn run_headless(cfg: ArenaConfig, frames: u64) -> Result<StatusProjection, ArenaError> {
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let source = SimPoseSource::new(sim_rx, &cfg.duel);
    let mut arena = Arena::spawn(source, cfg.duel.clone(), cfg.frame_interval, cfg.spawn_cues())?;
    info!(frames, "headless run");

    let poll = cfg.frame_interval.max(Duration::from_millis(1));
    let mut last_pulse = 0;
    let mut pulled = false;
    let deadline = headless_deadline(&cfg, frames, Instant::now());

    loop {
        let snap = arena.snapshot();
        if snap.frame_index >= frames || snap.status.game_over || !arena.is_running() {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() > d) {
            tracing::warn!(reached = snap.frame_index, "headless run timed out");
            break;
        }
        // The poll can skip frames, so pulse on every new block of frames.
        let pulse = snap.frame_index / HEADLESS_FIRE_EVERY;
        if snap.status.is_playing && pulse != last_pulse {
            pulled = !pulled;
            let _ = sim_tx.send(SimInput::Trigger { side: Side::Left, pulled });
            last_pulse = pulse;
        }
        thread::sleep(poll);
    }

    arena.stop();
    Ok(arena.status())
}

/// Wall-clock limit for a headless run; `None` when it lies past what
/// `Instant` can represent.
fn headless_deadline(cfg: &ArenaConfig, frames: u64, now: Instant) -> Option<Instant> {
    let budget = cfg.frame_interval
        .saturating_add(Duration::from_millis(2))
        .saturating_mul(u32::try_from(frames).unwrap_or(u32::MAX))
        .saturating_add(cfg.duel.start_hold)
        .saturating_add(Duration::from_secs(5));
    now.checked_add(budget)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
