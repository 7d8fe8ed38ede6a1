//! Real-time MIDI sound cues.
//!
//! The worker turns each [`FrameReport`] into [`Cue`]s and sends them to a
//! playback thread, which plays short note patterns on a MIDI output port.
//! The worker never waits on audio.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use duel_core::{FrameReport, Side};

// ════════════════════════════════════════════════════════════════════════════
// Cue — sent to the playback thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    RoundStart,
    Shot(Side),
    Hit { target: Side, remaining_hp: u8 },
    Victory(Side),
    Abort,
}

impl Cue {
    /// Cues for one frame, in the order they should sound.
    pub fn from_report(report: &FrameReport) -> Vec<Cue> {
        let mut cues = Vec::new();
        if report.aborted       { cues.push(Cue::Abort); }
        if report.round_started { cues.push(Cue::RoundStart); }
        cues.extend(report.shots.iter().map(|&side| Cue::Shot(side)));
        cues.extend(report.hits.iter().map(|h| Cue::Hit { target: h.target, remaining_hp: h.remaining_hp }));
        if let Some(winner) = report.winner { cues.push(Cue::Victory(winner)); }
        cues
    }

    /// `(pitch, milliseconds)` steps.  Notes that share a step start together.
    pub fn pattern(self) -> Vec<(Vec<u8>, u64)> {
        match self {
            Cue::RoundStart => vec![(vec![60, 64, 67], 250)],
            // Left shots a little lower than right so the two players can be told apart.
            Cue::Shot(Side::Left)  => vec![(vec![84], 40)],
            Cue::Shot(Side::Right) => vec![(vec![88], 40)],
            Cue::Hit { remaining_hp, .. } => {
                let low = 36 + remaining_hp.min(12) * 2;
                vec![(vec![low], 120), (vec![low.saturating_sub(5)], 120)]
            }
            Cue::Victory(_) => vec![
                (vec![60], 110), (vec![64], 110), (vec![67], 110), (vec![72, 76, 79], 400),
            ],
            Cue::Abort => vec![(vec![55], 150), (vec![50], 200)],
        }
    }
}

/// MIDI settings for the cue thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CueSettings {
    pub program:  u8,
    pub velocity: u8,
    pub channel:  u8,
}

impl Default for CueSettings {
    fn default() -> Self {
        // GM program 115: Woodblock.
        CueSettings { program: 115, velocity: 100, channel: 0 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        let _ = self.conn.send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]);
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)   {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8)  {}
    fn note_off(&mut self, _ch: u8, _n: u8)          {}
}

/// Try to open the first available MIDI output port.
/// Falls back to `NullOut` with a warning if none found.
fn open_midi_output() -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("duel_arena_cues") {
        Ok(m)  => m,
        Err(e) => {
            warn!("MIDI init error: {} — cues muted", e);
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports found — cues muted (try `timidity -iA` or `fluidsynth`)");
        return Box::new(NullOut);
    }

    // Prefer a softsynth if visible
    let port_idx = ports.iter()
        .position(|p| {
            midi_out.port_name(p).map(|n| {
                let n = n.to_lowercase();
                n.contains("fluid") || n.contains("timidity") ||
                n.contains("microsoft") || n.contains("synth")
            }).unwrap_or(false)
        })
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());
    info!("opening MIDI port: {}", name);

    match midi_out.connect(port, "duel-cues") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            warn!("failed to connect MIDI port: {} — cues muted", e);
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cues — handle to the playback thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the cue thread.  A silent handle drops every cue.
pub struct Cues {
    tx: Option<Sender<Cue>>,
}

impl Cues {
    /// Spawn the playback thread on the first available MIDI port.
    pub fn spawn(settings: CueSettings) -> Self {
        let (tx, rx) = mpsc::channel::<Cue>();
        let spawned = thread::Builder::new()
            .name("duel-cues".into())
            .spawn(move || cue_thread(open_midi_output(), settings, rx));
        match spawned {
            Ok(_)  => Cues { tx: Some(tx) },
            Err(e) => {
                warn!("failed to spawn cue thread: {} — cues muted", e);
                Cues::silent()
            }
        }
    }

    pub fn silent() -> Self {
        Cues { tx: None }
    }

    pub fn announce(&self, report: &FrameReport) {
        let Some(tx) = &self.tx else { return };
        for cue in Cue::from_report(report) {
            let _ = tx.send(cue);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// cue_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

/// Plays cues until every sender is gone.
fn cue_thread(mut midi: Box<dyn MidiOut>, settings: CueSettings, rx: Receiver<Cue>) {
    let CueSettings { program, velocity, channel } = settings;
    midi.program_change(channel, program);

    for cue in rx {
        for (notes, millis) in cue.pattern() {
            for &n in &notes { midi.note_on(channel, n, velocity); }
            thread::sleep(Duration::from_millis(millis));
            for &n in &notes { midi.note_off(channel, n); }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
