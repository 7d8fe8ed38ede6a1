//! The simulation worker thread and its published snapshots.
//!
//! One thread owns the [`DuelEngine`].  After each observation it builds an
//! immutable [`ArenaSnapshot`] and swaps it in behind a single `Arc`, so a
//! reader always sees a whole frame: HP and winner never disagree.  Commands
//! (reset, stop) travel the other way over a channel and are drained before
//! every simulation step.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use duel_core::{DuelConfig, DuelEngine, HandPose, Projectile, StatusProjection};

use crate::cues::Cues;
use crate::error::ArenaError;
use crate::source::PoseSource;

// ════════════════════════════════════════════════════════════════════════════
// ArenaCommand — sent to the worker thread
// ════════════════════════════════════════════════════════════════════════════

enum ArenaCommand {
    /// Back to the initial match state before the next frame.
    Reset,
    /// Leave the loop and release the pose source.
    Stop,
}

// ════════════════════════════════════════════════════════════════════════════
// ArenaSnapshot — what readers see
// ════════════════════════════════════════════════════════════════════════════

/// Everything published for one fully processed frame.
#[derive(Clone, Debug)]
pub struct ArenaSnapshot {
    /// Frames processed so far; 0 before the first one.
    pub frame_index:   u64,
    pub status:        StatusProjection,
    /// Hit points each side starts a round with.
    pub full_hp:       u8,
    pub projectiles:   Vec<Projectile>,
    pub hands:         Vec<HandPose>,
    /// Share of the current priming hold already elapsed (0.0–1.0).
    pub hold_progress: f32,
    pub frame:         Option<Arc<[u8]>>,
}

impl ArenaSnapshot {
    /// What readers see before the first frame: the engine's own state, no
    /// hands, nothing in flight.
    pub fn idle(engine: &DuelEngine) -> Self {
        ArenaSnapshot {
            frame_index:   0,
            status:        engine.status(),
            full_hp:       engine.state().full_hp(),
            projectiles:   Vec::new(),
            hands:         Vec::new(),
            hold_progress: 0.0,
            frame:         None,
        }
    }
}

type Published = Arc<RwLock<Arc<ArenaSnapshot>>>;

// ════════════════════════════════════════════════════════════════════════════
// Arena — handle to the worker
// ════════════════════════════════════════════════════════════════════════════

/// Handle to a running duel.  Dropping it stops the worker.
pub struct Arena {
    published: Published,
    cmd_tx:    Sender<ArenaCommand>,
    handle:    Option<JoinHandle<()>>,
}

impl Arena {
    /// Spawn the worker.  `frame_interval` is slept after every frame and caps
    /// the frame rate.
    pub fn spawn<S: PoseSource>(
        source:         S,
        config:         DuelConfig,
        frame_interval: Duration,
        cues:           Cues,
    ) -> Result<Self, ArenaError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ArenaCommand>();
        let engine = DuelEngine::new(config);
        let published: Published = Arc::new(RwLock::new(Arc::new(ArenaSnapshot::idle(&engine))));

        let worker = Worker {
            source,
            engine,
            cmd_rx,
            published: Arc::clone(&published),
            frame_interval,
            cues,
        };
        let handle = thread::Builder::new()
            .name("duel-worker".into())
            .spawn(move || worker.run())?;

        Ok(Arena { published, cmd_tx, handle: Some(handle) })
    }

    /// The latest complete frame.
    pub fn snapshot(&self) -> Arc<ArenaSnapshot> {
        let guard = self.published.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn status(&self) -> StatusProjection {
        self.snapshot().status
    }

    /// Image payload of the latest processed frame, if the source supplied one.
    pub fn current_frame(&self) -> Option<Arc<[u8]>> {
        self.snapshot().frame.clone()
    }

    /// Request a match reset; applied before the next frame is processed.
    pub fn reset(&self) {
        let _ = self.cmd_tx.send(ArenaCommand::Reset);
    }

    /// False once the worker has exited (stopped, or its source closed).
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it to release its source.
    pub fn stop(&mut self) {
        let _ = self.cmd_tx.send(ArenaCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.stop();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Worker — the actual loop
// ════════════════════════════════════════════════════════════════════════════

struct Worker<S> {
    source:         S,
    engine:         DuelEngine,
    cmd_rx:         Receiver<ArenaCommand>,
    published:      Published,
    frame_interval: Duration,
    cues:           Cues,
}

impl<S: PoseSource> Worker<S> {
    fn run(mut self) {
        info!("worker started");
        let mut frame_index = 0u64;

        loop {
            // ── observe ───────────────────────────────────────────────────
            let Some(frame) = self.source.next_frame() else {
                info!(frames = frame_index, "pose source closed");
                return;
            };

            // ── drain commands ────────────────────────────────────────────
            // After the observation, so a reset sent while the source was
            // waiting still applies to this frame.
            loop {
                match self.cmd_rx.try_recv() {
                    Ok(ArenaCommand::Reset) => self.engine.reset(),
                    Ok(ArenaCommand::Stop) | Err(TryRecvError::Disconnected) => {
                        info!(frames = frame_index, "worker stopped");
                        return;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            // ── simulate ──────────────────────────────────────────────────
            let now = Instant::now();
            let report = self.engine.step(&frame.hands, now);
            if !report.is_quiet() {
                debug!(frame = frame_index, ?report, "frame events");
            }
            self.cues.announce(&report);

            // ── publish ───────────────────────────────────────────────────
            frame_index += 1;
            let snapshot = Arc::new(ArenaSnapshot {
                frame_index,
                status:        self.engine.status(),
                full_hp:       self.engine.state().full_hp(),
                projectiles:   self.engine.projectiles().to_vec(),
                hands:         frame.hands,
                hold_progress: self.engine.hold_progress(now),
                frame:         frame.image,
            });
            *self.published.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

            if !self.frame_interval.is_zero() {
                thread::sleep(self.frame_interval);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use duel_core::{Point, Side};
    use crate::source::{sim_hand_pose, PoseFrame};

    /// Plays back a fixed list of frames, then closes.
    struct Scripted(VecDeque<PoseFrame>);

    impl PoseSource for Scripted {
        fn next_frame(&mut self) -> Option<PoseFrame> {
            self.0.pop_front()
        }
    }

    /// Never closes; repeats the same frame forever.
    struct Looping(PoseFrame);

    impl PoseSource for Looping {
        fn next_frame(&mut self) -> Option<PoseFrame> {
            Some(self.0.clone())
        }
    }

    /// Blocks on a channel the test feeds; closes when the sender drops.
    struct Fed(mpsc::Receiver<PoseFrame>);

    impl PoseSource for Fed {
        fn next_frame(&mut self) -> Option<PoseFrame> {
            self.0.recv().ok()
        }
    }

    fn primed_pair() -> Vec<HandPose> {
        vec![
            sim_hand_pose(Side::Left,  Point::new(128.0, 240.0), false),
            sim_hand_pose(Side::Right, Point::new(512.0, 240.0), false),
        ]
    }

    fn instant_start() -> DuelConfig {
        DuelConfig { start_hold: Duration::ZERO, ..DuelConfig::default() }
    }

    fn frame(hands: Vec<HandPose>) -> PoseFrame {
        PoseFrame { hands, image: None }
    }

    fn wait_until(arena: &Arena, what: impl Fn(&ArenaSnapshot) -> bool) -> Arc<ArenaSnapshot> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let snap = arena.snapshot();
            if what(&snap) { return snap; }
            assert!(Instant::now() < deadline, "timed out; last snapshot {:?}", snap);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn initial_snapshot_reflects_the_configured_hp() {
        let config = DuelConfig { starting_hp: 5, ..DuelConfig::default() };
        let arena = Arena::spawn(Scripted(VecDeque::new()), config, Duration::ZERO, Cues::silent())
            .expect("spawn");
        let deadline = Instant::now() + Duration::from_secs(5);
        while arena.is_running() {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        let snap = arena.snapshot();
        assert_eq!(snap.frame_index, 0);
        assert_eq!(snap.full_hp, 5);
        let status = arena.status();
        assert_eq!((status.left_hp, status.right_hp), (5, 5));
        assert!(!status.is_playing && !status.game_over);
    }

    #[test]
    fn worker_processes_every_scripted_frame_then_exits() {
        let script: VecDeque<_> = (0..25).map(|_| frame(primed_pair())).collect();
        let arena = Arena::spawn(Scripted(script), instant_start(), Duration::ZERO, Cues::silent())
            .expect("spawn");
        let snap = wait_until(&arena, |s| s.frame_index == 25);
        assert!(snap.status.is_playing);
        assert_eq!(snap.hands.len(), 2);
        let deadline = Instant::now() + Duration::from_secs(5);
        while arena.is_running() {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(arena.snapshot().frame_index, 25);
    }

    #[test]
    fn frame_payload_is_passed_through() {
        let image: Arc<[u8]> = Arc::from(vec![0xFF_u8, 0xD8, 0xFF]);
        let script = VecDeque::from(vec![PoseFrame { hands: Vec::new(), image: Some(Arc::clone(&image)) }]);
        let arena = Arena::spawn(Scripted(script), DuelConfig::default(), Duration::ZERO, Cues::silent())
            .expect("spawn");
        wait_until(&arena, |s| s.frame_index == 1);
        assert_eq!(arena.current_frame().as_deref(), Some(&image[..]));
    }

    #[test]
    fn reset_applies_to_the_next_frame() {
        let (feed, rx) = mpsc::channel();
        let arena = Arena::spawn(Fed(rx), instant_start(), Duration::ZERO, Cues::silent())
            .expect("spawn");

        let left = sim_hand_pose(Side::Left,  Point::new(128.0, 240.0), false);
        let fire = sim_hand_pose(Side::Right, Point::new(512.0, 240.0), true);
        feed.send(frame(primed_pair())).unwrap();
        for _ in 0..20 { feed.send(frame(vec![left, fire])).unwrap(); }
        let hit = wait_until(&arena, |s| s.frame_index == 21);
        assert!(hit.status.is_playing);
        assert_eq!(hit.status.left_hp, 2);

        arena.reset();
        feed.send(frame(Vec::new())).unwrap();
        let after = wait_until(&arena, |s| s.frame_index == 22);
        assert!(!after.status.is_playing && !after.status.is_primed);
        assert_eq!((after.status.left_hp, after.status.right_hp), (3, 3));
        assert!(after.projectiles.is_empty());
        // Close the feed so the worker can exit when the arena drops.
        drop(feed);
    }

    #[test]
    fn stop_joins_a_source_that_never_closes() {
        let mut arena = Arena::spawn(Looping(frame(primed_pair())), instant_start(), Duration::from_millis(1), Cues::silent())
            .expect("spawn");
        wait_until(&arena, |s| s.frame_index >= 2);
        arena.stop();
        assert!(!arena.is_running());
        let frozen = arena.snapshot().frame_index;
        thread::sleep(Duration::from_millis(10));
        assert_eq!(arena.snapshot().frame_index, frozen);
    }

    #[test]
    fn readers_never_see_hp_and_winner_disagree() {
        let mut script = VecDeque::new();
        script.push_back(frame(primed_pair()));
        let left  = sim_hand_pose(Side::Left,  Point::new(128.0, 240.0), false);
        let fire  = sim_hand_pose(Side::Right, Point::new(512.0, 240.0), true);
        let ready = sim_hand_pose(Side::Right, Point::new(512.0, 240.0), false);
        for _ in 0..3 {
            for _ in 0..20 { script.push_back(frame(vec![left, fire])); }
            script.push_back(frame(vec![left, ready]));
        }
        let total = script.len() as u64;
        let arena = Arena::spawn(Scripted(script), instant_start(), Duration::ZERO, Cues::silent())
            .expect("spawn");

        loop {
            let snap = arena.snapshot();
            let s = snap.status;
            let someone_out = s.left_hp == 0 || s.right_hp == 0;
            assert_eq!(s.game_over, someone_out, "torn snapshot {:?}", s);
            assert_eq!(s.winning_side.is_some(), someone_out);
            if snap.frame_index == total { break; }
            thread::yield_now();
        }
        let s = arena.status();
        assert_eq!(s.winning_side, Some(Side::Right));
        assert_eq!(s.left_hp, 0);
    }
}
