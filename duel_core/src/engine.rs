//! The duel engine: one call to [`DuelEngine::step`] per observed frame.
//!
//! `step` classifies the hands, runs the priming machine, and while a round is
//! live, detects firing edges, moves projectiles and resolves hits.

use std::time::Instant;

use enum_map::EnumMap;
use tracing::{debug, info};

use crate::config::DuelConfig;
use crate::pose::{HandPose, SidedHands};
use crate::priming::{PrimingOutcome, PrimingStateMachine};
use crate::projectile::Projectile;
use crate::side::Side;
use crate::state::MatchState;
use crate::status::StatusProjection;

// ════════════════════════════════════════════════════════════════════════════
// FrameReport
// ════════════════════════════════════════════════════════════════════════════

/// A projectile landing on `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub target:       Side,
    pub remaining_hp: u8,
}

/// Everything notable that happened during one [`DuelEngine::step`].
///
/// Purely informational; consumers use it for logging and cues.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub round_started: bool,
    /// The round start was a rematch after a decided round.
    pub rematch:       bool,
    pub aborted:       bool,
    /// Sides that fired this frame, in side order.
    pub shots:         Vec<Side>,
    pub hits:          Vec<Hit>,
    pub winner:        Option<Side>,
}

impl FrameReport {
    pub fn is_quiet(&self) -> bool {
        !self.round_started && !self.aborted && self.shots.is_empty() && self.hits.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DuelEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct DuelEngine {
    config:       DuelConfig,
    priming:      PrimingStateMachine,
    state:        MatchState,
    projectiles:  Vec<Projectile>,
    /// Was each side firing on the previous in-round frame.
    prior_firing: EnumMap<Side, bool>,
}

impl DuelEngine {
    pub fn new(config: DuelConfig) -> Self {
        DuelEngine {
            priming:      PrimingStateMachine::new(&config),
            state:        MatchState::new(config.starting_hp),
            projectiles:  Vec::new(),
            prior_firing: EnumMap::default(),
            config,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &DuelConfig        { &self.config }
    pub fn state(&self) -> &MatchState         { &self.state }
    pub fn projectiles(&self) -> &[Projectile] { &self.projectiles }
    pub fn status(&self) -> StatusProjection   { StatusProjection::from(&self.state) }

    /// Elapsed share of the hold currently required to (re)start a round.
    pub fn hold_progress(&self, now: Instant) -> f32 {
        self.priming.progress(&self.state, now)
    }

    // ── commands ──────────────────────────────────────────────────────────

    /// Force the initial state: full HP, no winner, not playing, not primed.
    pub fn reset(&mut self) {
        self.state.reset();
        self.clear_round();
        info!("match reset");
    }

    /// Process one observation.
    pub fn step(&mut self, hands: &[HandPose], now: Instant) -> FrameReport {
        let hands = SidedHands::collect(hands, self.config.frame_width);
        let mut report = FrameReport::default();

        match self.priming.advance(&mut self.state, &hands, now) {
            PrimingOutcome::Unchanged => {}
            PrimingOutcome::Aborted => {
                self.clear_round();
                report.aborted = true;
                info!(left_hp = self.state.left_hp(), right_hp = self.state.right_hp(), "hands lost, round aborted");
            }
            PrimingOutcome::StartRound => {
                self.state.is_playing = true;
                report.round_started = true;
                info!(left_hp = self.state.left_hp(), right_hp = self.state.right_hp(), "round started");
            }
            PrimingOutcome::Rematch => {
                self.state.restore();
                self.clear_round();
                self.state.is_playing = true;
                report.round_started = true;
                report.rematch = true;
                info!("rematch started");
            }
        }

        if self.state.is_playing && self.state.winning_side.is_none() {
            self.fire(&hands, &mut report);
            self.resolve(&hands, &mut report);
        }
        report
    }

    // ── round internals ───────────────────────────────────────────────────

    fn clear_round(&mut self) {
        self.projectiles.clear();
        self.prior_firing = EnumMap::default();
    }

    /// Spawn one projectile per not-firing → firing transition.
    fn fire(&mut self, hands: &SidedHands, report: &mut FrameReport) {
        for (side, hand) in hands.iter() {
            let firing = hand.is_firing();
            if firing && !self.prior_firing[side] {
                let p = Projectile::fire(side, hand.fingertip_pos, self.config.projectile_speed);
                debug!(%side, x = p.position.x, y = p.position.y, "shot fired");
                self.projectiles.push(p);
                report.shots.push(side);
            }
            self.prior_firing[side] = firing;
        }
    }

    /// Move every projectile once and apply hits, oldest first.  Stops at the
    /// first hit that ends the round.
    fn resolve(&mut self, hands: &SidedHands, report: &mut FrameReport) {
        let (width, height) = (self.config.frame_width, self.config.frame_height);
        let mut spent = vec![false; self.projectiles.len()];

        for (i, p) in self.projectiles.iter_mut().enumerate() {
            p.advance();
            if p.is_out_of_bounds(width, height) {
                spent[i] = true;
                continue;
            }
            let target = p.owner.opposite();
            let Some(hand) = hands.get(target) else { continue };
            if !hand.contains(p.position) {
                continue;
            }

            spent[i] = true;
            let remaining_hp = self.state.damage(target);
            report.hits.push(Hit { target, remaining_hp });
            info!(%target, remaining_hp, "hit");

            if let Some(winner) = self.state.winning_side {
                report.winner = Some(winner);
                info!(%winner, "round won");
                break;
            }
        }

        if report.winner.is_some() {
            self.clear_round();
        } else {
            let mut i = 0;
            self.projectiles.retain(|_| {
                let keep = !spent[i];
                i += 1;
                keep
            });
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Point;
    use crate::pose::tests::hand_at;
    use std::time::Duration;

    const LEFT_X:  f32 = 150.0;
    const RIGHT_X: f32 = 490.0;

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn pair(left_raised: bool, right_raised: bool) -> Vec<HandPose> {
        vec![hand_at(LEFT_X, 200.0, left_raised), hand_at(RIGHT_X, 200.0, right_raised)]
    }

    /// An engine whose round is already live, plus the instant it went live.
    fn playing_engine() -> (DuelEngine, Instant) {
        let mut engine = DuelEngine::new(DuelConfig::default());
        let t0 = Instant::now();
        engine.step(&pair(true, true), t0);
        let report = engine.step(&pair(true, true), t0 + ms(3000));
        assert!(report.round_started);
        (engine, t0 + ms(3000))
    }

    #[test]
    fn scenario_a_three_second_prime_starts_a_clean_round() {
        let mut engine = DuelEngine::new(DuelConfig::default());
        let t0 = Instant::now();
        for t in (0..3000).step_by(10) {
            engine.step(&pair(true, true), t0 + ms(t));
            assert!(!engine.state().is_playing(), "started early at {} ms", t);
        }
        let report = engine.step(&pair(true, true), t0 + ms(3000));
        assert!(report.round_started && !report.rematch);
        let status = engine.status();
        assert!(status.is_playing);
        assert_eq!((status.left_hp, status.right_hp), (3, 3));
        assert!(engine.projectiles().is_empty());
    }

    #[test]
    fn scenario_b_one_trigger_pull_fires_one_projectile() {
        let (mut engine, t) = playing_engine();
        let report = engine.step(&pair(false, true), t + ms(10));
        assert_eq!(report.shots, vec![Side::Left]);
        assert_eq!(engine.projectiles().len(), 1);

        let p = engine.projectiles()[0];
        let tip = hand_at(LEFT_X, 200.0, false).fingertip_pos;
        assert_eq!(p.owner, Side::Left);
        assert_eq!(p.velocity, Point::new(20.0, 0.0));
        // Spawned at the fingertip, then advanced once in the same frame.
        assert_eq!(p.position, Point::new(tip.x + 20.0, tip.y));
    }

    #[test]
    fn holding_the_trigger_fires_once() {
        let (mut engine, t) = playing_engine();
        let mut shots = 0;
        for i in 1..=5 {
            shots += engine.step(&pair(false, true), t + ms(10 * i)).shots.len();
        }
        assert_eq!(shots, 1);
        // Release and pull again: a second projectile.
        engine.step(&pair(true, true), t + ms(60));
        shots += engine.step(&pair(false, true), t + ms(70)).shots.len();
        assert_eq!(shots, 2);
    }

    #[test]
    fn projectile_leaves_after_width_over_speed_frames() {
        let (mut engine, t) = playing_engine();
        // Muzzle on the left edge, target hand far below the flight path.
        let mut shooter = hand_at(LEFT_X, 100.0, false);
        shooter.fingertip_pos = Point::new(0.0, 120.0);
        let target = hand_at(RIGHT_X, 400.0, true);

        engine.step(&[shooter, target], t + ms(10));
        assert_eq!(engine.projectiles().len(), 1);
        let frames = (640.0_f32 / 20.0) as u64;
        for i in 2..frames {
            engine.step(&[shooter, target], t + ms(10 * i));
            assert_eq!(engine.projectiles().len(), 1, "gone early at frame {}", i);
        }
        engine.step(&[shooter, target], t + ms(10 * frames));
        assert!(engine.projectiles().is_empty());
        assert_eq!(engine.state().right_hp(), 3);
    }

    #[test]
    fn scenario_c_projectile_inside_hitbox_costs_one_hp() {
        let (mut engine, t) = playing_engine();
        let mut shooter = hand_at(RIGHT_X, 200.0, false);
        // Muzzle just outside the left hand's 60 px hitbox.
        shooter.fingertip_pos = Point::new(LEFT_X + 75.0, 200.0);
        let target = hand_at(LEFT_X, 200.0, true);

        let report = engine.step(&[target, shooter], t + ms(10));
        assert_eq!(report.hits, vec![Hit { target: Side::Left, remaining_hp: 2 }]);
        assert!(engine.projectiles().is_empty());
        assert!(engine.state().is_playing());
        assert!(engine.state().is_consistent());
    }

    #[test]
    fn three_hits_end_the_round_for_the_shooter() {
        let (mut engine, mut t) = playing_engine();
        let mut shooter = hand_at(RIGHT_X, 200.0, false);
        shooter.fingertip_pos = Point::new(LEFT_X + 75.0, 200.0);
        let target = hand_at(LEFT_X, 200.0, true);
        let reload = hand_at(RIGHT_X, 200.0, true);

        let mut last = FrameReport::default();
        for _ in 0..3 {
            t += ms(10);
            engine.step(&[target, reload], t);
            t += ms(10);
            last = engine.step(&[target, shooter], t);
        }
        assert_eq!(last.winner, Some(Side::Right));
        let status = engine.status();
        assert_eq!(status.left_hp, 0);
        assert_eq!(status.winning_side, Some(Side::Right));
        assert!(status.game_over && !status.is_playing);
        assert!(engine.state().primed_since().is_none());
        assert!(engine.state().is_consistent());
    }

    #[test]
    fn round_ending_hit_stops_processing_and_clears_the_field() {
        let mut engine = DuelEngine::new(DuelConfig { starting_hp: 1, ..DuelConfig::default() });
        let t0 = Instant::now();
        engine.step(&pair(true, true), t0);
        engine.step(&pair(true, true), t0 + ms(3000));

        // Both fire in the same frame from close range; each would hit.
        let mut l = hand_at(LEFT_X, 200.0, false);
        l.fingertip_pos = Point::new(RIGHT_X - 70.0, 200.0);
        let mut r = hand_at(RIGHT_X, 200.0, false);
        r.fingertip_pos = Point::new(LEFT_X + 70.0, 200.0);
        let report = engine.step(&[l, r], t0 + ms(3010));

        assert_eq!(report.shots, vec![Side::Left, Side::Right]);
        // The left shot was created first, so it lands first and ends it.
        assert_eq!(report.hits, vec![Hit { target: Side::Right, remaining_hp: 0 }]);
        assert_eq!(engine.state().left_hp(), 1);
        assert_eq!(engine.state().winning_side(), Some(Side::Left));
        assert!(engine.projectiles().is_empty());
    }

    #[test]
    fn scenario_d_lost_hands_abort_without_touching_hp() {
        let (mut engine, t) = playing_engine();
        let mut shooter = hand_at(RIGHT_X, 200.0, false);
        shooter.fingertip_pos = Point::new(LEFT_X + 75.0, 200.0);
        engine.step(&[hand_at(LEFT_X, 200.0, true), shooter], t + ms(10));
        engine.step(&pair(true, true), t + ms(20));
        engine.step(&pair(true, false), t + ms(30));
        assert_eq!(engine.projectiles().len(), 1);

        let report = engine.step(&[], t + ms(40));
        assert!(report.aborted);
        let status = engine.status();
        assert!(!status.is_playing && !status.game_over);
        assert_eq!((status.left_hp, status.right_hp), (2, 3));
        assert!(engine.projectiles().is_empty());
    }

    #[test]
    fn both_hands_on_one_side_abort_the_round() {
        let (mut engine, t) = playing_engine();
        engine.step(&pair(false, true), t + ms(10));
        assert_eq!(engine.projectiles().len(), 1);

        let crowded = [hand_at(LEFT_X, 200.0, true), hand_at(LEFT_X + 60.0, 260.0, true)];
        let report = engine.step(&crowded, t + ms(20));
        assert!(report.aborted);
        assert!(report.hits.is_empty() && report.winner.is_none());
        let status = engine.status();
        assert!(!status.is_playing && !status.is_primed);
        assert_eq!(status.winning_side, None);
        assert_eq!((status.left_hp, status.right_hp), (3, 3));
        assert!(engine.projectiles().is_empty());
    }

    #[test]
    fn aborted_round_restarts_after_the_full_hold_keeping_hp() {
        let (mut engine, t) = playing_engine();
        let mut shooter = hand_at(RIGHT_X, 200.0, false);
        shooter.fingertip_pos = Point::new(LEFT_X + 75.0, 200.0);
        engine.step(&[hand_at(LEFT_X, 200.0, true), shooter], t + ms(10));
        engine.step(&[], t + ms(20));

        let t1 = t + ms(100);
        engine.step(&pair(true, true), t1);
        assert!(!engine.step(&pair(true, true), t1 + ms(750)).round_started);
        assert!(engine.step(&pair(true, true), t1 + ms(3000)).round_started);
        assert_eq!(engine.state().left_hp(), 2);
    }

    #[test]
    fn scenario_e_rematch_after_a_decided_round() {
        let mut engine = DuelEngine::new(DuelConfig { starting_hp: 1, ..DuelConfig::default() });
        let t0 = Instant::now();
        engine.step(&pair(true, true), t0);
        engine.step(&pair(true, true), t0 + ms(3000));
        let mut l = hand_at(LEFT_X, 200.0, false);
        l.fingertip_pos = Point::new(RIGHT_X - 70.0, 200.0);
        engine.step(&[l, hand_at(RIGHT_X, 200.0, true)], t0 + ms(3010));
        assert_eq!(engine.status().winning_side, Some(Side::Left));

        let t1 = t0 + ms(5000);
        engine.step(&pair(true, true), t1);
        let early = engine.step(&pair(true, true), t1 + ms(700));
        assert!(!early.round_started);
        assert_eq!(engine.status().winning_side, Some(Side::Left));

        let report = engine.step(&pair(true, true), t1 + ms(750));
        assert!(report.round_started && report.rematch);
        let status = engine.status();
        assert!(status.is_playing);
        assert_eq!((status.left_hp, status.right_hp), (1, 1));
        assert_eq!(status.winning_side, None);
        assert!(engine.projectiles().is_empty());
    }

    #[test]
    fn winner_survives_lost_hands() {
        let mut engine = DuelEngine::new(DuelConfig { starting_hp: 1, ..DuelConfig::default() });
        let t0 = Instant::now();
        engine.step(&pair(true, true), t0);
        engine.step(&pair(true, true), t0 + ms(3000));
        let mut l = hand_at(LEFT_X, 200.0, false);
        l.fingertip_pos = Point::new(RIGHT_X - 70.0, 200.0);
        engine.step(&[l, hand_at(RIGHT_X, 200.0, true)], t0 + ms(3010));

        let report = engine.step(&[], t0 + ms(3020));
        assert!(!report.aborted);
        assert_eq!(engine.status().winning_side, Some(Side::Left));
    }

    #[test]
    fn reset_returns_to_initial_state_mid_round() {
        let (mut engine, t) = playing_engine();
        engine.step(&pair(false, false), t + ms(10));
        assert_eq!(engine.projectiles().len(), 2);
        engine.reset();
        assert_eq!(engine.state(), &MatchState::new(3));
        assert!(engine.projectiles().is_empty());
        // No live round, so trigger pulls are ignored.
        assert!(engine.step(&pair(false, false), t + ms(20)).shots.is_empty());
    }

    #[test]
    fn extra_hand_on_a_side_is_ignored() {
        let (mut engine, t) = playing_engine();
        let hands = [
            hand_at(LEFT_X, 200.0, true),
            hand_at(LEFT_X + 40.0, 200.0, false),
            hand_at(RIGHT_X, 200.0, true),
        ];
        assert!(engine.step(&hands, t + ms(10)).shots.is_empty());
    }

    #[test]
    fn hp_and_win_invariants_hold_through_a_long_exchange() {
        let (mut engine, mut t) = playing_engine();
        let patterns = [(false, true), (true, true), (true, false), (false, false), (true, true)];
        for i in 0..400 {
            let (l, r) = patterns[i % patterns.len()];
            let hands = if i % 97 == 96 { Vec::new() } else { pair(l, r) };
            t += ms(10);
            engine.step(&hands, t);
            let s = engine.state();
            assert!(s.left_hp() <= 3 && s.right_hp() <= 3);
            assert!(s.is_consistent(), "inconsistent at frame {}: {:?}", i, s);
        }
    }
}
