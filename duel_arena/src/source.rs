//! Hand pose sources — both from LeapMotion hardware and keyboard simulation.
//!
//! The worker pulls one [`PoseFrame`] per iteration from a [`PoseSource`].
//! It doesn't need to know whether the hands came from real hardware or the
//! keyboard simulator.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use enum_map::EnumMap;

use duel_core::{DuelConfig, HandPose, Point, Side};

// ════════════════════════════════════════════════════════════════════════════
// PoseFrame / PoseSource
// ════════════════════════════════════════════════════════════════════════════

/// One observation: the detected hands plus the image they were found in,
/// if the source has one to show.
#[derive(Clone, Debug, Default)]
pub struct PoseFrame {
    pub hands: Vec<HandPose>,
    pub image: Option<Arc<[u8]>>,
}

/// Anything that can deliver hand observations, one frame at a time.
///
/// The source owns its capture resource; dropping it releases the resource.
pub trait PoseSource: Send + 'static {
    /// Wait for the next observation.  `None` means the source is closed and
    /// the worker should stop.
    fn next_frame(&mut self) -> Option<PoseFrame>;
}

// ════════════════════════════════════════════════════════════════════════════
// LeapPoseSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Pose source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// # Mapping
///
/// The controller reports joints in millimetres above the device.  We drop
/// depth and project the horizontal/vertical plane onto the frame:
///
/// * x in `[-LEAP_HALF_SPAN, LEAP_HALF_SPAN]` → `[0, width]`
/// * y in `[LEAP_FLOOR, LEAP_CEILING]` → `[height, 0]` (screen y grows down)
///
/// Keypoints: index distal tip → fingertip, index knuckle → finger base,
/// middle knuckle → secondary base, middle metacarpal root → wrist.
#[cfg(feature = "leap")]
pub struct LeapPoseSource {
    connection: leaprs::Connection,
    width:      f32,
    height:     f32,
}

#[cfg(feature = "leap")]
impl LeapPoseSource {
    const LEAP_HALF_SPAN: f32 = 250.0; // mm
    const LEAP_FLOOR:     f32 = 50.0;  // mm
    const LEAP_CEILING:   f32 = 450.0; // mm
    /// Polls without a tracking event before reporting an empty frame.
    const MAX_IDLE_POLLS: u32 = 50;

    pub fn open(config: &DuelConfig) -> Result<Self, crate::ArenaError> {
        use leaprs::*;
        use crate::ArenaError;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| ArenaError::SourceUnavailable(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| ArenaError::SourceUnavailable(format!("LeapMotion device: {:?}", e)))?;
        tracing::info!("LeapMotion connection open");

        Ok(LeapPoseSource {
            connection,
            width:  config.frame_width,
            height: config.frame_height,
        })
    }

    fn project(&self, x: f32, y: f32) -> Point {
        let nx = (x + Self::LEAP_HALF_SPAN) / (2.0 * Self::LEAP_HALF_SPAN);
        let ny = (y - Self::LEAP_FLOOR) / (Self::LEAP_CEILING - Self::LEAP_FLOOR);
        Point::new(nx * self.width, (1.0 - ny) * self.height)
    }
}

#[cfg(feature = "leap")]
impl PoseSource for LeapPoseSource {
    fn next_frame(&mut self) -> Option<PoseFrame> {
        use leaprs::*;

        for _ in 0..Self::MAX_IDLE_POLLS {
            let msg = match self.connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let mut hands = Vec::new();
                for hand in frame.hands() {
                    let digits: Vec<_> = hand.digits().collect();
                    if digits.len() < 3 { continue; }
                    let index  = &digits[1];
                    let middle = &digits[2];

                    let tip   = index.distal().next_joint();
                    let base  = index.metacarpal().next_joint();
                    let knuck = middle.metacarpal().next_joint();
                    let wrist = middle.metacarpal().prev_joint();

                    hands.push(HandPose {
                        wrist_pos:          self.project(wrist.x, wrist.y),
                        fingertip_pos:      self.project(tip.x,   tip.y),
                        finger_base_pos:    self.project(base.x,  base.y),
                        secondary_base_pos: self.project(knuck.x, knuck.y),
                    });
                }
                return Some(PoseFrame { hands, image: None });
            }
        }
        // No tracking data: hands absent this frame.
        Some(PoseFrame::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimPoseSource — keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Bring a hand into / out of the frame.
    ToggleHand(Side),
    /// Move a hand vertically by `dy` pixels.
    Nudge { side: Side, dy: f32 },
    /// Press or release a trigger.
    Trigger { side: Side, pulled: bool },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SimHand {
    visible: bool,
    y:       f32,
    pulled:  bool,
}

/// Two simulated hands driven by [`SimInput`] events (from the visualizer's
/// window).
///
/// Each hand stays at a fixed x, a fifth of the frame in from its edge, and
/// starts visible with its finger raised, so an untouched simulator primes.
pub struct SimPoseSource {
    rx:     Receiver<SimInput>,
    hands:  EnumMap<Side, SimHand>,
    width:  f32,
    height: f32,
}

impl SimPoseSource {
    /// Keep hands at least this far from the top/bottom edges.
    const MARGIN_TOP:    f32 = 60.0;
    const MARGIN_BOTTOM: f32 = 80.0;

    pub fn new(rx: Receiver<SimInput>, config: &DuelConfig) -> Self {
        let start = SimHand { visible: true, y: config.frame_height / 2.0, pulled: false };
        SimPoseSource {
            rx,
            hands:  EnumMap::from_fn(|_| start),
            width:  config.frame_width,
            height: config.frame_height,
        }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::ToggleHand(side) => {
                self.hands[side].visible = !self.hands[side].visible;
            }
            SimInput::Nudge { side, dy } => {
                let lo = Self::MARGIN_TOP;
                let hi = (self.height - Self::MARGIN_BOTTOM).max(lo);
                self.hands[side].y = (self.hands[side].y + dy).clamp(lo, hi);
            }
            SimInput::Trigger { side, pulled } => {
                self.hands[side].pulled = pulled;
            }
        }
    }

    /// The visible hands, left first.
    pub fn poses(&self) -> Vec<HandPose> {
        self.hands.iter()
            .filter(|(_, h)| h.visible)
            .map(|(side, h)| {
                let x = match side {
                    Side::Left  => self.width * 0.2,
                    Side::Right => self.width * 0.8,
                };
                sim_hand_pose(side, Point::new(x, h.y), h.pulled)
            })
            .collect()
    }
}

impl PoseSource for SimPoseSource {
    fn next_frame(&mut self) -> Option<PoseFrame> {
        loop {
            match self.rx.try_recv() {
                Ok(input)                       => self.apply(input),
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return None,
            }
        }
        Some(PoseFrame { hands: self.poses(), image: None })
    }
}

/// Keypoints of a stylised finger-gun hand whose trigger-finger knuckle is
/// at `base`, facing the opponent of `side`.
pub fn sim_hand_pose(side: Side, base: Point, pulled: bool) -> HandPose {
    let dir = side.toward_opponent();
    let fingertip = if pulled {
        Point::new(base.x + dir * 40.0, base.y + 12.0)
    } else {
        Point::new(base.x, base.y - 45.0)
    };
    HandPose {
        wrist_pos:          Point::new(base.x - dir * 10.0, base.y + 70.0),
        fingertip_pos:      fingertip,
        finger_base_pos:    base,
        secondary_base_pos: Point::new(base.x + dir * 12.0, base.y + 8.0),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
