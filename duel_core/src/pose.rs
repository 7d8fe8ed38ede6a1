//! Per-frame hand observations.
//!
//! A [`HandPose`] is whatever the landmark estimator reported for one hand in
//! one frame, reduced to the four keypoints the game reads.  Nothing here is
//! retained between frames.

use enum_map::EnumMap;
use serde::Serialize;

use crate::side::Side;

// ════════════════════════════════════════════════════════════════════════════
// Point
// ════════════════════════════════════════════════════════════════════════════

/// A 2-D position in frame pixels.  `y` grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandPose
// ════════════════════════════════════════════════════════════════════════════

/// The keypoints of one detected hand.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HandPose {
    pub wrist_pos:          Point,
    /// Tip of the trigger (index) finger.
    pub fingertip_pos:      Point,
    /// Knuckle of the trigger finger.
    pub finger_base_pos:    Point,
    /// Knuckle of the neighbouring finger; the hitbox is centred here.
    pub secondary_base_pos: Point,
}

impl HandPose {
    /// Side of the frame this hand is on, judged by the wrist.
    pub fn side(&self, frame_width: f32) -> Side {
        Side::classify(self.wrist_pos.x, frame_width)
    }

    /// Trigger finger points up: the tip sits above its knuckle on screen.
    pub fn is_raised(&self) -> bool {
        self.fingertip_pos.y < self.finger_base_pos.y
    }

    /// Trigger pulled.  Exactly the complement of [`is_raised`](Self::is_raised).
    pub fn is_firing(&self) -> bool {
        !self.is_raised()
    }

    /// Knuckle-to-wrist span.  Grows as the hand nears the camera, so a
    /// closer player is an easier target.
    pub fn hitbox_radius(&self) -> f32 {
        self.secondary_base_pos.distance(self.wrist_pos)
    }

    /// True if `p` lies inside this hand's hitbox (boundary included).
    pub fn contains(&self, p: Point) -> bool {
        p.distance(self.secondary_base_pos) <= self.hitbox_radius()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SidedHands — at most one hand per side
// ════════════════════════════════════════════════════════════════════════════

/// The hands of one frame after side classification and dedup.
///
/// The first hand seen on a side claims it; later hands on the same side are
/// ignored for this frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SidedHands {
    slots: EnumMap<Side, Option<HandPose>>,
}

impl SidedHands {
    pub fn collect(hands: &[HandPose], frame_width: f32) -> Self {
        let mut slots: EnumMap<Side, Option<HandPose>> = EnumMap::default();
        for hand in hands {
            let slot = &mut slots[hand.side(frame_width)];
            if slot.is_none() {
                *slot = Some(*hand);
            }
        }
        SidedHands { slots }
    }

    pub fn get(&self, side: Side) -> Option<&HandPose> {
        self.slots[side].as_ref()
    }

    /// Both halves of the frame have a hand.
    pub fn both(&self) -> Option<(&HandPose, &HandPose)> {
        Some((self.get(Side::Left)?, self.get(Side::Right)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &HandPose)> {
        self.slots.iter().filter_map(|(side, hand)| hand.as_ref().map(|h| (side, h)))
    }
}
