//! Bullets in flight.

use serde::Serialize;

use crate::pose::Point;
use crate::side::Side;

/// One live projectile.  Projectiles have no identity; the engine keeps them
/// in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Projectile {
    pub position: Point,
    /// Pixels per frame.  The vertical component is always zero.
    pub velocity: Point,
    pub owner:    Side,
}

impl Projectile {
    /// Launch from `muzzle` toward the opponent of `owner`.
    pub fn fire(owner: Side, muzzle: Point, speed: f32) -> Self {
        Projectile {
            position: muzzle,
            velocity: Point::new(speed * owner.toward_opponent(), 0.0),
            owner,
        }
    }

    pub fn advance(&mut self) {
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;
    }

    /// Outside `[0, width) × [0, height)` on either axis.
    pub fn is_out_of_bounds(&self, width: f32, height: f32) -> bool {
        let Point { x, y } = self.position;
        x < 0.0 || x >= width || y < 0.0 || y >= height
    }
}
