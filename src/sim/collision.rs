//! Collision events and response
//!
//! A `Collision` is a prediction: where a body's centre will be when its
//! surface first touches a segment, and what it touches. Resolving one
//! yields the reflected velocity; speed is conserved here and any damping is
//! the caller's business.

use serde::{Deserialize, Serialize};

use super::geometry::{Line, LineTag, Point, Vector, VectorExt};
use super::state::BodyHandle;
use crate::consts::EPSILON;

/// What part of a segment the body touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionKind {
    /// Contact with the interior span of the segment
    Face,
    /// Contact with one of the segment's endpoints
    Endpoint,
}

/// A predicted contact between one body and one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub body: BodyHandle,
    /// Index of the segment in the environment's segment list
    pub line_index: usize,
    pub tag: LineTag,
    pub kind: CollisionKind,
    /// Body position when the prediction was made
    pub origin: Point,
    /// Body velocity when the prediction was made
    pub velocity: Vector,
    /// Where the body's centre is at the moment of contact
    pub collision_point: Point,
    /// The exact point of contact on the segment
    pub touch_point: Point,
}

impl Collision {
    /// Straight-line distance from the origin to the collision point
    #[inline]
    pub fn distance(&self) -> f64 {
        self.origin.distance(self.collision_point)
    }

    /// Time until contact, `None` for a stationary body
    pub fn time_left(&self) -> Option<f64> {
        let speed = self.velocity.length();
        if speed <= EPSILON {
            None
        } else {
            Some(self.distance() / speed)
        }
    }

    /// Reject contacts lying behind the direction of travel.
    ///
    /// This is a guard against floating-point residue (a body that just
    /// bounced would otherwise re-collide with the surface it is leaving),
    /// not a physical rule.
    pub fn is_valid(&self) -> bool {
        let relative = self.collision_point - self.origin;
        !(-self.velocity).point_in_quadrant(relative)
    }

    /// Velocity after the collision, same speed as before
    pub fn reflect(&self) -> Vector {
        let new_dir = match self.kind {
            // Straight out from the point of contact
            CollisionKind::Endpoint => self.collision_point - self.touch_point,
            CollisionKind::Face => {
                // Tangent line through the contact, mirror the incoming path across it
                let normal = self.collision_point - self.touch_point;
                let tangent_line = Line::through(self.touch_point, self.touch_point + normal.perp());

                // Any point on the incoming path works; this one exists even at zero distance
                let incoming = self.collision_point - self.velocity;
                let p_in = tangent_line.closest_point(incoming);
                let p_c = tangent_line.closest_point(self.collision_point);
                let mirrored = incoming - 2.0 * (p_in - p_c);

                mirrored - self.collision_point
            }
        };
        new_dir.unit_vector() * self.velocity.length()
    }
}
