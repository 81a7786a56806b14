//! Geometry primitives for segment collision
//!
//! Points and vectors are both `DVec2`; the aliases only document intent.
//! A `Line` is a finite segment, but `closest_point` and
//! `intersection_point` treat it as the infinite line through its endpoints.
//! Callers clamp with `point_on_line`.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::{EPSILON, PARALLEL_EPSILON};
use crate::error::{EngineError, EngineResult};
use crate::{cross, is_finite};

/// A position in the arena
pub type Point = DVec2;
/// A displacement or velocity
pub type Vector = DVec2;

/// Vector operations the collision code needs on top of glam
pub trait VectorExt {
    /// Unit-length copy, or zero for a zero-length vector
    fn unit_vector(self) -> Self;
    /// Rotate counter-clockwise by `degrees`
    fn rotated_degrees(self, degrees: f64) -> Self;
    /// True if `point` lies in the quadrant this vector points into.
    ///
    /// Axes where the vector has no component accept any coordinate. Neither
    /// a zero vector nor a point within `EPSILON` of the origin qualifies.
    fn point_in_quadrant(self, point: DVec2) -> bool;
}

impl VectorExt for DVec2 {
    #[inline]
    fn unit_vector(self) -> Self {
        self.normalize_or_zero()
    }

    fn rotated_degrees(self, degrees: f64) -> Self {
        DVec2::from_angle(degrees.to_radians()).rotate(self)
    }

    fn point_in_quadrant(self, point: DVec2) -> bool {
        let len = self.length();
        if len <= EPSILON || point.length() <= EPSILON {
            return false;
        }
        let axis = |v: f64, p: f64| v.abs() <= EPSILON * len || v * p > 0.0;
        axis(self.x, point.x) && axis(self.y, point.y)
    }
}

/// One of the four arena walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    Bottom,
    Right,
    Top,
    Left,
}

/// Identity of a segment, passed through to collision reports untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineTag {
    #[default]
    Untagged,
    /// Arena boundary wall
    Boundary(Wall),
    /// Obstacle segment; the token identifies its owner (e.g. a brick)
    Obstacle(u64),
}

impl LineTag {
    pub fn is_boundary(&self) -> bool {
        matches!(self, LineTag::Boundary(_))
    }

    /// Owner token for obstacle segments
    pub fn owner(&self) -> Option<u64> {
        match self {
            LineTag::Obstacle(owner) => Some(*owner),
            _ => None,
        }
    }
}

/// A static line segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
    #[serde(default)]
    pub tag: LineTag,
}

impl Line {
    /// Untagged segment; fails if the endpoints coincide or are not finite
    pub fn new(p1: Point, p2: Point) -> EngineResult<Self> {
        Self::tagged(p1, p2, LineTag::Untagged)
    }

    /// Segment belonging to an obstacle owner
    pub fn obstacle(p1: Point, p2: Point, owner: u64) -> EngineResult<Self> {
        Self::tagged(p1, p2, LineTag::Obstacle(owner))
    }

    pub fn tagged(p1: Point, p2: Point, tag: LineTag) -> EngineResult<Self> {
        if !is_finite(p1) || !is_finite(p2) {
            return Err(EngineError::InvalidGeometry(format!(
                "segment endpoints must be finite: {p1} -> {p2}"
            )));
        }
        if p1.distance(p2) <= EPSILON {
            return Err(EngineError::InvalidGeometry(format!(
                "segment endpoints coincide at {p1}"
            )));
        }
        Ok(Self { p1, p2, tag })
    }

    /// Unchecked line through two points, for rays and helper lines.
    /// The caller guarantees the points are distinct.
    #[inline]
    pub(crate) fn through(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            tag: LineTag::Untagged,
        }
    }

    /// The four boundary walls of a `width` x `height` arena, counter-clockwise
    /// from the origin
    pub fn arena_boundary(width: f64, height: f64) -> [Line; 4] {
        let corners = [
            DVec2::new(0.0, 0.0),
            DVec2::new(width, 0.0),
            DVec2::new(width, height),
            DVec2::new(0.0, height),
        ];
        let walls = [Wall::Bottom, Wall::Right, Wall::Top, Wall::Left];
        std::array::from_fn(|i| Line {
            p1: corners[i],
            p2: corners[(i + 1) % 4],
            tag: LineTag::Boundary(walls[i]),
        })
    }

    #[inline]
    pub fn direction(&self) -> Vector {
        self.p2 - self.p1
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().length()
    }

    pub fn midpoint(&self) -> Point {
        (self.p1 + self.p2) * 0.5
    }

    /// Parameter `t` of the projection of `p`, where `p1` is 0 and `p2` is 1
    pub fn projection_param(&self, p: Point) -> f64 {
        let d = self.direction();
        let len_sq = d.length_squared();
        if len_sq <= EPSILON * EPSILON {
            return 0.0;
        }
        (p - self.p1).dot(d) / len_sq
    }

    /// Orthogonal projection of `p` onto the infinite line (not clamped)
    pub fn closest_point(&self, p: Point) -> Point {
        self.p1 + self.direction() * self.projection_param(p)
    }

    /// True if the projection of `p` falls within the segment, endpoints included
    pub fn point_on_line(&self, p: Point) -> bool {
        let tolerance = EPSILON / self.length().max(EPSILON);
        let t = self.projection_param(p);
        (-tolerance..=1.0 + tolerance).contains(&t)
    }

    /// Intersection of the two infinite lines, `None` when parallel or coincident
    pub fn intersection_point(&self, other: &Line) -> Option<Point> {
        let d1 = self.direction();
        let d2 = other.direction();
        let denom = cross(d1, d2);
        if denom.abs() <= PARALLEL_EPSILON * d1.length() * d2.length() {
            return None;
        }
        let t = cross(other.p1 - self.p1, d2) / denom;
        Some(self.p1 + d1 * t)
    }
}
