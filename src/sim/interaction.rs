//! Body vs segment contact enumeration
//!
//! The body travels along the ray from its position in the direction of its
//! velocity. Against one segment it can touch either endpoint or the
//! segment's face; every candidate is computed independently, filtered by
//! `Collision::is_valid`, and returned nearest first.

use super::collision::{Collision, CollisionKind};
use super::geometry::{Line, Point, VectorExt};
use super::state::Body;
use crate::consts::EPSILON;

/// All valid contacts between `body` and `line`, sorted by distance.
///
/// `line_index` is recorded in each collision so the environment can find
/// the segment again. A stationary body produces nothing.
pub fn solve(body: &Body, line: &Line, line_index: usize) -> Vec<Collision> {
    if body.is_stationary() {
        return Vec::new();
    }

    let ray = Line::through(body.position, body.position + body.velocity);
    let dir = body.velocity.unit_vector();
    let make = |kind, collision_point: Point, touch_point: Point| Collision {
        body: body.handle,
        line_index,
        tag: line.tag,
        kind,
        origin: body.position,
        velocity: body.velocity,
        collision_point,
        touch_point,
    };

    let mut collisions = Vec::with_capacity(3);

    // Endpoints first: they are the only contacts when the path is parallel
    for endpoint in [line.p1, line.p2] {
        let closest = ray.closest_point(endpoint);
        let d = closest.distance(endpoint);
        if d < body.radius {
            let offset = (body.radius * body.radius - d * d).sqrt();
            collisions.push(make(CollisionKind::Endpoint, closest - dir * offset, endpoint));
        }
    }

    if let Some(collision) = face_contact(body, line, &ray) {
        collisions.push(make(CollisionKind::Face, collision.0, collision.1));
    }

    collisions.retain(Collision::is_valid);
    collisions.sort_by(|a, b| a.distance().total_cmp(&b.distance()));
    collisions
}

/// Contact with the segment's face as `(collision_point, touch_point)`
fn face_contact(body: &Body, line: &Line, ray: &Line) -> Option<(Point, Point)> {
    let intersection = line.intersection_point(ray)?;

    let ball_closest = line.closest_point(body.position);
    let ball_distance = ball_closest.distance(body.position);
    if ball_distance <= EPSILON {
        // Centre on the line: no finite contact offset
        return None;
    }

    let ratio = body.radius / ball_distance;
    let touch_point = intersection - (intersection - ball_closest) * ratio;
    if !line.point_on_line(touch_point) {
        // Contact would be off the segment; the endpoint case covers it
        return None;
    }

    let touch_to_intersection = touch_point.distance(intersection);
    let back = (body.radius * body.radius + touch_to_intersection * touch_to_intersection).sqrt();
    let collision_point = intersection - body.velocity.unit_vector() * back;

    Some((collision_point, touch_point))
}
