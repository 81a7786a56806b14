//! Fixed timestep simulation tick
//!
//! A tick resolves every collision that falls inside it, earliest first,
//! moving all bodies up to each collision moment before resolving it. Each
//! resolution reschedules only the body involved. Whatever time is left
//! after the last collision is integrated in one go.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collision::CollisionKind;
use super::geometry::{LineTag, Point, Vector};
use super::state::{BodyHandle, Environment};

/// A collision resolved during a tick, for the caller to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub body: BodyHandle,
    /// Index of the struck segment at the time of the collision
    pub line_index: usize,
    pub tag: LineTag,
    pub kind: CollisionKind,
    /// Exact point of contact on the segment
    pub touch_point: Point,
    /// Body centre at the moment of contact
    pub collision_point: Point,
    /// Velocity after the bounce (efficiency applied)
    pub velocity: Vector,
    /// Time into the tick at which the collision happened
    pub at: f64,
}

/// Everything that happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Resolved collisions in the order they happened
    pub collisions: Vec<CollisionEvent>,
    /// Bodies removed for exceeding the per-tick collision budget
    pub evicted: Vec<BodyHandle>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.evicted.is_empty()
    }
}

impl Environment {
    /// Advance by the configured step size
    pub fn tick(&mut self) -> TickReport {
        self.advance(self.config.step_size)
    }

    /// Advance the simulation by `dt`
    pub fn advance(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("Ignoring advance by {}", dt);
            return report;
        }

        self.tick_elapsed = 0.0;
        if self.config.gravity_enabled {
            self.apply_gravity(dt);
        }

        let budget = self.config.max_collisions_per_body;
        let efficiency = self.config.collision_efficiency;
        let mut resolved: BTreeMap<BodyHandle, u32> = BTreeMap::new();

        while self.pending.first().is_some_and(|p| p.due < dt) {
            let event = self.pending.remove(0);
            let collision = event.collision;
            let handle = collision.body;

            // Everyone travels up to the collision moment
            let slice = (event.due - self.tick_elapsed).max(0.0);
            self.integrate(slice);
            self.tick_elapsed += slice;

            let velocity = collision.reflect() * efficiency;
            let Some(body) = self.bodies.iter_mut().find(|b| b.handle == handle) else {
                continue;
            };
            body.position = collision.collision_point;
            body.velocity = velocity;

            log::debug!(
                "Body {} hit {:?} ({:?}) at {} t+{:.6}",
                handle,
                collision.tag,
                collision.kind,
                collision.touch_point,
                self.tick_elapsed
            );
            report.collisions.push(CollisionEvent {
                body: handle,
                line_index: collision.line_index,
                tag: collision.tag,
                kind: collision.kind,
                touch_point: collision.touch_point,
                collision_point: collision.collision_point,
                velocity,
                at: self.tick_elapsed,
            });

            self.schedule(handle);

            let count = resolved.entry(handle).or_insert(0);
            *count += 1;
            let again_this_tick = self
                .pending
                .iter()
                .any(|p| p.collision.body == handle && p.due < dt);
            if *count >= budget && again_this_tick {
                log::warn!(
                    "Body {} exceeded {} collisions in one tick, evicting",
                    handle,
                    budget
                );
                self.remove_body(handle);
                report.evicted.push(handle);
            }
        }

        // No collision left this tick
        let rest = dt - self.tick_elapsed;
        if rest > 0.0 {
            self.integrate(rest);
        }

        for pending in &mut self.pending {
            pending.due = (pending.due - dt).max(0.0);
        }
        self.tick_elapsed = 0.0;
        self.time += dt;

        report
    }

    /// Move every body along its velocity for `dt`
    fn integrate(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        for body in &mut self.bodies {
            body.advance(dt);
        }
    }

    /// Pull every body down, then rebuild the queue since every path changed
    fn apply_gravity(&mut self, dt: f64) {
        let dv = self.config.gravity_increment(dt);
        for body in &mut self.bodies {
            body.velocity.y -= dv;
        }
        self.recalculate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use proptest::prelude::*;

    use crate::settings::EnvironmentConfig;
    use crate::sim::geometry::{Line, Wall};

    fn arena(step: f64) -> Environment {
        Environment::create(10.0, 10.0, step, false).unwrap()
    }

    #[test]
    fn test_bounce_off_floor() {
        let mut env = arena(0.1);
        let h = env.add_body(DVec2::new(5.0, 0.2), DVec2::new(0.0, -1.0), 0.2).unwrap();

        let report = env.tick();
        assert_eq!(report.collisions.len(), 1);
        let hit = &report.collisions[0];
        assert_eq!(hit.body, h);
        assert_eq!(hit.tag, LineTag::Boundary(Wall::Bottom));
        assert_eq!(hit.kind, CollisionKind::Face);
        assert!(hit.touch_point.distance(DVec2::new(5.0, 0.0)) < 1e-12);
        assert!((hit.velocity - DVec2::new(0.0, 1.0)).length() < 1e-12);

        // Bounced straight back up for the whole step
        let body = env.body(h).unwrap();
        assert!((body.velocity - DVec2::new(0.0, 1.0)).length() < 1e-12);
        assert!(body.position.distance(DVec2::new(5.0, 0.3)) < 1e-12);
    }

    #[test]
    fn test_mid_step_collision_integrates_both_sides() {
        let mut env = arena(1.0);
        let h = env.add_body(DVec2::new(5.0, 0.7), DVec2::new(0.0, -1.0), 0.2).unwrap();
        let report = env.tick();
        assert_eq!(report.collisions.len(), 1);
        assert!((report.collisions[0].at - 0.5).abs() < 1e-12);
        // 0.5 down to the wall, 0.5 back up
        let body = env.body(h).unwrap();
        assert!(body.position.distance(DVec2::new(5.0, 0.7)) < 1e-12);
        assert!((env.time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_other_bodies_move_during_collision_slices() {
        let mut env = arena(1.0);
        let bouncer = env.add_body(DVec2::new(2.0, 0.7), DVec2::new(0.0, -1.0), 0.2).unwrap();
        let cruiser = env.add_body(DVec2::new(5.0, 5.0), DVec2::new(1.0, 0.0), 0.2).unwrap();
        env.tick();
        assert!(env.body(bouncer).unwrap().position.distance(DVec2::new(2.0, 0.7)) < 1e-12);
        assert!(env.body(cruiser).unwrap().position.distance(DVec2::new(6.0, 5.0)) < 1e-12);
    }

    #[test]
    fn test_stationary_body_never_moves() {
        let mut env = arena(0.5);
        let h = env.add_body(DVec2::new(3.0, 3.0), DVec2::ZERO, 0.4).unwrap();
        for _ in 0..10 {
            let report = env.tick();
            assert!(report.is_empty());
        }
        assert_eq!(env.body(h).unwrap().position, DVec2::new(3.0, 3.0));
        assert!(env.pending().is_empty());
    }

    #[test]
    fn test_corner_resolves_both_walls_in_one_tick() {
        let mut env = arena(1.0);
        let h = env.add_body(DVec2::new(0.6, 0.6), DVec2::new(-1.0, -1.0), 0.1).unwrap();
        let report = env.tick();
        let tags: Vec<_> = report.collisions.iter().map(|c| c.tag).collect();
        assert_eq!(report.collisions.len(), 2);
        assert!(tags.contains(&LineTag::Boundary(Wall::Bottom)));
        assert!(tags.contains(&LineTag::Boundary(Wall::Left)));
        let body = env.body(h).unwrap();
        assert!((body.velocity - DVec2::new(1.0, 1.0)).length() < 1e-9);
        assert!(body.position.distance(DVec2::new(0.6, 0.6)) < 1e-9);
    }

    #[test]
    fn test_endpoint_graze_on_obstacle() {
        let mut env = arena(1.0);
        let post = Line::obstacle(DVec2::new(2.0, 1.0), DVec2::new(2.0, 4.0), 9).unwrap();
        env.set_segments(vec![post]).unwrap();
        let h = env.add_body(DVec2::new(2.5, 4.05), DVec2::new(-1.0, 0.0), 0.1).unwrap();

        let report = env.tick();
        assert_eq!(report.collisions.len(), 1);
        let hit = &report.collisions[0];
        assert_eq!(hit.kind, CollisionKind::Endpoint);
        assert_eq!(hit.tag, LineTag::Obstacle(9));
        assert_eq!(hit.touch_point, DVec2::new(2.0, 4.0));
        // Deflected up and back to the right, speed unchanged
        let body = env.body(h).unwrap();
        assert!(body.velocity.x > 0.0 && body.velocity.y > 0.0);
        assert!((body.speed() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_collision_efficiency_damps_speed() {
        let config = EnvironmentConfig {
            width: 10.0,
            height: 10.0,
            step_size: 1.0,
            collision_efficiency: 0.5,
            ..Default::default()
        };
        let mut env = Environment::new(config).unwrap();
        let h = env.add_body(DVec2::new(5.0, 0.7), DVec2::new(0.0, -2.0), 0.2).unwrap();
        env.tick();
        let body = env.body(h).unwrap();
        assert!((body.velocity - DVec2::new(0.0, 1.0)).length() < 1e-12);
        // 0.25 down at speed 2, 0.75 up at speed 1
        assert!(body.position.distance(DVec2::new(5.0, 0.95)) < 1e-12);
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut env = Environment::create(10.0, 10.0, 0.1, true).unwrap();
        let h = env.add_body(DVec2::new(5.0, 5.0), DVec2::new(1.0, 0.0), 0.2).unwrap();
        env.tick();
        let body = env.body(h).unwrap();
        assert!((body.velocity.y + 0.1).abs() < 1e-12);
        assert!(body.position.y < 5.0);
        // Queue rebuilt for the new path
        let next = &env.pending()[0];
        assert_eq!(next.collision.velocity, body.velocity);
    }

    #[test]
    fn test_runaway_body_is_evicted() {
        // A slot barely wider than the body: it ping-pongs many times per tick
        let config = EnvironmentConfig {
            width: 10.0,
            height: 10.0,
            step_size: 1.0,
            max_collisions_per_body: 5,
            ..Default::default()
        };
        let mut env = Environment::new(config).unwrap();
        let left = Line::obstacle(DVec2::new(5.0, 1.0), DVec2::new(5.0, 9.0), 1).unwrap();
        let right = Line::obstacle(DVec2::new(5.25, 1.0), DVec2::new(5.25, 9.0), 2).unwrap();
        env.set_segments(vec![left, right]).unwrap();
        let h = env.add_body(DVec2::new(5.125, 5.0), DVec2::new(1.0, 0.0), 0.1).unwrap();

        let report = env.tick();
        assert_eq!(report.evicted, vec![h]);
        assert_eq!(report.collisions.len(), 5);
        assert!(env.body(h).is_none());
        assert!(env.pending().is_empty());
    }

    #[test]
    fn test_recalculate_after_obstacle_removed() {
        let mut env = arena(1.0);
        let brick = Line::obstacle(DVec2::new(4.0, 3.0), DVec2::new(6.0, 3.0), 5).unwrap();
        env.set_segments(vec![brick]).unwrap();
        let h = env.add_body(DVec2::new(5.0, 4.0), DVec2::new(0.0, -1.0), 0.2).unwrap();
        env.remove_obstacle(5);
        let report = env.tick();
        assert!(report.collisions.is_empty());
        assert!(env.body(h).unwrap().position.distance(DVec2::new(5.0, 3.0)) < 1e-12);
    }

    #[test]
    fn test_ignores_non_positive_step() {
        let mut env = arena(1.0);
        let h = env.add_body(DVec2::new(5.0, 5.0), DVec2::new(1.0, 0.0), 0.2).unwrap();
        assert!(env.advance(0.0).is_empty());
        assert!(env.advance(-1.0).is_empty());
        assert_eq!(env.body(h).unwrap().position, DVec2::new(5.0, 5.0));
        assert_eq!(env.time(), 0.0);
    }

    #[test]
    fn test_snapshot_continues_identically() {
        let mut env = arena(0.05);
        env.add_body(DVec2::new(1.0, 2.0), DVec2::new(3.0, 1.7), 0.2).unwrap();
        env.add_body(DVec2::new(7.0, 8.0), DVec2::new(-2.2, -4.1), 0.35).unwrap();
        for _ in 0..20 {
            env.tick();
        }

        let json = serde_json::to_string(&env).unwrap();
        let mut restored: Environment = serde_json::from_str(&json).unwrap();
        for _ in 0..40 {
            let a = env.tick();
            let b = restored.tick();
            assert_eq!(a, b);
        }
        assert_eq!(env.bodies(), restored.bodies());
    }

    proptest! {
        #[test]
        fn prop_bodies_stay_in_arena(
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
            vx in -5.0f64..5.0,
            vy in -5.0f64..5.0,
            radius in 0.05f64..0.5,
        ) {
            let mut env = arena(0.1);
            let span = 10.0 - 2.0 * radius - 0.02;
            let start = DVec2::new(radius + 0.01 + fx * span, radius + 0.01 + fy * span);
            let h = env.add_body(start, DVec2::new(vx, vy), radius).unwrap();
            let speed = env.body(h).unwrap().speed();

            for _ in 0..50 {
                let report = env.tick();
                for event in &report.collisions {
                    prop_assert!(event.at >= 0.0 && event.at <= 0.1);
                }
                let Some(body) = env.body(h) else { break };
                let tol = 1e-6;
                prop_assert!(body.position.x >= radius - tol && body.position.x <= 10.0 - radius + tol);
                prop_assert!(body.position.y >= radius - tol && body.position.y <= 10.0 - radius + tol);
                prop_assert!((body.speed() - speed).abs() < 1e-9 * speed.max(1.0));
            }
        }
    }
}
