//! Environment state and core simulation types
//!
//! Bodies live in a vector sorted by handle. Handles come from a monotonic
//! counter and are never reused, so a stale handle simply stops resolving.
//! The pending queue holds at most one collision per body, sorted by due time.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::collision::Collision;
use super::geometry::{Line, Point, Vector, VectorExt};
use super::interaction::solve;
use crate::consts::EPSILON;
use crate::error::{EngineError, EngineResult};
use crate::is_finite;
use crate::settings::EnvironmentConfig;

/// Stable identity of a body in an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A moving circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub handle: BodyHandle,
    pub position: Point,
    pub velocity: Vector,
    pub radius: f64,
}

impl Body {
    pub fn new(handle: BodyHandle, position: Point, velocity: Vector, radius: f64) -> EngineResult<Self> {
        let body = Self {
            handle,
            position,
            velocity,
            radius,
        };
        body.validate()?;
        Ok(body)
    }

    fn validate(&self) -> EngineResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "body radius must be positive, got {}",
                self.radius
            )));
        }
        if !is_finite(self.position) || !is_finite(self.velocity) {
            return Err(EngineError::InvalidGeometry(format!(
                "body state must be finite: pos {} vel {}",
                self.position, self.velocity
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// True if the body is not moving (it can never collide)
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.speed() <= EPSILON
    }

    /// Move `distance` along the direction of travel
    pub fn move_forward(&mut self, distance: f64) {
        self.position += self.velocity.unit_vector() * distance;
    }

    /// Move for `dt` units of time at the current velocity
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.move_forward(dt * self.speed());
    }
}

/// A queued collision and when it happens, relative to the start of the current tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCollision {
    pub due: f64,
    pub collision: Collision,
}

/// Bodies, segments and the upcoming collision of every body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub(crate) config: EnvironmentConfig,
    /// Sorted by handle
    pub(crate) bodies: Vec<Body>,
    /// Boundary walls first, then obstacles
    pub(crate) lines: Vec<Line>,
    /// Sorted by due time, at most one entry per body
    pub(crate) pending: Vec<PendingCollision>,
    /// Total simulated time
    pub(crate) time: f64,
    /// Time already simulated inside the running tick
    #[serde(skip)]
    pub(crate) tick_elapsed: f64,
    next_handle: u32,
}

impl Environment {
    /// Create an environment with its four boundary walls
    pub fn new(config: EnvironmentConfig) -> EngineResult<Self> {
        config.validate()?;
        let lines = Line::arena_boundary(config.width, config.height).to_vec();
        log::info!(
            "Environment {}x{} step={} gravity={}",
            config.width,
            config.height,
            config.step_size,
            config.gravity_enabled
        );
        Ok(Self {
            config,
            bodies: Vec::new(),
            lines,
            pending: Vec::new(),
            time: 0.0,
            tick_elapsed: 0.0,
            next_handle: 1,
        })
    }

    /// Shorthand for the common settings
    pub fn create(width: f64, height: f64, step_size: f64, gravity_enabled: bool) -> EngineResult<Self> {
        Self::new(EnvironmentConfig {
            width,
            height,
            step_size,
            gravity_enabled,
            ..EnvironmentConfig::default()
        })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Total simulated time
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.index_of(handle).map(|i| &self.bodies[i])
    }

    /// Every segment, boundary walls included
    pub fn segments(&self) -> &[Line] {
        &self.lines
    }

    /// Upcoming collisions, earliest first
    pub fn pending(&self) -> &[PendingCollision] {
        &self.pending
    }

    fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.bodies.binary_search_by_key(&handle, |b| b.handle).ok()
    }

    /// Spawn a body and schedule its first collision
    pub fn add_body(&mut self, position: Point, velocity: Vector, radius: f64) -> EngineResult<BodyHandle> {
        let handle = BodyHandle(self.next_handle);
        let body = Body::new(handle, position, velocity, radius)?;
        self.next_handle += 1;
        // Handles are monotonic, so pushing keeps the vector sorted
        self.bodies.push(body);
        self.schedule(handle);
        Ok(handle)
    }

    /// Remove a body and its pending collision
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let index = self.index_of(handle)?;
        self.pending.retain(|p| p.collision.body != handle);
        Some(self.bodies.remove(index))
    }

    /// Mutate a body; its next collision is recomputed afterwards
    pub fn update_body<F>(&mut self, handle: BodyHandle, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Body),
    {
        let index = self.index_of(handle).ok_or(EngineError::UnknownBody(handle))?;
        let mut body = self.bodies[index].clone();
        f(&mut body);
        body.handle = handle;
        body.validate()?;
        self.bodies[index] = body;
        self.schedule(handle);
        Ok(())
    }

    /// Replace the obstacle segments, keeping the boundary walls
    pub fn set_segments(&mut self, segments: Vec<Line>) -> EngineResult<()> {
        let segments = segments
            .into_iter()
            .map(|l| Line::tagged(l.p1, l.p2, l.tag))
            .collect::<EngineResult<Vec<_>>>()?;
        self.lines.retain(|l| l.tag.is_boundary());
        self.lines.extend(segments);
        self.recalculate();
        Ok(())
    }

    /// Add one segment
    pub fn add_segment(&mut self, segment: Line) -> EngineResult<()> {
        let segment = Line::tagged(segment.p1, segment.p2, segment.tag)?;
        self.lines.push(segment);
        self.recalculate();
        Ok(())
    }

    /// Remove every obstacle segment belonging to `owner`, returning how many went
    pub fn remove_obstacle(&mut self, owner: u64) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l.tag.owner() != Some(owner));
        let removed = before - self.lines.len();
        if removed > 0 {
            self.recalculate();
        }
        removed
    }

    /// Rebuild the whole pending queue from the current bodies and segments
    pub fn recalculate(&mut self) {
        let elapsed = self.tick_elapsed;
        self.pending = self
            .bodies
            .iter()
            .filter_map(|body| self.first_collision(body))
            .filter_map(|collision| {
                let due = elapsed + collision.time_left()?;
                Some(PendingCollision { due, collision })
            })
            .collect();
        self.sort_pending();
        log::debug!("Recalculated {} pending collisions", self.pending.len());
    }

    /// Recompute the pending collision of one body
    pub(crate) fn schedule(&mut self, handle: BodyHandle) {
        self.pending.retain(|p| p.collision.body != handle);
        let Some(body) = self.body(handle) else {
            return;
        };
        let Some(collision) = self.first_collision(body) else {
            log::trace!("Body {} has no upcoming collision", handle);
            return;
        };
        let Some(time_left) = collision.time_left() else {
            return;
        };
        let due = self.tick_elapsed + time_left;
        log::trace!("Body {} collides in {:.6} ({:?})", handle, time_left, collision.kind);

        let at = self
            .pending
            .partition_point(|p| (p.due, p.collision.body) <= (due, handle));
        self.pending.insert(at, PendingCollision { due, collision });
    }

    fn sort_pending(&mut self) {
        self.pending.sort_by(|a, b| {
            a.due
                .total_cmp(&b.due)
                .then(a.collision.body.cmp(&b.collision.body))
        });
    }

    /// Earliest collision of `body` against every segment
    pub(crate) fn first_collision(&self, body: &Body) -> Option<Collision> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| solve(body, line, i).into_iter().next())
            .min_by(|a, b| a.distance().total_cmp(&b.distance()))
    }

    /// The collision `handle` is heading for next, without changing anything
    pub fn query_next_collision(&self, handle: BodyHandle) -> Option<Collision> {
        self.first_collision(self.body(handle)?)
    }

    /// The nearest collision against each segment, nearest first
    pub fn query_collisions(&self, handle: BodyHandle) -> Vec<Collision> {
        let Some(body) = self.body(handle) else {
            return Vec::new();
        };
        let mut collisions: Vec<_> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| solve(body, line, i).into_iter().next())
            .collect();
        collisions.sort_by(|a, b| a.distance().total_cmp(&b.distance()));
        collisions
    }

    /// Trace a hypothetical body through up to `max_bounces` reflections.
    ///
    /// Returns the centre positions: the origin, then each collision point.
    /// Tracing stops early when nothing is hit or when `stop` returns true
    /// for the segment just struck. Nothing in the environment changes.
    pub fn preview_trajectory<F>(
        &self,
        origin: Point,
        velocity: Vector,
        radius: f64,
        max_bounces: usize,
        stop: F,
    ) -> EngineResult<Vec<Point>>
    where
        F: Fn(&Line) -> bool,
    {
        let mut ghost = Body::new(BodyHandle(u32::MAX), origin, velocity, radius)?;
        let mut path = vec![origin];

        for _ in 0..max_bounces {
            let Some(collision) = self.first_collision(&ghost) else {
                break;
            };
            path.push(collision.collision_point);
            if stop(&self.lines[collision.line_index]) {
                break;
            }
            ghost.velocity = collision.reflect();
            ghost.position = collision.collision_point;
        }

        Ok(path)
    }
}
