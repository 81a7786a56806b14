//! Ricochet - continuous-time collision engine for circles and line segments
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, collision solving, environment tick)
//! - `settings`: Data-driven environment configuration
//! - `error`: Construction-time contract violations
//!
//! Collisions are computed exactly, not sampled: every body knows the precise
//! moment its surface first touches a segment, and a tick resolves every such
//! moment that falls inside it before integrating the leftover time.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{EngineError, EngineResult};
pub use settings::EnvironmentConfig;

use glam::DVec2;

/// Engine configuration constants
pub mod consts {
    /// Default simulation time advanced per tick
    pub const DEFAULT_STEP_SIZE: f64 = 0.005;
    /// Default arena dimensions (one unit per grid cell)
    pub const DEFAULT_WIDTH: f64 = 7.0;
    pub const DEFAULT_HEIGHT: f64 = 9.0;

    /// Downward acceleration applied when gravity is enabled
    pub const DEFAULT_GRAVITY: f64 = 1.0;

    /// Same-tick collisions a single body may resolve before it is evicted
    pub const DEFAULT_MAX_COLLISIONS_PER_BODY: u32 = 1000;

    /// Tolerance for projection parameters and zero-length checks
    pub const EPSILON: f64 = 1e-9;
    /// Relative determinant threshold below which two lines count as parallel
    pub const PARALLEL_EPSILON: f64 = 1e-12;
}

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// True if every component is finite
#[inline]
pub fn is_finite(v: DVec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}
