//! Deterministic simulation module
//!
//! All collision logic lives here. This module must be pure and deterministic:
//! - Exact collision moments, no sampling
//! - Stable iteration order (by body handle, then segment index)
//! - No rendering or platform dependencies

pub mod collision;
pub mod geometry;
pub mod interaction;
pub mod state;
pub mod tick;

pub use collision::{Collision, CollisionKind};
pub use geometry::{Line, LineTag, Point, Vector, VectorExt, Wall};
pub use interaction::solve;
pub use state::{Body, BodyHandle, Environment, PendingCollision};
pub use tick::{CollisionEvent, TickReport};
