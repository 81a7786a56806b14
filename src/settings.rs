//! Environment configuration
//!
//! Loaded from JSON by the host game; every field has a default so partial
//! documents are accepted.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{EngineError, EngineResult};

/// Simulation environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    // === Arena ===
    /// Arena width (boundary walls run from x = 0 to x = width)
    pub width: f64,
    /// Arena height (boundary walls run from y = 0 to y = height)
    pub height: f64,

    // === Timing ===
    /// Simulated time advanced by `Environment::tick`
    pub step_size: f64,

    // === Forces ===
    /// Apply downward acceleration every tick
    pub gravity_enabled: bool,
    /// Downward acceleration (velocity units per unit time)
    pub gravity: f64,

    // === Response ===
    /// Speed multiplier applied after each reflection (1.0 = perfectly elastic)
    pub collision_efficiency: f64,
    /// Same-tick collisions one body may resolve before it is evicted
    pub max_collisions_per_body: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,

            step_size: DEFAULT_STEP_SIZE,

            gravity_enabled: false,
            gravity: DEFAULT_GRAVITY,

            collision_efficiency: 1.0,
            max_collisions_per_body: DEFAULT_MAX_COLLISIONS_PER_BODY,
        }
    }
}

impl EnvironmentConfig {
    /// Config for an arena of the given size, everything else default
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse a JSON document and validate it
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if !self.gravity.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if !(self.collision_efficiency > 0.0 && self.collision_efficiency <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "collision_efficiency must be in (0, 1], got {}",
                self.collision_efficiency
            )));
        }
        if self.max_collisions_per_body == 0 {
            return Err(EngineError::InvalidConfig(
                "max_collisions_per_body must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Velocity change applied to every body over `dt` (zero when gravity is off)
    pub fn gravity_increment(&self, dt: f64) -> f64 {
        if self.gravity_enabled {
            self.gravity * dt
        } else {
            0.0
        }
    }
}
