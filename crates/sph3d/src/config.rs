//! Simulation parameters, validation, and pressure response.

use glam::Vec3;
use thiserror::Error;

use crate::constants::{GRAVITY, WATER_DENSITY};

/// Rejection reasons for an [`SphConfig`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("smoothing radius must be positive and finite, got {0}")]
    InvalidSmoothingRadius(f32),
    #[error("collision damping must lie in [0, 1], got {0}")]
    InvalidCollisionDamping(f32),
    #[error("bounds half-extents must be positive, got ({0}, {1}, {2})")]
    InvalidBounds(f32, f32, f32),
}

/// Tunable simulation parameters.
///
/// Immutable within a step; replaced atomically between steps via
/// [`crate::SphSimulation3D::set_config`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphConfig {
    /// Scalar acceleration applied to the y velocity component each step.
    pub gravity: f32,
    /// Kernel cutoff distance; also the cell size of the spatial index.
    pub smoothing_radius: f32,
    /// Reference density; pressure is proportional to the deviation from it.
    pub target_density: f32,
    /// Gain on `density - target_density`.
    pub pressure_multiplier: f32,
    /// Gain on the short-range near-density repulsion.
    pub near_pressure_multiplier: f32,
    /// 0 disables the viscosity pass entirely.
    pub viscosity_strength: f32,
    /// Fraction of normal velocity preserved (and reversed) on a wall hit.
    pub collision_damping: f32,
    /// Half-extents of the confining box, centered at the origin.
    pub bounds: Vec3,
}

impl Default for SphConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            smoothing_radius: 0.2,
            target_density: WATER_DENSITY,
            pressure_multiplier: 30.0,
            near_pressure_multiplier: 25.0,
            viscosity_strength: 0.035,
            collision_damping: 0.85,
            bounds: Vec3::ONE,
        }
    }
}

impl SphConfig {
    /// Check that the parameters describe a runnable simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_radius > 0.0 && self.smoothing_radius.is_finite()) {
            return Err(ConfigError::InvalidSmoothingRadius(self.smoothing_radius));
        }
        if !(self.collision_damping >= 0.0 && self.collision_damping <= 1.0) {
            return Err(ConfigError::InvalidCollisionDamping(self.collision_damping));
        }
        if !(self.bounds.x > 0.0 && self.bounds.y > 0.0 && self.bounds.z > 0.0) {
            return Err(ConfigError::InvalidBounds(
                self.bounds.x,
                self.bounds.y,
                self.bounds.z,
            ));
        }
        Ok(())
    }

    /// Pressure response to a density deviation from the target.
    #[inline]
    pub fn pressure_from_density(&self, density: f32) -> f32 {
        (density - self.target_density) * self.pressure_multiplier
    }

    /// Short-range repulsive pressure from the near density.
    #[inline]
    pub fn near_pressure_from_density(&self, near_density: f32) -> f32 {
        near_density * self.near_pressure_multiplier
    }
}
