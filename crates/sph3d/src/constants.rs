//! Physical constants shared across the simulation.

/// Gravity magnitude (m/s²) - always positive, use for physics formulas.
pub const GRAVITY_MAGNITUDE: f32 = 9.81;

/// Gravity acceleration on the y axis (m/s²) - negative (downward).
/// Use for velocity updates: `v.y += GRAVITY * dt`.
pub const GRAVITY: f32 = -GRAVITY_MAGNITUDE;

/// Rest density of water (kg/m³); the default pressure target.
pub const WATER_DENSITY: f32 = 1000.0;
