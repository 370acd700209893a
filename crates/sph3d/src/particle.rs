//! Particle representation and box seeding.

use glam::Vec3;
use rand::Rng;

/// A single particle in the SPH simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle3D {
    /// World position.
    pub position: Vec3,
    /// Position projected for the current step; equals `position` on
    /// construction, used for neighbor search and force evaluation.
    pub predicted: Vec3,
    /// Current velocity.
    pub velocity: Vec3,
    /// Density accumulated from the smoothing kernel.
    pub density: f32,
    /// Sharper short-range density feeding the repulsion term.
    pub near_density: f32,
}

impl Particle3D {
    /// Create a particle with the given position and velocity.
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            predicted: position,
            velocity,
            density: 0.0,
            near_density: 0.0,
        }
    }

    /// Create a stationary particle at the given position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO)
    }
}

impl Default for Particle3D {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// Seed `count` stationary particles uniformly inside a cube of side
/// `box_size` centered at the origin.
///
/// `margin` insets every face (clamped to the half extent) and
/// `min_height_ratio` raises the sampling floor to
/// `max(-box_size/2 + margin, min_height_ratio · box_size/2)`. When the
/// vertical band inverts, particles land on its upper edge.
pub fn spawn_particles_in_box(
    count: usize,
    box_size: f32,
    margin: f32,
    min_height_ratio: f32,
    rng: &mut impl Rng,
) -> Vec<Particle3D> {
    let half = box_size * 0.5;
    let margin = margin.clamp(0.0, half);
    let max_y = half - margin;
    let mut min_y = (-half + margin).max(min_height_ratio * half);
    if min_y > max_y {
        min_y = max_y;
    }

    (0..count)
        .map(|_| {
            let position = Vec3::new(
                rng.gen_range(-half + margin..=half - margin),
                rng.gen_range(min_y..=max_y),
                rng.gen_range(-half + margin..=half - margin),
            );
            Particle3D::at(position)
        })
        .collect()
}
