//! Force and field passes over worker-owned particle ranges.
//!
//! Each pass covers one contiguous chunk of the reordered particle arrays,
//! starting at global index `base`. Cross-particle reads (predicted
//! positions, densities, velocity snapshots) go through shared slices that no
//! worker writes for the duration of the pass.

use glam::Vec3;

use crate::config::SphConfig;
use crate::kernels::Kernels;
use crate::spatial::SpatialHash;

/// Densities below this are clamped before division.
const MIN_DENSITY: f32 = 1e-6;
/// Below this separation the pair direction degenerates to zero.
const MIN_SEPARATION: f32 = 1e-6;
/// Particles with fewer neighbors than this count as airborne spray.
const AIRBORNE_NEIGHBOR_COUNT: usize = 8;
/// Velocity fraction shed per second while airborne.
const AIRBORNE_DRAG: f32 = 0.75;

/// Apply gravity and project each particle's predicted position.
pub fn integrate_external_forces(
    dt: f32,
    gravity: f32,
    positions: &[Vec3],
    velocities: &mut [Vec3],
    predicted: &mut [Vec3],
) {
    for ((position, velocity), predicted) in positions
        .iter()
        .zip(velocities.iter_mut())
        .zip(predicted.iter_mut())
    {
        velocity.y += gravity * dt;
        *predicted = *position + *velocity * dt;
    }
}

/// Accumulate density and near-density for the chunk starting at `base`.
///
/// A particle is its own neighbor, so both sums are always positive.
pub fn density_pass(
    grid: &SpatialHash,
    kernels: &Kernels,
    predicted: &[Vec3],
    densities: &mut [f32],
    near_densities: &mut [f32],
    base: usize,
) {
    let radius_sq = kernels.support_radius_sq();

    for local in 0..densities.len() {
        let origin = predicted[base + local];
        let mut density = 0.0;
        let mut near_density = 0.0;

        for neighbor in grid.neighborhood(grid.cell_of(origin)) {
            let offset = predicted[neighbor] - origin;
            let distance_sq = offset.length_squared();
            if distance_sq <= radius_sq {
                let distance = distance_sq.sqrt();
                density += kernels.density(distance);
                near_density += kernels.near_density(distance);
            }
        }

        densities[local] = density;
        near_densities[local] = near_density;
    }
}

/// Apply the dual-pressure impulse to the chunk's velocities.
pub fn pressure_pass(
    dt: f32,
    config: &SphConfig,
    kernels: &Kernels,
    grid: &SpatialHash,
    predicted: &[Vec3],
    densities: &[f32],
    near_densities: &[f32],
    velocities: &mut [Vec3],
    base: usize,
) {
    let radius_sq = kernels.support_radius_sq();

    for local in 0..velocities.len() {
        let i = base + local;
        let origin = predicted[i];
        let pressure = config.pressure_from_density(densities[i]);
        let near_pressure = config.near_pressure_from_density(near_densities[i]);
        let mut force = Vec3::ZERO;
        let mut neighbor_count = 0;

        for j in grid.neighborhood(grid.cell_of(origin)) {
            if j == i {
                continue;
            }
            let to_neighbor = predicted[j] - origin;
            let distance_sq = to_neighbor.length_squared();
            if distance_sq > radius_sq {
                continue;
            }

            let distance = distance_sq.sqrt();
            let direction = if distance > MIN_SEPARATION {
                to_neighbor / distance
            } else {
                Vec3::ZERO
            };

            let shared_pressure =
                (pressure + config.pressure_from_density(densities[j])) * 0.5;
            // The near term reads the neighbor's density, not its near-density.
            let shared_near_pressure =
                (near_pressure + config.near_pressure_from_density(densities[j])) * 0.5;

            force +=
                direction * (kernels.density_derivative(distance) * shared_pressure / densities[j]);
            force += direction
                * (kernels.near_density_derivative(distance) * shared_near_pressure
                    / near_densities[j].max(MIN_DENSITY));
            neighbor_count += 1;
        }

        let acceleration = force / densities[i].max(MIN_DENSITY);
        velocities[local] += acceleration * dt;

        // Airborne drag.
        if neighbor_count < AIRBORNE_NEIGHBOR_COUNT {
            velocities[local] -= velocities[local] * dt * AIRBORNE_DRAG;
        }
    }
}

/// Smooth chunk velocities toward the neighborhood average of the snapshot.
pub fn viscosity_pass(
    dt: f32,
    viscosity_strength: f32,
    kernels: &Kernels,
    grid: &SpatialHash,
    predicted: &[Vec3],
    snapshot: &[Vec3],
    velocities: &mut [Vec3],
    base: usize,
) {
    let radius_sq = kernels.support_radius_sq();

    for local in 0..velocities.len() {
        let i = base + local;
        let origin = predicted[i];
        let own_velocity = snapshot[i];
        let mut force = Vec3::ZERO;

        for j in grid.neighborhood(grid.cell_of(origin)) {
            let offset = predicted[j] - origin;
            let distance_sq = offset.length_squared();
            if distance_sq <= radius_sq {
                force += (snapshot[j] - own_velocity) * kernels.poly6(distance_sq.sqrt());
            }
        }

        velocities[local] += force * viscosity_strength * dt;
    }
}
