//! Position integration and boundary collision handling.

use glam::Vec3;

/// Advance positions by one Euler step and resolve wall collisions against
/// the half-extent box centered at the origin.
///
/// A particle reaching a face is clamped onto it and its normal velocity is
/// reversed, scaled by `collision_damping`. A particle sitting exactly on
/// zero counts as being on the positive side.
pub fn update_positions(
    dt: f32,
    bounds: Vec3,
    collision_damping: f32,
    positions: &mut [Vec3],
    velocities: &mut [Vec3],
) {
    for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
        *position += *velocity * dt;

        for axis in 0..3 {
            let half = bounds[axis];
            if half - position[axis].abs() <= 0.0 {
                let sign = if position[axis] >= 0.0 { 1.0 } else { -1.0 };
                position[axis] = half * sign;
                velocity[axis] *= -collision_damping;
            }
        }
    }
}
