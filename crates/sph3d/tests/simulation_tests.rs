//! End-to-end simulation scenarios.
//!
//! Each test drives the full engine through real steps and checks the
//! physical behavior and invariants the solver is supposed to maintain.

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sph3d::{spawn_particles_in_box, Particle3D, SphConfig, SphSimulation3D};

const DT: f32 = 1.0 / 60.0;

/// Config with every force disabled; a baseline several scenarios start from.
fn quiet_config() -> SphConfig {
    SphConfig {
        gravity: 0.0,
        target_density: 0.0,
        pressure_multiplier: 0.0,
        near_pressure_multiplier: 0.0,
        viscosity_strength: 0.0,
        ..SphConfig::default()
    }
}

fn assert_invariants(sim: &SphSimulation3D) {
    let bounds = sim.config().bounds;
    for (i, position) in sim.positions().iter().enumerate() {
        assert!(position.is_finite(), "position {} is not finite: {:?}", i, position);
        assert!(
            position.abs().cmple(bounds + Vec3::splat(1e-5)).all(),
            "particle {} escaped the box: {:?}",
            i,
            position
        );
    }
    for (i, velocity) in sim.velocities().iter().enumerate() {
        assert!(velocity.is_finite(), "velocity {} is not finite: {:?}", i, velocity);
    }
    for &density in sim.densities() {
        assert!(density.is_finite());
    }
    for &near_density in sim.near_densities() {
        assert!(near_density.is_finite());
    }

    let n = sim.len();
    let index = sim.spatial_index();
    assert_eq!(index.keys().len(), n);
    assert_eq!(index.offsets().len(), n);
    for (i, &key) in index.keys().iter().enumerate() {
        assert!((key as usize) < n, "key {} out of range at {}", key, i);
        assert!(
            index.offsets()[key as usize] as usize <= i,
            "offset for key {} exceeds index {}",
            key,
            i
        );
    }
}

fn sorted_positions(positions: &[Vec3]) -> Vec<Vec3> {
    let mut sorted = positions.to_vec();
    sorted.sort_by(|a, b| {
        a.x.total_cmp(&b.x)
            .then(a.y.total_cmp(&b.y))
            .then(a.z.total_cmp(&b.z))
    });
    sorted
}

/// One particle under gravity alone follows the Euler update. The isolated
/// particle also takes the airborne-drag bleed, hence the tolerances.
#[test]
fn test_free_fall() {
    let config = SphConfig {
        pressure_multiplier: 0.0,
        near_pressure_multiplier: 0.0,
        viscosity_strength: 0.0,
        ..SphConfig::default()
    };
    let particles = vec![Particle3D::at(Vec3::new(0.0, 0.5, 0.0))];
    let mut sim = SphSimulation3D::new(config, particles).unwrap();

    sim.step(DT).unwrap();

    let velocity = sim.velocities()[0];
    let position = sim.positions()[0];
    assert!(
        (velocity.y - (-0.1635)).abs() < 2.5e-3,
        "velocity.y = {}",
        velocity.y
    );
    assert!(
        (position.y - 0.49728).abs() < 5e-5,
        "position.y = {}",
        position.y
    );
    assert_eq!(velocity.x, 0.0);
    assert_eq!(velocity.z, 0.0);
}

/// A particle driven into the floor is clamped onto it with its normal
/// velocity reversed and damped.
#[test]
fn test_floor_bounce() {
    let config = SphConfig {
        collision_damping: 0.5,
        ..quiet_config()
    };
    let particles = vec![Particle3D::new(
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, -2.0, 0.0),
    )];
    let mut sim = SphSimulation3D::new(config, particles).unwrap();

    sim.step(DT).unwrap();

    assert_eq!(
        sim.positions()[0].y,
        -1.0,
        "particle must be clamped onto the floor"
    );
    let vy = sim.velocities()[0].y;
    assert!(
        (vy - 1.0).abs() < 0.02,
        "bounce should reverse half the speed, got {}",
        vy
    );
}

/// Two overlapping particles repel with exactly opposite x velocities.
#[test]
fn test_pair_repulsion() {
    let config = SphConfig {
        gravity: 0.0,
        target_density: 0.0,
        pressure_multiplier: 100.0,
        viscosity_strength: 0.0,
        ..SphConfig::default()
    };
    let particles = vec![
        Particle3D::at(Vec3::new(-0.05, 0.0, 0.0)),
        Particle3D::at(Vec3::new(0.05, 0.0, 0.0)),
    ];
    let mut sim = SphSimulation3D::with_thread_count(config, particles, 1).unwrap();

    sim.step(1.0 / 600.0).unwrap();

    // The engine reorders its arrays; identify the pair by x sign.
    let mut left = None;
    let mut right = None;
    for (position, velocity) in sim.positions().iter().zip(sim.velocities()) {
        if position.x < 0.0 {
            left = Some(*velocity);
        } else {
            right = Some(*velocity);
        }
    }
    let (left, right) = (left.expect("left particle"), right.expect("right particle"));

    assert!(
        left.x < 0.0 && right.x > 0.0,
        "pair must repel: {} vs {}",
        left.x,
        right.x
    );
    assert!(
        (left.x.abs() - right.x.abs()).abs() < 1e-5,
        "repulsion must be symmetric: {} vs {}",
        left.x,
        right.x
    );
    assert_eq!(left.y, 0.0);
    assert_eq!(left.z, 0.0);
}

/// Mirror-image particles receive opposite pressure forces of equal
/// magnitude (single worker, viscosity and gravity off).
#[test]
fn test_two_body_symmetry() {
    let config = SphConfig {
        gravity: 0.0,
        viscosity_strength: 0.0,
        ..SphConfig::default()
    };
    let offset = Vec3::new(0.03, 0.04, 0.0);
    let particles = vec![Particle3D::at(offset), Particle3D::at(-offset)];
    let mut sim = SphSimulation3D::with_thread_count(config, particles, 1).unwrap();

    sim.step(DT).unwrap();

    let a = sim.velocities()[0];
    let b = sim.velocities()[1];
    assert!(
        a.length() > 0.0,
        "the pair is inside the kernel support and must feel pressure"
    );
    assert!(
        (a + b).length() < 1e-5,
        "forces must be opposite: {:?} vs {:?}",
        a,
        b
    );
}

/// With every force disabled and zero velocities, positions do not move.
/// The engine reorders its arrays, so positions are compared as a multiset.
#[test]
fn test_idle_kernel() {
    let config = SphConfig {
        collision_damping: 1.0,
        ..quiet_config()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let particles = spawn_particles_in_box(100, 2.0, 0.1, 0.0, &mut rng);
    let initial: Vec<Vec3> = particles.iter().map(|p| p.position).collect();
    let initial = sorted_positions(&initial);

    let mut sim = SphSimulation3D::new(config, particles).unwrap();
    for _ in 0..60 {
        sim.step(DT).unwrap();
    }

    let after = sorted_positions(sim.positions());
    assert_eq!(initial.len(), after.len());
    for (before, now) in initial.iter().zip(&after) {
        assert_eq!(
            before, now,
            "positions must not drift with all forces disabled"
        );
    }
}

/// 2000 randomly seeded particles with the default config stay inside the
/// box, and every buffer/index invariant holds, across 300 steps.
#[test]
fn test_containment_stress() {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let particles = spawn_particles_in_box(2000, 2.0, 0.05, 0.0, &mut rng);
    let mut sim = SphSimulation3D::new(SphConfig::default(), particles).unwrap();

    for _ in 0..300 {
        sim.step(DT).unwrap();
        assert_invariants(&sim);
    }
}

/// The same seed stepped with one worker and with eight produces matching
/// per-particle positions within a loose tolerance.
#[test]
fn test_thread_invariance() {
    let run = |threads: usize| {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let particles = spawn_particles_in_box(400, 2.0, 0.1, 0.0, &mut rng);
        let mut sim =
            SphSimulation3D::with_thread_count(SphConfig::default(), particles, threads).unwrap();
        for _ in 0..60 {
            sim.step(DT).unwrap();
        }
        sim.particles()
    };

    let single = run(1);
    let eight = run(8);
    assert_eq!(single.len(), eight.len());
    for (i, (a, b)) in single.iter().zip(&eight).enumerate() {
        assert!(
            (a.position - b.position).length() < 1e-3,
            "particle {} diverged across thread counts: {:?} vs {:?}",
            i,
            a.position,
            b.position
        );
    }
}

/// Disabling viscosity skips the snapshot machinery but leaves the
/// simulation stable and contained.
#[test]
fn test_viscosity_toggle() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let particles = spawn_particles_in_box(300, 2.0, 0.1, 0.0, &mut rng);
    let config = SphConfig {
        viscosity_strength: 0.0,
        ..SphConfig::default()
    };
    let mut sim = SphSimulation3D::new(config, particles).unwrap();

    for _ in 0..60 {
        sim.step(DT).unwrap();
        assert_invariants(&sim);
    }
}
