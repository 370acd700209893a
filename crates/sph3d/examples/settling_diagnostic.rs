//! Headless settling run: seed a block of fluid and watch it come to rest.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sph3d::{spawn_particles_in_box, SphConfig, SphSimulation3D};

fn main() {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(42);
    let particles = spawn_particles_in_box(2000, 2.0, 0.05, 0.0, &mut rng);
    let mut sim =
        SphSimulation3D::new(SphConfig::default(), particles).expect("default config is valid");

    println!("=== SETTLING DIAGNOSTIC ===");
    println!("particles: {}, workers: {}\n", sim.len(), sim.thread_count());

    let dt = 1.0 / 60.0;
    for frame in 0..600 {
        sim.step(dt).expect("step failed");

        if frame % 60 == 0 {
            let max_vel = sim
                .velocities()
                .iter()
                .map(|v| v.length())
                .fold(0.0f32, f32::max);
            let avg_density = sim.densities().iter().sum::<f32>() / sim.len() as f32;
            let escaped = sim
                .positions()
                .iter()
                .filter(|p| {
                    p.abs()
                        .cmpgt(sim.config().bounds + Vec3::splat(1e-4))
                        .any()
                })
                .count();
            println!(
                "F{:3}: |v|max={:7.3}  avg_rho={:9.2}  escaped={}",
                frame, max_vel, avg_density, escaped
            );
        }
    }

    let max_vel = sim
        .velocities()
        .iter()
        .map(|v| v.length())
        .fold(0.0f32, f32::max);
    println!("\nfinal |v|max = {:.4}", max_vel);
}
