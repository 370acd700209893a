//! 3D Smoothed Particle Hydrodynamics engine.
//!
//! A dual-pressure SPH solver over a fixed particle population confined to an
//! axis-aligned box. Each [`SphSimulation3D::step`] applies gravity and
//! predicts positions, rebuilds a cell-hash spatial index, accumulates
//! density and near-density fields, applies pressure and viscosity impulses,
//! and advances positions with damped wall collisions. The passes run on a
//! fixed team of worker threads over contiguous particle chunks, synchronized
//! at every pass boundary.
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sph3d::{spawn_particles_in_box, SphConfig, SphSimulation3D};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let particles = spawn_particles_in_box(128, 2.0, 0.1, 0.0, &mut rng);
//! let mut sim = SphSimulation3D::new(SphConfig::default(), particles).unwrap();
//!
//! for _ in 0..10 {
//!     sim.step(1.0 / 60.0).unwrap();
//! }
//! assert!(sim.positions().iter().all(|p| p.abs().max_element() <= 1.0 + 1e-5));
//! ```

pub mod advection;
pub mod config;
pub mod constants;
pub mod forces;
pub mod kernels;
pub mod particle;
pub mod spatial;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Barrier;
use std::thread;

use thiserror::Error;

pub use config::{ConfigError, SphConfig};
pub use glam::Vec3;
pub use kernels::Kernels;
pub use particle::{spawn_particles_in_box, Particle3D};
pub use spatial::SpatialHash;

/// Failures surfaced by [`SphSimulation3D::step`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    /// A worker thread panicked during this step; state is inconsistent.
    #[error("worker thread panicked mid-step")]
    WorkerPanic,
    /// An earlier step lost a worker; the engine refuses to run.
    #[error("simulation is poisoned by an earlier worker failure")]
    Poisoned,
}

/// Dual-pressure SPH simulation engine.
///
/// Owns the authoritative particle state as parallel field arrays, plus the
/// per-step scratch buffers (spatial index, velocity snapshot), all sized to
/// the particle count. Particle arrays are kept in cell-sorted order, which
/// changes every step.
pub struct SphSimulation3D {
    config: SphConfig,
    kernels: Kernels,

    positions: Vec<Vec3>,
    predicted: Vec<Vec3>,
    velocities: Vec<Vec3>,
    densities: Vec<f32>,
    near_densities: Vec<f32>,

    grid: SpatialHash,
    velocity_snapshot: Vec<Vec3>,

    requested_threads: usize,
    thread_count: usize,
    poisoned: bool,
    /// Test hook: makes the next step's workers panic mid-pass.
    #[cfg(test)]
    fail_next_step: bool,
}

impl SphSimulation3D {
    /// Create an engine sized to the hardware thread count.
    pub fn new(config: SphConfig, particles: Vec<Particle3D>) -> Result<Self, ConfigError> {
        let threads = thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::with_thread_count(config, particles, threads)
    }

    /// Create an engine with an explicit worker count, clamped to `[1, N]`.
    pub fn with_thread_count(
        config: SphConfig,
        particles: Vec<Particle3D>,
        threads: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self {
            kernels: Kernels::new(config.smoothing_radius),
            config,
            positions: Vec::new(),
            predicted: Vec::new(),
            velocities: Vec::new(),
            densities: Vec::new(),
            near_densities: Vec::new(),
            grid: SpatialHash::new(0),
            velocity_snapshot: Vec::new(),
            requested_threads: threads.max(1),
            thread_count: 1,
            poisoned: false,
            #[cfg(test)]
            fail_next_step: false,
        };
        sim.install_particles(particles);
        log::debug!(
            "sph engine initialized: {} particles, {} worker threads",
            sim.positions.len(),
            sim.thread_count
        );
        Ok(sim)
    }

    /// Replace configuration and particles in place, resizing every scratch
    /// buffer. On a validation error the previous state is left untouched.
    pub fn reset(
        &mut self,
        config: SphConfig,
        particles: Vec<Particle3D>,
    ) -> Result<(), ConfigError> {
        config.validate()?;
        self.kernels = Kernels::new(config.smoothing_radius);
        self.config = config;
        self.poisoned = false;
        self.install_particles(particles);
        Ok(())
    }

    fn install_particles(&mut self, particles: Vec<Particle3D>) {
        let n = particles.len();
        self.positions.clear();
        self.predicted.clear();
        self.velocities.clear();
        self.densities.clear();
        self.near_densities.clear();
        self.positions.reserve(n);
        self.predicted.reserve(n);
        self.velocities.reserve(n);
        self.densities.reserve(n);
        self.near_densities.reserve(n);
        for particle in &particles {
            self.positions.push(particle.position);
            self.predicted.push(particle.predicted);
            self.velocities.push(particle.velocity);
            self.densities.push(particle.density);
            self.near_densities.push(particle.near_density);
        }

        self.velocity_snapshot.clear();
        self.velocity_snapshot.resize(n, Vec3::ZERO);
        self.grid.resize(n);
        self.thread_count = self.requested_threads.clamp(1, n.max(1));
    }

    /// Install a new configuration between steps.
    pub fn set_config(&mut self, config: SphConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.smoothing_radius != self.config.smoothing_radius {
            self.kernels = Kernels::new(config.smoothing_radius);
        }
        self.config = config;
        Ok(())
    }

    /// Current configuration.
    pub fn config(&self) -> &SphConfig {
        &self.config
    }

    /// Kernel evaluators for the current smoothing radius.
    pub fn kernels(&self) -> &Kernels {
        &self.kernels
    }

    /// Number of simulated particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the engine holds no particles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Particle positions, in the current cell-sorted array order.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Particle velocities, ordered like [`Self::positions`].
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Densities from the latest step, ordered like [`Self::positions`].
    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    /// Near-densities from the latest step, ordered like [`Self::positions`].
    pub fn near_densities(&self) -> &[f32] {
        &self.near_densities
    }

    /// Worker threads used for the parallel passes.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Read access to the spatial index, for diagnostics and tests.
    pub fn spatial_index(&self) -> &SpatialHash {
        &self.grid
    }

    /// Assemble a snapshot of the particle records.
    pub fn particles(&self) -> Vec<Particle3D> {
        (0..self.positions.len())
            .map(|i| Particle3D {
                position: self.positions[i],
                predicted: self.predicted[i],
                velocity: self.velocities[i],
                density: self.densities[i],
                near_density: self.near_densities[i],
            })
            .collect()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A step with no particles is a no-op. If a worker thread fails, the
    /// step is abandoned, the engine is poisoned, and every later call
    /// returns [`StepError::Poisoned`].
    pub fn step(&mut self, dt: f32) -> Result<(), StepError> {
        if self.poisoned {
            return Err(StepError::Poisoned);
        }
        if self.positions.is_empty() {
            return Ok(());
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.run_passes(dt))) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.poisoned = true;
                log::error!("worker thread panicked; simulation poisoned");
                Err(StepError::WorkerPanic)
            }
        }
    }

    /// The five passes of one step, partitioned over `thread_count` workers.
    ///
    /// Every buffer a pass writes is split into disjoint per-worker chunks;
    /// everything a pass reads across particles is borrowed shared and is not
    /// written while the team runs. Where a written buffer becomes a shared
    /// read of the next pass (densities, velocity snapshot), the team is
    /// joined and the split reconstituted; within a team the reusable barrier
    /// orders the pass boundaries.
    fn run_passes(&mut self, dt: f32) {
        let n = self.positions.len();
        let chunk = n.div_ceil(self.thread_count);
        let workers = n.div_ceil(chunk);
        let gravity = self.config.gravity;

        // 1) Apply external forces and compute predicted positions.
        #[cfg(test)]
        let fail_next_step = self.fail_next_step;
        thread::scope(|scope| {
            let chunks = self
                .positions
                .chunks(chunk)
                .zip(self.velocities.chunks_mut(chunk))
                .zip(self.predicted.chunks_mut(chunk));
            for ((positions, velocities), predicted) in chunks {
                scope.spawn(move || {
                    #[cfg(test)]
                    if fail_next_step {
                        panic!("injected worker failure");
                    }
                    forces::integrate_external_forces(dt, gravity, positions, velocities, predicted);
                });
            }
        });

        // 2) Rebuild the spatial index and reorder particles by cell key for
        // cache-friendly neighbor lookups. Single-threaded.
        self.grid.build(&self.predicted, self.config.smoothing_radius);
        self.grid
            .reorder(&mut self.positions, &mut self.predicted, &mut self.velocities);
        self.grid.compute_offsets();
        let use_viscosity = self.config.viscosity_strength != 0.0;

        let config = &self.config;
        let kernels = &self.kernels;
        let grid = &self.grid;
        let predicted = &self.predicted[..];
        let bounds = self.config.bounds;
        let collision_damping = self.config.collision_damping;

        // 3) Density and near-density fields.
        thread::scope(|scope| {
            let chunks = self
                .densities
                .chunks_mut(chunk)
                .zip(self.near_densities.chunks_mut(chunk));
            for (worker, (densities, near_densities)) in chunks.enumerate() {
                scope.spawn(move || {
                    forces::density_pass(
                        grid,
                        kernels,
                        predicted,
                        densities,
                        near_densities,
                        worker * chunk,
                    );
                });
            }
        });

        let densities = &self.densities[..];
        let near_densities = &self.near_densities[..];
        let barrier = Barrier::new(workers);

        if use_viscosity {
            // 4) Pressure impulse, then a synchronized velocity snapshot for
            // the viscosity pass to read.
            thread::scope(|scope| {
                let chunks = self
                    .velocities
                    .chunks_mut(chunk)
                    .zip(self.velocity_snapshot.chunks_mut(chunk));
                for (worker, (velocities, snapshot)) in chunks.enumerate() {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        forces::pressure_pass(
                            dt,
                            config,
                            kernels,
                            grid,
                            predicted,
                            densities,
                            near_densities,
                            velocities,
                            worker * chunk,
                        );
                        barrier.wait();
                        snapshot.copy_from_slice(velocities);
                    });
                }
            });

            // 5) Viscosity against the snapshot, then the position update.
            let snapshot = &self.velocity_snapshot[..];
            let viscosity_strength = self.config.viscosity_strength;
            thread::scope(|scope| {
                let chunks = self
                    .velocities
                    .chunks_mut(chunk)
                    .zip(self.positions.chunks_mut(chunk));
                for (worker, (velocities, positions)) in chunks.enumerate() {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        forces::viscosity_pass(
                            dt,
                            viscosity_strength,
                            kernels,
                            grid,
                            predicted,
                            snapshot,
                            velocities,
                            worker * chunk,
                        );
                        barrier.wait();
                        advection::update_positions(
                            dt,
                            bounds,
                            collision_damping,
                            positions,
                            velocities,
                        );
                    });
                }
            });
        } else {
            // 4) Pressure impulse straight into the position update.
            thread::scope(|scope| {
                let chunks = self
                    .velocities
                    .chunks_mut(chunk)
                    .zip(self.positions.chunks_mut(chunk));
                for (worker, (velocities, positions)) in chunks.enumerate() {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        forces::pressure_pass(
                            dt,
                            config,
                            kernels,
                            grid,
                            predicted,
                            densities,
                            near_densities,
                            velocities,
                            worker * chunk,
                        );
                        barrier.wait();
                        advection::update_positions(
                            dt,
                            bounds,
                            collision_damping,
                            positions,
                            velocities,
                        );
                    });
                }
            });
        }
    }
}
