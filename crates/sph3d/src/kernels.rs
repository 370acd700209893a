//! Spiky and poly6 smoothing kernels with precomputed coefficients.
//!
//! Every kernel is compactly supported on the smoothing radius `h` and
//! returns 0 outside it. Coefficients are derived once per radius change so
//! the hot loops never call `powi`.

use std::f32::consts::PI;

/// Kernel evaluators for a fixed smoothing radius.
#[derive(Clone, Copy, Debug)]
pub struct Kernels {
    h: f32,
    h_sq: f32,
    spiky_pow2: f32,
    spiky_pow3: f32,
    spiky_pow2_grad: f32,
    spiky_pow3_grad: f32,
    poly6_scale: f32,
}

impl Kernels {
    /// Derive all coefficients from the smoothing radius.
    pub fn new(smoothing_radius: f32) -> Self {
        let h = smoothing_radius;
        Self {
            h,
            h_sq: h * h,
            spiky_pow2: 15.0 / (2.0 * PI * h.powi(5)),
            spiky_pow3: 15.0 / (PI * h.powi(6)),
            spiky_pow2_grad: 15.0 / (PI * h.powi(5)),
            spiky_pow3_grad: 45.0 / (PI * h.powi(6)),
            poly6_scale: 315.0 / (64.0 * PI * h.powi(9)),
        }
    }

    /// Smoothing radius the coefficients were derived from.
    #[inline]
    pub fn support_radius(&self) -> f32 {
        self.h
    }

    /// Squared smoothing radius, for cheap cutoff tests.
    #[inline]
    pub fn support_radius_sq(&self) -> f32 {
        self.h_sq
    }

    /// Density kernel: `(h - d)² · 15 / (2π h⁵)`.
    #[inline]
    pub fn density(&self, distance: f32) -> f32 {
        if distance < self.h {
            let v = self.h - distance;
            v * v * self.spiky_pow2
        } else {
            0.0
        }
    }

    /// Near-density kernel: `(h - d)³ · 15 / (π h⁶)`.
    #[inline]
    pub fn near_density(&self, distance: f32) -> f32 {
        if distance < self.h {
            let v = self.h - distance;
            v * v * v * self.spiky_pow3
        } else {
            0.0
        }
    }

    /// Derivative of the density kernel; non-positive on `[0, h]`.
    #[inline]
    pub fn density_derivative(&self, distance: f32) -> f32 {
        if distance <= self.h {
            -(self.h - distance) * self.spiky_pow2_grad
        } else {
            0.0
        }
    }

    /// Derivative of the near-density kernel; non-positive on `[0, h]`.
    #[inline]
    pub fn near_density_derivative(&self, distance: f32) -> f32 {
        if distance <= self.h {
            let v = self.h - distance;
            -v * v * self.spiky_pow3_grad
        } else {
            0.0
        }
    }

    /// Poly6 kernel: `(h² - d²)³ · 315 / (64π h⁹)`, used for velocity
    /// smoothing in the viscosity pass.
    #[inline]
    pub fn poly6(&self, distance: f32) -> f32 {
        if distance < self.h {
            let v = self.h_sq - distance * distance;
            v * v * v * self.poly6_scale
        } else {
            0.0
        }
    }
}
