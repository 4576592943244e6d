/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete radial basis function kernels used by the mapping solvers.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// A scalar radial kernel evaluated on Euclidean distance.
///
/// `STRICTLY_POSITIVE_DEFINITE` is a compile-time property of the kernel
/// family: strictly positive definite kernels yield a symmetric positive
/// definite interpolation matrix over distinct centers and can be factorised
/// with a Cholesky decomposition, everything else goes through a
/// column-pivoted QR.
pub trait RadialBasisFunction: Copy + Send + Sync + 'static {
    const STRICTLY_POSITIVE_DEFINITE: bool;

    /// Evaluates the kernel at distance `r >= 0`.
    fn evaluate(&self, r: f64) -> f64;

    /// Whether the kernel vanishes outside a finite support radius.
    fn has_compact_support(&self) -> bool {
        false
    }

    /// Radius beyond which the kernel evaluates to zero.
    fn support_radius(&self) -> f64 {
        f64::INFINITY
    }
}

/// Thin plate spline kernel with `phi(r) = r^2 ln r` and `phi(0) = 0`.
///
/// Conditionally positive definite of order two; combine with a linear
/// polynomial term for guaranteed solvability.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThinPlateSplines;

impl RadialBasisFunction for ThinPlateSplines {
    const STRICTLY_POSITIVE_DEFINITE: bool = false;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        match r.abs() < f64::EPSILON {
            true => 0.0,
            false => r.powi(2) * r.ln(),
        }
    }
}

/// Multiquadrics kernel with `phi(r) = sqrt(r^2 + c^2)`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multiquadrics {
    c2: f64,
}

impl Multiquadrics {
    pub fn new(c: f64) -> Self {
        Self { c2: c * c }
    }
}

impl RadialBasisFunction for Multiquadrics {
    const STRICTLY_POSITIVE_DEFINITE: bool = false;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        (self.c2 + r * r).sqrt()
    }
}

/// Inverse multiquadrics kernel with `phi(r) = 1 / sqrt(r^2 + c^2)`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseMultiquadrics {
    c2: f64,
}

impl InverseMultiquadrics {
    pub fn new(c: f64) -> Self {
        assert!(c > 0.0, "inverse multiquadrics requires a positive shape parameter");
        Self { c2: c * c }
    }
}

impl RadialBasisFunction for InverseMultiquadrics {
    const STRICTLY_POSITIVE_DEFINITE: bool = true;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        1.0 / (self.c2 + r * r).sqrt()
    }
}

/// Volume splines kernel with `phi(r) = r`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSplines;

impl RadialBasisFunction for VolumeSplines {
    const STRICTLY_POSITIVE_DEFINITE: bool = false;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        r
    }
}

/// Gaussian kernel with `phi(r) = exp(-(shape * r)^2)`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    shape: f64,
}

impl Gaussian {
    pub fn new(shape: f64) -> Self {
        assert!(shape > 0.0, "Gaussian requires a positive shape parameter");
        Self { shape }
    }
}

impl RadialBasisFunction for Gaussian {
    const STRICTLY_POSITIVE_DEFINITE: bool = true;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        (-(self.shape * r).powi(2)).exp()
    }
}

/// Compactly supported C2 thin plate spline.
///
/// For `p = r / R < 1`:
/// `phi(r) = 1 - 30 p^2 - 10 p^3 + 45 p^4 - 6 p^5 - 60 p^3 ln p`,
/// zero outside the support radius `R`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactThinPlateSplinesC2 {
    support: f64,
}

impl CompactThinPlateSplinesC2 {
    pub fn new(support: f64) -> Self {
        assert!(support > 0.0, "support radius must be positive");
        Self { support }
    }
}

impl RadialBasisFunction for CompactThinPlateSplinesC2 {
    const STRICTLY_POSITIVE_DEFINITE: bool = true;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        let p = r / self.support;
        if p >= 1.0 {
            return 0.0;
        }
        if p.abs() < f64::EPSILON {
            return 1.0;
        }
        1.0 - 30.0 * p.powi(2) - 10.0 * p.powi(3) + 45.0 * p.powi(4) - 6.0 * p.powi(5)
            - 60.0 * p.powi(3) * p.ln()
    }

    fn has_compact_support(&self) -> bool {
        true
    }

    fn support_radius(&self) -> f64 {
        self.support
    }
}

/// Compactly supported polynomial of continuity C0: `phi(r) = (1 - p)^2`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactPolynomialC0 {
    support: f64,
}

impl CompactPolynomialC0 {
    pub fn new(support: f64) -> Self {
        assert!(support > 0.0, "support radius must be positive");
        Self { support }
    }
}

impl RadialBasisFunction for CompactPolynomialC0 {
    const STRICTLY_POSITIVE_DEFINITE: bool = true;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        let p = r / self.support;
        match p >= 1.0 {
            true => 0.0,
            false => (1.0 - p).powi(2),
        }
    }

    fn has_compact_support(&self) -> bool {
        true
    }

    fn support_radius(&self) -> f64 {
        self.support
    }
}

/// Compactly supported polynomial of continuity C6:
/// `phi(r) = (1 - p)^8 (32 p^3 + 25 p^2 + 8 p + 1)`.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactPolynomialC6 {
    support: f64,
}

impl CompactPolynomialC6 {
    pub fn new(support: f64) -> Self {
        assert!(support > 0.0, "support radius must be positive");
        Self { support }
    }
}

impl RadialBasisFunction for CompactPolynomialC6 {
    const STRICTLY_POSITIVE_DEFINITE: bool = true;

    #[inline(always)]
    fn evaluate(&self, r: f64) -> f64 {
        let p = r / self.support;
        match p >= 1.0 {
            true => 0.0,
            false => (1.0 - p).powi(8) * (32.0 * p.powi(3) + 25.0 * p.powi(2) + 8.0 * p + 1.0),
        }
    }

    fn has_compact_support(&self) -> bool {
        true
    }

    fn support_radius(&self) -> f64 {
        self.support
    }
}
