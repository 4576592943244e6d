/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the radial basis function family and distance helpers shared by the mapping core.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # fieldmap_kernels
//!
//! Radial basis functions for mesh-to-mesh data mapping, together with the
//! axis-masked distance helpers they are evaluated on.
//!
//! Every kernel is a small `Copy` struct implementing
//! [`RadialBasisFunction`], a scalar function of Euclidean distance `r`. The
//! associated constant [`RadialBasisFunction::STRICTLY_POSITIVE_DEFINITE`]
//! records whether the kernel matrix over distinct centers is strictly
//! positive definite; the mapping core uses it to pick a Cholesky
//! factorisation over a column-pivoted QR. Compactly supported kernels
//! additionally report a finite [`RadialBasisFunction::support_radius`].
//!
//! Distances are computed over fixed `[f64; 3]` coordinates with a
//! `[bool; 3]` active-axis mask, so that a dead spatial axis contributes
//! exactly zero to every kernel argument.

pub mod basis;

pub mod distance;

pub use {
    basis::{
        CompactPolynomialC0, CompactPolynomialC6, CompactThinPlateSplinesC2, Gaussian,
        InverseMultiquadrics, Multiquadrics, RadialBasisFunction, ThinPlateSplines, VolumeSplines,
    },
    distance::{active_axes, distance, squared_distance},
};
