/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates the low-order monomial basis used to augment kernel systems.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::mesh::Vertex;
use faer::Mat;

/// Number of monomial columns for a degree-one basis over the active axes.
pub(crate) fn basis_size(dimensions: usize, active_axis: &[bool; 3]) -> usize {
    1 + (0..dimensions).filter(|&d| active_axis[d]).count()
}

/// Evaluates the degree-one monomial basis `[1, x, y, (z)]` at every vertex,
/// restricted to active axes. Dead axes contribute no column.
pub(crate) fn evaluate_monomials(
    vertices: &[Vertex],
    dimensions: usize,
    active_axis: &[bool; 3],
) -> Mat<f64> {
    let axes: Vec<usize> = (0..dimensions).filter(|&d| active_axis[d]).collect();
    let mut monomials = Mat::<f64>::zeros(vertices.len(), 1 + axes.len());

    // constant column
    monomials.col_mut(0).fill(1.0);

    // linear columns
    for (p, &axis) in axes.iter().enumerate() {
        for (i, vertex) in vertices.iter().enumerate() {
            monomials[(i, 1 + p)] = vertex.coords()[axis];
        }
    }

    monomials
}
