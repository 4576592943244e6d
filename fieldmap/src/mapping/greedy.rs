/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the power-greedy reduced-center kernel mapping with a Newton basis factor.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # greedy
//!
//! A reduced-rank alternative to the dense kernel mapping. Instead of
//! factorising the full n-by-n kernel matrix, centers are selected one at a
//! time where the kernel *power function* is largest, and a Newton basis is
//! built incrementally so that each new center updates a single row of a
//! triangular factor. Selection stops once the power maximum drops below a
//! fixed tolerance or the center budget is exhausted, which keeps both the
//! selection loop and the memory footprint at O(n * k).

use crate::comm::CommContext;
use crate::error::MappingError;
use crate::integral::rescale_consistent_output;
use crate::mapping::{Constraint, Mapping, MappingBase, MeshRequirement, Polynomial};
use crate::mesh::{DataId, MeshHandle, VertexId};
use faer::Mat;
use fieldmap_kernels::{active_axes, distance, RadialBasisFunction};
use log::debug;
use std::sync::Arc;

/// Center budget for the greedy selection.
const MAX_ITERATIONS: usize = 1000;

/// Selection stops once the power-function maximum drops below this.
const POWER_TOLERANCE: f64 = 1e-10;

/// Power-greedy kernel mapping over a reduced center set.
pub struct PGreedyMapping<B: RadialBasisFunction> {
    base: MappingBase,
    basis: B,
    active_axis: [bool; 3],
    /// Input-mesh ids of the selected centers, in selection order.
    greedy_ids: Vec<VertexId>,
    /// Lower-triangular Newton basis transform.
    cut: Mat<f64>,
    /// Kernel values of every selected center against every output vertex.
    kernel_eval: Mat<f64>,
    /// Power-function maximum left after selection terminated.
    final_power_max: f64,
}

impl<B: RadialBasisFunction> PGreedyMapping<B> {
    /// The greedy model carries no polynomial term; `polynomial` must be
    /// [`Polynomial::Off`].
    pub fn new(
        constraint: Constraint,
        dimensions: usize,
        basis: B,
        dead_axis: [bool; 3],
        polynomial: Polynomial,
        context: Arc<CommContext>,
    ) -> Self {
        assert!(
            polynomial == Polynomial::Off,
            "greedy kernel mapping does not support polynomial augmentation"
        );
        let phi0 = basis.evaluate(0.0);
        assert!(
            phi0.is_finite() && phi0 > 0.0,
            "greedy selection requires a kernel with a finite positive value at zero distance"
        );

        let mut base = MappingBase::new(constraint, dimensions, context);
        let requirement = match constraint {
            Constraint::ScaledConsistent => MeshRequirement::Full,
            _ => MeshRequirement::Vertex,
        };
        base.input_requirement = requirement;
        base.output_requirement = requirement;

        let active_axis = active_axes(&dead_axis);
        assert!(
            (0..dimensions).any(|d| active_axis[d]),
            "at least one axis must stay active"
        );

        Self {
            base,
            basis,
            active_axis,
            greedy_ids: Vec::new(),
            cut: Mat::new(),
            kernel_eval: Mat::new(),
            final_power_max: f64::INFINITY,
        }
    }

    /// Centers selected by the last `compute_mapping`.
    pub fn selected_centers(&self) -> &[VertexId] {
        &self.greedy_ids
    }

    /// Power-function maximum remaining after selection terminated.
    pub fn final_power_max(&self) -> f64 {
        self.final_power_max
    }
}

impl<B: RadialBasisFunction> Mapping for PGreedyMapping<B> {
    fn set_meshes(&mut self, input: MeshHandle, output: MeshHandle) {
        self.base.set_meshes(input, output);
    }

    fn constraint(&self) -> Constraint {
        self.base.constraint
    }

    fn compute_mapping(&mut self) -> Result<(), MappingError> {
        let input_handle = self.base.input();
        let output_handle = self.base.output();
        let input = input_handle.read();
        let output = output_handle.read();

        let in_size = input.vertices().len();
        assert!(in_size > 0, "greedy selection needs at least one input vertex");
        let mat_width = in_size.min(MAX_ITERATIONS);
        debug!(
            "greedy center selection over {in_size} input vertices, budget {mat_width}"
        );

        let phi0 = self.basis.evaluate(0.0);
        let mut power = vec![phi0; in_size];
        let mut basis_matrix = Mat::<f64>::zeros(in_size, mat_width);
        let mut cut = Mat::<f64>::zeros(mat_width, mat_width);
        let mut center_bits = vec![false; in_size];
        let mut greedy_ids: Vec<VertexId> = Vec::new();
        let mut v = vec![0.0; in_size];

        for iteration in 0..mat_width {
            // argmax of the power function; earlier centers have already
            // had their power driven to zero
            let (selected, p_max) = power
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (j, &p)| {
                    if p > best.1 {
                        (j, p)
                    } else {
                        best
                    }
                });

            if p_max < POWER_TOLERANCE {
                break;
            }

            greedy_ids.push(selected);
            let x = *input.vertex(selected).coords();

            for (j, vertex) in input.vertices().iter().enumerate() {
                v[j] = self
                    .basis
                    .evaluate(distance(&x, vertex.coords(), &self.active_axis));
            }

            let sqrt_p = p_max.sqrt();
            for j in 0..in_size {
                if center_bits[j] {
                    continue;
                }
                let mut projection = 0.0;
                for k in 0..iteration {
                    projection += basis_matrix[(j, k)] * basis_matrix[(selected, k)];
                }
                v[j] = (v[j] - projection) / sqrt_p;
                power[j] -= v[j] * v[j];
            }

            center_bits[selected] = true;
            for j in 0..in_size {
                basis_matrix[(j, iteration)] = v[j];
            }

            // append one row to the triangular Newton transform
            for c in 0..iteration {
                let mut sum = 0.0;
                for k in c..iteration {
                    sum += basis_matrix[(selected, k)] * cut[(k, c)];
                }
                cut[(iteration, c)] = -sum;
            }
            cut[(iteration, iteration)] = 1.0;
            let pivot = v[selected];
            for c in 0..=iteration {
                cut[(iteration, c)] /= pivot;
            }
        }

        let selected_count = greedy_ids.len();
        let out_size = output.vertices().len();
        let mut kernel_eval = Mat::<f64>::zeros(selected_count, out_size);
        for (row, &center) in greedy_ids.iter().enumerate() {
            let u = input.vertex(center).coords();
            for (col, vertex) in output.vertices().iter().enumerate() {
                kernel_eval[(row, col)] = self
                    .basis
                    .evaluate(distance(u, vertex.coords(), &self.active_axis));
            }
        }

        let residual_power = power.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        debug!(
            "greedy selection finished with {selected_count} centers, residual power {residual_power:.3e}"
        );

        self.final_power_max = residual_power;
        self.greedy_ids = greedy_ids;
        self.cut = cut;
        self.kernel_eval = kernel_eval;
        self.base.has_computed = true;
        Ok(())
    }

    fn has_computed_mapping(&self) -> bool {
        self.base.has_computed
    }

    fn clear(&mut self) {
        self.greedy_ids.clear();
        self.cut = Mat::new();
        self.kernel_eval = Mat::new();
        self.final_power_max = f64::INFINITY;
        self.base.has_computed = false;
    }

    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError> {
        assert!(
            self.base.has_computed,
            "map() called before compute_mapping()"
        );
        assert!(
            self.base.constraint != Constraint::Conservative,
            "conservative mapping is not implemented for the greedy solver"
        );

        let input_handle = self.base.input();
        let output_handle = self.base.output();
        let input = input_handle.read();
        let mut output = output_handle.write();

        let value_dim = input.data(input_data).dimensions();
        assert_eq!(
            value_dim,
            output.data(output_data).dimensions(),
            "value dimensions of input and output data differ"
        );

        let selected_count = self.greedy_ids.len();
        let out_size = output.vertices().len();
        let in_values = input.data(input_data).values();
        let out_values = output.data_mut(output_data).values_mut();

        let mut y = vec![0.0; selected_count];
        let mut t = vec![0.0; selected_count];
        let mut alpha = vec![0.0; selected_count];

        for d in 0..value_dim {
            for (r, &center) in self.greedy_ids.iter().enumerate() {
                y[r] = in_values[center * value_dim + d];
            }

            // coefficients through the triangular Newton transform:
            // alpha = L^T (L y)
            for r in 0..selected_count {
                let mut sum = 0.0;
                for c in 0..=r {
                    sum += self.cut[(r, c)] * y[c];
                }
                t[r] = sum;
            }
            for c in 0..selected_count {
                let mut sum = 0.0;
                for r in c..selected_count {
                    sum += self.cut[(r, c)] * t[r];
                }
                alpha[c] = sum;
            }

            for j in 0..out_size {
                let mut prediction = 0.0;
                for r in 0..selected_count {
                    prediction += self.kernel_eval[(r, j)] * alpha[r];
                }
                out_values[j * value_dim + d] = prediction;
            }
        }

        if self.base.constraint == Constraint::ScaledConsistent {
            rescale_consistent_output(
                &input,
                input_data,
                &mut output,
                output_data,
                &self.base.context,
            )?;
        }

        Ok(())
    }

    fn tag_mesh_first_round(&mut self) -> Result<(), MappingError> {
        // the reduced model may select any input vertex as a center
        let tagged_handle = self.base.searched_mesh();
        for vertex in tagged_handle.write().vertices_mut() {
            vertex.tag();
        }
        Ok(())
    }

    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError> {
        Ok(())
    }

    fn input_requirement(&self) -> MeshRequirement {
        self.base.input_requirement
    }

    fn output_requirement(&self) -> MeshRequirement {
        self.base.output_requirement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use fieldmap_kernels::Gaussian;

    fn mesh_with_field(
        name: &str,
        coords: &[[f64; 2]],
        values: &[f64],
    ) -> (MeshHandle, DataId) {
        let mut mesh = Mesh::new(name, 2);
        for point in coords {
            mesh.create_vertex(point);
        }
        let data = mesh.create_data("field", 1);
        mesh.allocate_data_values();
        mesh.data_mut(data).values_mut().copy_from_slice(values);
        (mesh.into_handle(), data)
    }

    fn serial() -> Arc<CommContext> {
        Arc::new(CommContext::serial())
    }

    #[test]
    fn selection_terminates_on_collinear_points() {
        let coords: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let values = vec![0.0; 10];
        let (input, _) = mesh_with_field("in", &coords, &values);
        let (output, _) = mesh_with_field("out", &[[4.5, 0.0]], &[0.0]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output);
        mapping.compute_mapping().unwrap();

        let selected = mapping.selected_centers().len();
        assert!(selected <= 10);
        assert!(selected == 10 || mapping.final_power_max() < POWER_TOLERANCE);
    }

    #[test]
    fn selected_power_sequence_is_suppressed() {
        // once selected, a center's power collapses, so no id repeats
        let coords: Vec<[f64; 2]> = (0..8).map(|i| [i as f64 * 0.5, 0.0]).collect();
        let (input, _) = mesh_with_field("in", &coords, &[0.0; 8]);
        let (output, _) = mesh_with_field("out", &[[1.0, 0.0]], &[0.0]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output);
        mapping.compute_mapping().unwrap();

        let mut seen = mapping.selected_centers().to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), mapping.selected_centers().len());
    }

    #[test]
    fn reduced_model_reproduces_values_at_centers() {
        let coords: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 0.0]).collect();
        let values = [1.0, -2.0, 0.5, 3.0, -1.5];
        let (input, in_data) = mesh_with_field("in", &coords, &values);
        let (output, out_data) = mesh_with_field("out", &coords, &[0.0; 5]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        assert_eq!(mapping.selected_centers().len(), 5);
        mapping.map(in_data, out_data).unwrap();

        let output = output.read();
        for (value, expected) in output.data(out_data).values().iter().zip(values) {
            assert!((value - expected).abs() < 1e-6, "got {value}, wanted {expected}");
        }
    }

    #[test]
    fn dead_axis_is_honored_in_the_reduced_model() {
        let coords = [[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [3.0, 1.0]];
        let values = [1.0, 2.0, 2.0, 1.0];
        let (input, in_data) = mesh_with_field("in", &coords, &values);
        let (output, out_data) = mesh_with_field("out", &[[0.0, 5.0]], &[0.0]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, true, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        // with y dead the query collapses onto the first input vertex
        let output = output.read();
        assert!((output.data(out_data).values()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn conservative_direction_is_a_precondition_failure() {
        let (input, in_data) = mesh_with_field("in", &[[0.0, 0.0], [1.0, 0.0]], &[1.0, 2.0]);
        let (output, out_data) = mesh_with_field("out", &[[0.5, 0.0]], &[0.0]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Conservative,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output);
        mapping.compute_mapping().unwrap();
        let _ = mapping.map(in_data, out_data);
    }

    #[test]
    #[should_panic]
    fn polynomial_augmentation_is_rejected() {
        let _ = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::On,
            serial(),
        );
    }

    #[test]
    fn clear_resets_selection_state() {
        let (input, _) = mesh_with_field("in", &[[0.0, 0.0], [1.0, 0.0]], &[1.0, 2.0]);
        let (output, _) = mesh_with_field("out", &[[0.5, 0.0]], &[0.0]);

        let mut mapping = PGreedyMapping::new(
            Constraint::Consistent,
            2,
            Gaussian::new(1.0),
            [false, false, false],
            Polynomial::Off,
            serial(),
        );
        mapping.set_meshes(input, output);
        mapping.compute_mapping().unwrap();
        assert!(!mapping.selected_centers().is_empty());
        mapping.clear();
        assert!(mapping.selected_centers().is_empty());
        assert!(!mapping.has_computed_mapping());
    }
}
