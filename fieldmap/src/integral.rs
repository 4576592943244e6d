/////////////////////////////////////////////////////////////////////////////////////////////
//
// Computes surface integrals of data channels and the scaled-consistent rescale step.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # integral
//!
//! Surface integrals over mesh primitives: the trapezoidal rule on edges in
//! 2-D, the flat-triangle mean-value rule in 3-D. Only primitives whose
//! vertices are all owned by the local rank contribute, so summing the
//! per-rank integrals across a participant counts every primitive exactly
//! once.

use crate::comm::CommContext;
use crate::error::MappingError;
use crate::mesh::{Data, DataId, Mesh};

/// Integrates a data channel over the mesh surface, one entry per value
/// component. Restricted to primitives owned by this rank.
pub fn surface_integral(mesh: &Mesh, data: &Data) -> Vec<f64> {
    let dim = data.dimensions();
    let values = data.values();
    let mut integral = vec![0.0; dim];

    if mesh.dimensions() == 2 {
        for edge in mesh.edges() {
            let [a, b] = edge.vertices();
            if !(mesh.vertex(a).is_owner() && mesh.vertex(b).is_owner()) {
                continue;
            }
            let length = mesh.edge_length(edge);
            for d in 0..dim {
                integral[d] += 0.5 * length * (values[a * dim + d] + values[b * dim + d]);
            }
        }
    } else {
        for triangle in mesh.triangles() {
            let [a, b, c] = triangle.vertices();
            if !(mesh.vertex(a).is_owner() && mesh.vertex(b).is_owner() && mesh.vertex(c).is_owner())
            {
                continue;
            }
            let area = mesh.triangle_area(triangle);
            for d in 0..dim {
                integral[d] +=
                    area * (values[a * dim + d] + values[b * dim + d] + values[c * dim + d]) / 3.0;
            }
        }
    }

    integral
}

/// Rescales a consistently mapped output field so its surface integral
/// matches the input field's, component by component.
///
/// Both integrals are reduced across the participant before scaling. A zero
/// output integral against a non-zero input integral cannot be matched and
/// fails; zero against zero leaves the component unscaled.
pub(crate) fn rescale_consistent_output(
    input: &Mesh,
    input_data: DataId,
    output: &mut Mesh,
    output_data: DataId,
    context: &CommContext,
) -> Result<(), MappingError> {
    let dim = input.data(input_data).dimensions();

    let mut integrals = surface_integral(input, input.data(input_data));
    integrals.extend(surface_integral(output, output.data(output_data)));
    context.allreduce_sum(&mut integrals)?;
    let (input_integral, output_integral) = integrals.split_at(dim);

    let values = output.data_mut(output_data).values_mut();
    for d in 0..dim {
        if output_integral[d] == 0.0 {
            if input_integral[d] == 0.0 {
                continue;
            }
            return Err(MappingError::DegenerateSurfaceIntegral);
        }
        let scaling = input_integral[d] / output_integral[d];
        for value in values.iter_mut().skip(d).step_by(dim) {
            *value *= scaling;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_field(values: &[f64]) -> (Mesh, DataId) {
        let mut mesh = Mesh::new("square", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.create_vertex(&[1.0, 1.0]);
        mesh.create_vertex(&[0.0, 1.0]);
        mesh.create_edge(0, 1);
        mesh.create_edge(1, 2);
        mesh.create_edge(2, 3);
        mesh.create_edge(3, 0);
        let data = mesh.create_data("field", 1);
        mesh.allocate_data_values();
        mesh.data_mut(data).values_mut().copy_from_slice(values);
        (mesh, data)
    }

    #[test]
    fn trapezoid_rule_on_unit_square() {
        let (mesh, data) = square_with_field(&[1.0, 2.0, 2.0, 1.0]);
        let integral = surface_integral(&mesh, mesh.data(data));
        // 0.5*(1+2) + 0.5*(2+2) + 0.5*(2+1) + 0.5*(1+1)
        assert!((integral[0] - 6.0).abs() < 1e-14);
    }

    #[test]
    fn non_owned_edges_are_skipped() {
        let (mut mesh, data) = square_with_field(&[1.0, 2.0, 2.0, 1.0]);
        mesh.vertices_mut()[2].set_owner(false);
        let integral = surface_integral(&mesh, mesh.data(data));
        // edges touching vertex 2 drop out: 0.5*(1+2) + 0.5*(1+1)
        assert!((integral[0] - 2.5).abs() < 1e-14);
    }

    #[test]
    fn triangle_mean_rule_in_3d() {
        let mut mesh = Mesh::new("tri", 3);
        mesh.create_vertex(&[0.0, 0.0, 0.0]);
        mesh.create_vertex(&[2.0, 0.0, 0.0]);
        mesh.create_vertex(&[0.0, 2.0, 0.0]);
        let e0 = mesh.create_edge(0, 1);
        let e1 = mesh.create_edge(1, 2);
        let e2 = mesh.create_edge(2, 0);
        mesh.create_triangle(e0, e1, e2);
        let data = mesh.create_data("field", 1);
        mesh.allocate_data_values();
        mesh.data_mut(data).values_mut().copy_from_slice(&[3.0, 6.0, 9.0]);
        let integral = surface_integral(&mesh, mesh.data(data));
        // area 2, mean value 6
        assert!((integral[0] - 12.0).abs() < 1e-14);
    }

    #[test]
    fn rescale_matches_input_integral() {
        let (input, in_data) = square_with_field(&[1.0, 2.0, 2.0, 1.0]);
        let (mut output, out_data) = square_with_field(&[4.0, 4.0, 4.0, 4.0]);

        let context = CommContext::serial();
        rescale_consistent_output(&input, in_data, &mut output, out_data, &context).unwrap();

        let scaled = surface_integral(&output, output.data(out_data));
        let reference = surface_integral(&input, input.data(in_data));
        assert!((scaled[0] - reference[0]).abs() < 1e-12);
    }

    #[test]
    fn zero_against_zero_leaves_field_alone() {
        let (input, in_data) = square_with_field(&[0.0; 4]);
        let (mut output, out_data) = square_with_field(&[0.0; 4]);
        let context = CommContext::serial();
        rescale_consistent_output(&input, in_data, &mut output, out_data, &context).unwrap();
        assert_eq!(output.data(out_data).values(), &[0.0; 4]);
    }

    #[test]
    fn zero_output_against_nonzero_input_fails() {
        let (input, in_data) = square_with_field(&[1.0; 4]);
        let (mut output, out_data) = square_with_field(&[0.0; 4]);
        let context = CommContext::serial();
        let err =
            rescale_consistent_output(&input, in_data, &mut output, out_data, &context).unwrap_err();
        assert!(matches!(err, MappingError::DegenerateSurfaceIntegral));
    }
}
