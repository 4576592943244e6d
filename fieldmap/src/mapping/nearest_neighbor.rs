/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the nearest-neighbor mapping driven by an R-tree index table.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # nearest_neighbor
//!
//! The simplest mapping and the reference for everything else: each vertex
//! of the reference mesh is paired with its single nearest neighbor in the
//! opposite mesh. Consistent mapping copies values along that table,
//! conservative mapping accumulates along its transpose.

use crate::comm::CommContext;
use crate::error::MappingError;
use crate::integral::rescale_consistent_output;
use crate::mapping::{Constraint, Mapping, MappingBase, MeshRequirement};
use crate::mesh::{DataId, MeshHandle, VertexId};
use crate::rtree::VertexRTree;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

/// Pointwise nearest-neighbor mapping.
pub struct NearestNeighborMapping {
    base: MappingBase,
    /// For each reference-mesh vertex, the local id of its nearest neighbor
    /// in the searched mesh.
    vertex_indices: Vec<VertexId>,
}

impl NearestNeighborMapping {
    pub fn new(constraint: Constraint, dimensions: usize, context: Arc<CommContext>) -> Self {
        let mut base = MappingBase::new(constraint, dimensions, context);
        let requirement = match constraint {
            Constraint::ScaledConsistent => MeshRequirement::Full,
            _ => MeshRequirement::Vertex,
        };
        base.input_requirement = requirement;
        base.output_requirement = requirement;
        Self {
            base,
            vertex_indices: Vec::new(),
        }
    }
}

impl Mapping for NearestNeighborMapping {
    fn set_meshes(&mut self, input: MeshHandle, output: MeshHandle) {
        self.base.set_meshes(input, output);
    }

    fn constraint(&self) -> Constraint {
        self.base.constraint
    }

    fn compute_mapping(&mut self) -> Result<(), MappingError> {
        let searched_handle = self.base.searched_mesh();
        let reference_handle = self.base.reference_mesh();
        let searched = searched_handle.read();
        let reference = reference_handle.read();
        debug!(
            "computing nearest-neighbor mapping from {} to {}",
            searched.name(),
            reference.name()
        );
        assert!(
            !searched.vertices().is_empty(),
            "cannot search an empty mesh for neighbors"
        );

        let rtree = VertexRTree::build(&searched);
        self.vertex_indices = reference
            .vertices()
            .iter()
            .map(|vertex| rtree.nearest(vertex.coords(), 1)[0])
            .collect();

        self.base.has_computed = true;
        Ok(())
    }

    fn has_computed_mapping(&self) -> bool {
        self.base.has_computed
    }

    fn clear(&mut self) {
        self.vertex_indices.clear();
        self.base.has_computed = false;
    }

    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError> {
        assert!(
            self.base.has_computed,
            "map() called before compute_mapping()"
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
        assert_eq!(
            input.data(input_data).values().len(),
            input.vertices().len() * value_dim
        );
        assert_eq!(
            output.data(output_data).values().len(),
            output.vertices().len() * value_dim
        );

        let in_values = input.data(input_data).values().to_vec();
        let out_values = output.data_mut(output_data).values_mut();

        match self.base.constraint {
            Constraint::Conservative => {
                debug!("mapping conservative over {} vertices", self.vertex_indices.len());
                for (i, &target) in self.vertex_indices.iter().enumerate() {
                    for d in 0..value_dim {
                        out_values[target * value_dim + d] += in_values[i * value_dim + d];
                    }
                }
            }
            _ => {
                debug!("mapping consistent over {} vertices", self.vertex_indices.len());
                for (i, &source) in self.vertex_indices.iter().enumerate() {
                    for d in 0..value_dim {
                        out_values[i * value_dim + d] = in_values[source * value_dim + d];
                    }
                }
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
        self.compute_mapping()?;

        let referenced: HashSet<VertexId> = self.vertex_indices.iter().copied().collect();
        let searched_handle = self.base.searched_mesh();
        for vertex in searched_handle.write().vertices_mut() {
            if referenced.contains(&vertex.id()) {
                vertex.tag();
            }
        }

        self.clear();
        Ok(())
    }

    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError> {
        // nothing to widen for a pointwise mapping
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

    fn input_square() -> (MeshHandle, DataId) {
        let mut mesh = Mesh::new("in", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.create_vertex(&[1.0, 1.0]);
        mesh.create_vertex(&[0.0, 1.0]);
        let data = mesh.create_data("values", 1);
        mesh.allocate_data_values();
        mesh.data_mut(data)
            .values_mut()
            .copy_from_slice(&[1.0, 2.0, 2.0, 1.0]);
        (mesh.into_handle(), data)
    }

    #[test]
    fn consistent_copies_nearest_value() {
        let (input, in_data) = input_square();
        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.9, 0.1]);
        let out_data = out_mesh.create_data("values", 1);
        out_mesh.allocate_data_values();
        let output = out_mesh.into_handle();

        let mut mapping =
            NearestNeighborMapping::new(Constraint::Consistent, 2, Arc::new(CommContext::serial()));
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        assert!(mapping.has_computed_mapping());
        mapping.map(in_data, out_data).unwrap();

        assert_eq!(output.read().data(out_data).values(), &[2.0]);
    }

    #[test]
    fn equidistant_output_vertex_takes_smallest_id() {
        let (input, in_data) = input_square();
        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.5, 0.0]);
        let out_data = out_mesh.create_data("values", 1);
        out_mesh.allocate_data_values();
        let output = out_mesh.into_handle();

        let mut mapping =
            NearestNeighborMapping::new(Constraint::Consistent, 2, Arc::new(CommContext::serial()));
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        // ties resolve to vertex 0 at (0, 0) carrying value 1
        assert_eq!(output.read().data(out_data).values(), &[1.0]);
    }

    #[test]
    fn conservative_accumulates_onto_nearest() {
        let mut in_mesh = Mesh::new("in", 2);
        in_mesh.create_vertex(&[0.0, 0.0]);
        in_mesh.create_vertex(&[1.0, 0.0]);
        let in_data = in_mesh.create_data("values", 1);
        in_mesh.allocate_data_values();
        in_mesh.data_mut(in_data).values_mut().copy_from_slice(&[3.0, 7.0]);
        let input = in_mesh.into_handle();

        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.4, 0.0]);
        let out_data = out_mesh.create_data("values", 1);
        out_mesh.allocate_data_values();
        let output = out_mesh.into_handle();

        let mut mapping = NearestNeighborMapping::new(
            Constraint::Conservative,
            2,
            Arc::new(CommContext::serial()),
        );
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        // both input vertices flow into the single output vertex
        assert_eq!(output.read().data(out_data).values(), &[10.0]);
    }

    #[test]
    fn conservative_preserves_vector_sums() {
        let mut in_mesh = Mesh::new("in", 2);
        for x in 0..4 {
            in_mesh.create_vertex(&[x as f64, 0.0]);
        }
        let in_data = in_mesh.create_data("values", 2);
        in_mesh.allocate_data_values();
        in_mesh
            .data_mut(in_data)
            .values_mut()
            .copy_from_slice(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0]);
        let input = in_mesh.into_handle();

        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.2, 0.0]);
        out_mesh.create_vertex(&[2.8, 0.0]);
        let out_data = out_mesh.create_data("values", 2);
        out_mesh.allocate_data_values();
        let output = out_mesh.into_handle();

        let mut mapping = NearestNeighborMapping::new(
            Constraint::Conservative,
            2,
            Arc::new(CommContext::serial()),
        );
        mapping.set_meshes(input, output.clone());
        mapping.compute_mapping().unwrap();
        mapping.map(in_data, out_data).unwrap();

        let output = output.read();
        let values = output.data(out_data).values();
        let sums = [values[0] + values[2], values[1] + values[3]];
        assert_eq!(sums, [10.0, -10.0]);
    }

    #[test]
    fn tag_first_round_marks_referenced_vertices_and_clears() {
        let (input, _) = input_square();
        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.1, 0.1]);
        out_mesh.create_vertex(&[0.9, 0.1]);
        out_mesh.create_data("values", 1);
        out_mesh.allocate_data_values();
        let output = out_mesh.into_handle();

        let mut mapping =
            NearestNeighborMapping::new(Constraint::Consistent, 2, Arc::new(CommContext::serial()));
        mapping.set_meshes(input.clone(), output);
        mapping.tag_mesh_first_round().unwrap();
        mapping.tag_mesh_second_round().unwrap();

        let input = input.read();
        let tagged: Vec<bool> = input.vertices().iter().map(|v| v.is_tagged()).collect();
        assert_eq!(tagged, vec![true, true, false, false]);
        assert!(!mapping.has_computed_mapping());
    }

    #[test]
    #[should_panic]
    fn map_before_compute_aborts() {
        let (input, in_data) = input_square();
        let mut out_mesh = Mesh::new("out", 2);
        out_mesh.create_vertex(&[0.0, 0.0]);
        let out_data = out_mesh.create_data("values", 1);
        out_mesh.allocate_data_values();

        let mut mapping =
            NearestNeighborMapping::new(Constraint::Consistent, 2, Arc::new(CommContext::serial()));
        mapping.set_meshes(input, out_mesh.into_handle());
        let _ = mapping.map(in_data, out_data);
    }
}
