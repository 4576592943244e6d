/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the mapping contract shared by all mesh-to-mesh data mappings.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # mapping
//!
//! The polymorphic mapping boundary. A mapping is constructed with a
//! [`Constraint`] and a dimensionality, bound to an input and output mesh
//! with [`Mapping::set_meshes`], prepared once with
//! [`Mapping::compute_mapping`], and then applied any number of times with
//! [`Mapping::map`] until [`Mapping::clear`].

pub mod greedy;

pub mod nearest_neighbor;

pub mod rbf;

use crate::comm::CommContext;
use crate::error::MappingError;
use crate::mesh::{DataId, MeshHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How mapped values relate the input field to the output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// Output values reproduce the input field (interpolation).
    Consistent,
    /// The discrete adjoint of the consistent map; global sums are
    /// preserved.
    Conservative,
    /// Consistent interpolation followed by a global rescale matching the
    /// surface integrals of both fields.
    ScaledConsistent,
}

/// Connectivity a mapping needs from a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshRequirement {
    Undefined,
    /// Vertex positions only.
    Vertex,
    /// Vertices plus edge/triangle connectivity (surface integrals).
    Full,
}

/// Polynomial augmentation mode of a kernel system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polynomial {
    Off,
    /// Fit the polynomial by least squares first, interpolate the residual.
    Separate,
    /// Solve the augmented saddle system.
    On,
}

/// Common contract of all mapping families.
pub trait Mapping {
    /// Binds the input mesh (where samples are known) and output mesh
    /// (whose vertices receive values).
    fn set_meshes(&mut self, input: MeshHandle, output: MeshHandle);

    fn constraint(&self) -> Constraint;

    /// Prepares the mapping state. Must succeed before [`Mapping::map`].
    fn compute_mapping(&mut self) -> Result<(), MappingError>;

    fn has_computed_mapping(&self) -> bool;

    /// Drops all computed state; the mapping may be recomputed afterwards.
    fn clear(&mut self);

    /// Maps the input data channel onto the output data channel.
    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError>;

    /// First pass of the two-round vertex marking: tags vertices the mapping
    /// can draw values from.
    fn tag_mesh_first_round(&mut self) -> Result<(), MappingError>;

    /// Second pass: widens the tagged set where the kernel support demands
    /// it.
    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError>;

    fn input_requirement(&self) -> MeshRequirement;

    fn output_requirement(&self) -> MeshRequirement;
}

/// State shared by every mapping family.
pub(crate) struct MappingBase {
    pub(crate) constraint: Constraint,
    pub(crate) dimensions: usize,
    pub(crate) input: Option<MeshHandle>,
    pub(crate) output: Option<MeshHandle>,
    pub(crate) input_requirement: MeshRequirement,
    pub(crate) output_requirement: MeshRequirement,
    pub(crate) has_computed: bool,
    pub(crate) context: Arc<CommContext>,
}

impl MappingBase {
    pub(crate) fn new(
        constraint: Constraint,
        dimensions: usize,
        context: Arc<CommContext>,
    ) -> Self {
        assert!(
            (2..=3).contains(&dimensions),
            "unsupported mapping dimensionality: {dimensions}"
        );
        Self {
            constraint,
            dimensions,
            input: None,
            output: None,
            input_requirement: MeshRequirement::Undefined,
            output_requirement: MeshRequirement::Undefined,
            has_computed: false,
            context,
        }
    }

    pub(crate) fn set_meshes(&mut self, input: MeshHandle, output: MeshHandle) {
        assert_eq!(
            input.read().dimensions(),
            self.dimensions,
            "input mesh dimensionality does not match the mapping"
        );
        assert_eq!(
            output.read().dimensions(),
            self.dimensions,
            "output mesh dimensionality does not match the mapping"
        );
        self.input = Some(input);
        self.output = Some(output);
    }

    /// The bound input mesh. Using a mapping before `set_meshes` is a
    /// programming error.
    pub(crate) fn input(&self) -> MeshHandle {
        self.input.clone().expect("meshes have not been set")
    }

    pub(crate) fn output(&self) -> MeshHandle {
        self.output.clone().expect("meshes have not been set")
    }

    /// The mesh searched for source vertices: the input mesh for consistent
    /// directions, the output mesh for the conservative adjoint.
    pub(crate) fn searched_mesh(&self) -> MeshHandle {
        match self.constraint {
            Constraint::Conservative => self.output(),
            _ => self.input(),
        }
    }

    /// The opposite mesh of [`MappingBase::searched_mesh`].
    pub(crate) fn reference_mesh(&self) -> MeshHandle {
        match self.constraint {
            Constraint::Conservative => self.input(),
            _ => self.output(),
        }
    }
}
