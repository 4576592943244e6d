/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for the mesh-coupling mapping core.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Mesh-coupling data mapping.
//!
//! This crate moves field data between two spatial meshes: an *input mesh*
//! where scalar or vector samples are known, and an *output mesh* whose
//! vertices receive interpolated or redistributed values. Three constraints
//! govern the transfer:
//!
//! - **consistent** - output values reproduce the input field,
//! - **conservative** - the discrete adjoint of the consistent map, so
//!   global sums are preserved,
//! - **scaled-consistent** - consistent interpolation rescaled so the
//!   surface integrals of both fields agree.
//!
//! Two mapping families implement the contract: a spatial-index driven
//! [nearest-neighbor mapping](mapping::nearest_neighbor) and dense
//! [radial basis function interpolation](mapping::rbf) built on
//! [`faer`](https://docs.rs/faer/latest/faer/), including a
//! [power-greedy](mapping::greedy) reduced-center variant that avoids the
//! full kernel factorisation.
//!
//! Meshes may be distributed across ranks. The [`channel`] module provides
//! the gather/scatter collective that reassembles a global vector on the
//! participant's coordinator rank and ships it across a coupling link; the
//! per-rank layout is defined by the mesh's
//! [vertex distribution](mesh::VertexDistribution). Rank state is carried by
//! an explicit [`comm::CommContext`] rather than process-wide globals.
//!
//! # Examples
//!
//! ```
//! use fieldmap::comm::CommContext;
//! use fieldmap::mapping::nearest_neighbor::NearestNeighborMapping;
//! use fieldmap::mapping::{Constraint, Mapping};
//! use fieldmap::mesh::Mesh;
//! use std::sync::Arc;
//!
//! // Two samples on the input mesh
//! let mut input = Mesh::new("input", 2);
//! input.create_vertex(&[0.0, 0.0]);
//! input.create_vertex(&[1.0, 0.0]);
//! let in_data = input.create_data("temperature", 1);
//! input.allocate_data_values();
//! input.data_mut(in_data).values_mut().copy_from_slice(&[270.0, 280.0]);
//!
//! // One vertex to fill on the output mesh
//! let mut output = Mesh::new("output", 2);
//! output.create_vertex(&[0.2, 0.0]);
//! let out_data = output.create_data("temperature", 1);
//! output.allocate_data_values();
//!
//! let output = output.into_handle();
//! let mut mapping = NearestNeighborMapping::new(
//!     Constraint::Consistent,
//!     2,
//!     Arc::new(CommContext::serial()),
//! );
//! mapping.set_meshes(input.into_handle(), output.clone());
//! mapping.compute_mapping()?;
//! mapping.map(in_data, out_data)?;
//!
//! assert_eq!(output.read().data(out_data).values(), &[270.0]);
//! # Ok::<(), fieldmap::error::MappingError>(())
//! ```

pub mod channel;

pub mod comm;

pub mod error;

pub mod integral;

pub mod mapping;

pub mod mesh;

mod polynomials;

pub mod rtree;

pub use {
    channel::GatherScatterChannel,
    comm::{CommContext, LocalExchange, Transport},
    error::{MappingError, TransportError},
    mapping::{Constraint, Mapping, MeshRequirement, Polynomial},
    mesh::{Mesh, MeshHandle, VertexDistribution},
};
