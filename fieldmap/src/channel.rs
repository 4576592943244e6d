/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the gather/scatter coupling channel over a mesh vertex distribution.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # channel
//!
//! The single-participant side of a coupled data exchange. On `send`, worker
//! ranks push their local slice to the coordinator, which reassembles the
//! global vector in the canonical order defined by the mesh's vertex
//! distribution and ships it across the inter-participant link. `receive` is
//! the exact inverse: the coordinator receives the global vector and
//! scatters each rank's slice back out.
//!
//! Duplicated (halo) global indices combine by summation on the gather and
//! replicate on the scatter.

use crate::comm::{CommContext, Transport};
use crate::error::TransportError;
use crate::mesh::MeshHandle;
use log::debug;
use std::sync::Arc;

/// Gather/scatter collective bound to one mesh and one coupling link.
pub struct GatherScatterChannel {
    context: Arc<CommContext>,
    link: Arc<dyn Transport>,
    mesh: MeshHandle,
    connected: bool,
}

impl GatherScatterChannel {
    pub fn new(context: Arc<CommContext>, link: Arc<dyn Transport>, mesh: MeshHandle) -> Self {
        Self {
            context,
            link,
            mesh,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Marks the accepting side of the coupling as connected. Only the
    /// coordinator talks across the link, so only it must hold a live one.
    pub fn accept_connection(&mut self) {
        assert!(
            !self.context.is_coordinator() || self.link.is_connected(),
            "coordinator coupling link must be connected"
        );
        self.connected = true;
    }

    /// Marks the requesting side of the coupling as connected.
    pub fn request_connection(&mut self) {
        assert!(
            !self.context.is_coordinator() || self.link.is_connected(),
            "coordinator coupling link must be connected"
        );
        self.connected = true;
    }

    pub fn close_connection(&mut self) {
        self.connected = false;
    }

    /// Gathers `items` from all ranks onto the coordinator and sends the
    /// assembled global vector to peer rank 0 of the coupled participant.
    ///
    /// Contributions are accumulated rank by rank in ascending order, so
    /// halo indices sum deterministically.
    pub fn send(&self, items: &[f64], value_dim: usize) -> Result<(), TransportError> {
        assert!(self.connected, "coupling channel is not connected");
        assert!(
            self.context.size() > 1,
            "gather/scatter requires more than one rank"
        );

        if !self.context.is_coordinator() {
            if !items.is_empty() {
                self.context.link().send(items, 0)?;
            }
            return Ok(());
        }

        let mesh = self.mesh.read();
        let distribution = mesh
            .vertex_distribution()
            .expect("coordinator mesh must carry a vertex distribution");
        let global_size = mesh.global_vertex_count() * value_dim;
        debug!(
            "gathering {global_size} values for mesh {} across {} ranks",
            mesh.name(),
            self.context.size()
        );

        let mut global_items = vec![0.0; global_size];
        accumulate_slice(&mut global_items, distribution.rank(0), items, value_dim);

        for rank in 1..self.context.size() {
            let slice_len = distribution.rank(rank).len() * value_dim;
            if slice_len > 0 {
                let mut worker_items = vec![0.0; slice_len];
                self.context.link().receive(&mut worker_items, rank)?;
                accumulate_slice(
                    &mut global_items,
                    distribution.rank(rank),
                    &worker_items,
                    value_dim,
                );
            }
        }

        self.link.send(&global_items, 0)
    }

    /// Receives the global vector from the coupled participant on the
    /// coordinator and scatters each rank's slice into `items`.
    pub fn receive(&self, items: &mut [f64], value_dim: usize) -> Result<(), TransportError> {
        assert!(self.connected, "coupling channel is not connected");
        assert!(
            self.context.size() > 1,
            "gather/scatter requires more than one rank"
        );

        if !self.context.is_coordinator() {
            if !items.is_empty() {
                self.context.link().receive(items, 0)?;
            }
            return Ok(());
        }

        let mesh = self.mesh.read();
        let distribution = mesh
            .vertex_distribution()
            .expect("coordinator mesh must carry a vertex distribution");
        let global_size = mesh.global_vertex_count() * value_dim;
        debug!(
            "scattering {global_size} values for mesh {} across {} ranks",
            mesh.name(),
            self.context.size()
        );

        let mut global_items = vec![0.0; global_size];
        self.link.receive(&mut global_items, 0)?;

        extract_slice(&global_items, distribution.rank(0), items, value_dim);

        for rank in 1..self.context.size() {
            let slice_len = distribution.rank(rank).len() * value_dim;
            if slice_len > 0 {
                let mut worker_items = vec![0.0; slice_len];
                extract_slice(
                    &global_items,
                    distribution.rank(rank),
                    &mut worker_items,
                    value_dim,
                );
                self.context.link().send(&worker_items, rank)?;
            }
        }

        Ok(())
    }
}

fn accumulate_slice(global: &mut [f64], indices: &[usize], local: &[f64], value_dim: usize) {
    for (i, &global_index) in indices.iter().enumerate() {
        for d in 0..value_dim {
            global[global_index * value_dim + d] += local[i * value_dim + d];
        }
    }
}

fn extract_slice(global: &[f64], indices: &[usize], local: &mut [f64], value_dim: usize) {
    for (i, &global_index) in indices.iter().enumerate() {
        for d in 0..value_dim {
            local[i * value_dim + d] = global[global_index * value_dim + d];
        }
    }
}
