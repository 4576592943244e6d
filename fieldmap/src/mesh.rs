/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the mesh data model: vertices, connectivity, data channels, and vertex distribution.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # mesh
//!
//! The mesh model consumed by the mapping core. Meshes are built by an
//! external component; this module only provides the containers and derived
//! geometric quantities (edge lengths, triangle areas, bounding boxes) the
//! mappings and the gather/scatter channel need.

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared mesh handle. Mappings hold one per side and the gather/scatter
/// channel holds one for its coordinator mesh.
pub type MeshHandle = Arc<RwLock<Mesh>>;

/// Identifier of a data channel within its mesh.
pub type DataId = usize;

/// Dense, 0-based local vertex identifier.
pub type VertexId = usize;

/// A point in 2-D or 3-D space with ownership and tagging state.
///
/// Coordinates are stored as `[f64; 3]` with a zero `z` component for 2-D
/// meshes. The local id is the vertex position in its mesh; the global index
/// is unique across all ranks once a distribution is fixed. Exactly one rank
/// owns each global index.
#[derive(Debug, Clone)]
pub struct Vertex {
    coords: [f64; 3],
    id: VertexId,
    global_index: usize,
    owner: bool,
    tagged: bool,
}

impl Vertex {
    pub fn coords(&self) -> &[f64; 3] {
        &self.coords
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn global_index(&self) -> usize {
        self.global_index
    }

    pub fn set_global_index(&mut self, global_index: usize) {
        self.global_index = global_index;
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn set_owner(&mut self, owner: bool) {
        self.owner = owner;
    }

    /// Marks the vertex during a two-round tag pass.
    pub fn tag(&mut self) {
        self.tagged = true;
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged
    }
}

/// An unordered pair of vertices with a derived length.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    vertices: [VertexId; 2],
}

impl Edge {
    pub fn vertices(&self) -> [VertexId; 2] {
        self.vertices
    }
}

/// Three edges forming a face, with the derived vertex triple.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    edges: [usize; 3],
    vertices: [VertexId; 3],
}

impl Triangle {
    pub fn edges(&self) -> [usize; 3] {
        self.edges
    }

    pub fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }
}

/// A dense per-vertex data channel.
///
/// Component `d` of vertex `i` lives at `i * dimensions + d`.
#[derive(Debug, Clone)]
pub struct Data {
    name: String,
    dimensions: usize,
    values: Vec<f64>,
}

impl Data {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of value components per vertex.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

/// Axis-aligned bounding box over vertex coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    min: [f64; 3],
    max: [f64; 3],
}

impl BoundingBox {
    /// An empty box that contains nothing until extended.
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn from_vertices<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> Self {
        let mut bounds = Self::empty();
        for vertex in vertices {
            bounds.extend(vertex.coords());
        }
        bounds
    }

    pub fn extend(&mut self, point: &[f64; 3]) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(point[d]);
            self.max[d] = self.max[d].max(point[d]);
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded_by(mut self, margin: f64) -> Self {
        for d in 0..3 {
            self.min[d] -= margin;
            self.max[d] += margin;
        }
        self
    }

    pub fn contains(&self, point: &[f64; 3]) -> bool {
        (0..3).all(|d| point[d] >= self.min[d] && point[d] <= self.max[d])
    }
}

/// Maps each rank to the ordered sequence of global vertex indices it holds.
///
/// The union over all ranks covers `[0, global_count)`. Rank 0 orders its
/// entries the same way as the coordinator's local vertex sequence, which
/// makes the scatter the exact inverse of the gather. A global index may
/// appear on several ranks (halo) but is owned by exactly one.
#[derive(Debug, Clone, Default)]
pub struct VertexDistribution {
    ranks: Vec<Vec<usize>>,
}

impl VertexDistribution {
    pub fn new(ranks: Vec<Vec<usize>>) -> Self {
        Self { ranks }
    }

    /// Number of ranks described by this distribution.
    pub fn size(&self) -> usize {
        self.ranks.len()
    }

    /// The ordered global indices held by `rank`.
    pub fn rank(&self, rank: usize) -> &[usize] {
        &self.ranks[rank]
    }

    /// Smallest global vertex count covering every listed index.
    pub fn covered_count(&self) -> usize {
        self.ranks
            .iter()
            .flatten()
            .copied()
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// An ordered collection of vertices, edges, and triangles with named data
/// channels.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    dimensions: usize,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    triangles: Vec<Triangle>,
    data: Vec<Data>,
    global_vertex_count: Option<usize>,
    vertex_distribution: Option<VertexDistribution>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        assert!(
            (2..=3).contains(&dimensions),
            "unsupported mesh dimensionality: {dimensions}"
        );
        Self {
            name: name.into(),
            dimensions,
            vertices: Vec::new(),
            edges: Vec::new(),
            triangles: Vec::new(),
            data: Vec::new(),
            global_vertex_count: None,
            vertex_distribution: None,
        }
    }

    /// Wraps the mesh into a shared handle.
    pub fn into_handle(self) -> MeshHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Appends a vertex and returns its local id. New vertices are owned and
    /// carry their local id as a provisional global index.
    pub fn create_vertex(&mut self, coords: &[f64]) -> VertexId {
        assert_eq!(
            coords.len(),
            self.dimensions,
            "coordinate count does not match the mesh dimensionality"
        );
        let id = self.vertices.len();
        let mut point = [0.0; 3];
        point[..coords.len()].copy_from_slice(coords);
        self.vertices.push(Vertex {
            coords: point,
            id,
            global_index: id,
            owner: true,
            tagged: false,
        });
        id
    }

    pub fn create_edge(&mut self, v0: VertexId, v1: VertexId) -> usize {
        assert!(v0 < self.vertices.len() && v1 < self.vertices.len());
        assert_ne!(v0, v1, "an edge needs two distinct vertices");
        self.edges.push(Edge { vertices: [v0, v1] });
        self.edges.len() - 1
    }

    /// Builds a triangle from three connected edges.
    pub fn create_triangle(&mut self, e0: usize, e1: usize, e2: usize) -> usize {
        let mut corners = Vec::with_capacity(6);
        for edge in [e0, e1, e2] {
            corners.extend(self.edges[edge].vertices());
        }
        corners.sort_unstable();
        corners.dedup();
        assert_eq!(
            corners.len(),
            3,
            "triangle edges must connect exactly three vertices"
        );
        self.triangles.push(Triangle {
            edges: [e0, e1, e2],
            vertices: [corners[0], corners[1], corners[2]],
        });
        self.triangles.len() - 1
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Registers a data channel; values are sized by
    /// [`Mesh::allocate_data_values`].
    pub fn create_data(&mut self, name: impl Into<String>, dimensions: usize) -> DataId {
        assert!(dimensions > 0, "a data channel needs at least one component");
        self.data.push(Data {
            name: name.into(),
            dimensions,
            values: Vec::new(),
        });
        self.data.len() - 1
    }

    /// Sizes every data channel to `vertex_count * dimensions`, zero-filling
    /// new entries.
    pub fn allocate_data_values(&mut self) {
        let vertex_count = self.vertices.len();
        for data in &mut self.data {
            data.values.resize(vertex_count * data.dimensions, 0.0);
        }
    }

    pub fn data(&self, id: DataId) -> &Data {
        &self.data[id]
    }

    pub fn data_mut(&mut self, id: DataId) -> &mut Data {
        &mut self.data[id]
    }

    pub fn edge_length(&self, edge: &Edge) -> f64 {
        let [a, b] = edge.vertices();
        let u = self.vertices[a].coords();
        let v = self.vertices[b].coords();
        let mut dist = 0.0;
        for d in 0..3 {
            let diff = u[d] - v[d];
            dist += diff * diff;
        }
        dist.sqrt()
    }

    /// Flat triangle area via the cross product rule.
    pub fn triangle_area(&self, triangle: &Triangle) -> f64 {
        let [a, b, c] = triangle.vertices();
        let pa = self.vertices[a].coords();
        let pb = self.vertices[b].coords();
        let pc = self.vertices[c].coords();
        let u = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let v = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        let cross = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        0.5 * (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Total number of vertices across all ranks. Defaults to the local
    /// vertex count until set explicitly or through a distribution.
    pub fn global_vertex_count(&self) -> usize {
        self.global_vertex_count.unwrap_or(self.vertices.len())
    }

    pub fn set_global_vertex_count(&mut self, count: usize) {
        self.global_vertex_count = Some(count);
    }

    pub fn vertex_distribution(&self) -> Option<&VertexDistribution> {
        self.vertex_distribution.as_ref()
    }

    /// Installs the per-rank gather/scatter layout. The global vertex count
    /// is derived from the distribution unless already set.
    pub fn set_vertex_distribution(&mut self, distribution: VertexDistribution) {
        if self.global_vertex_count.is_none() {
            self.global_vertex_count = Some(distribution.covered_count());
        }
        self.vertex_distribution = Some(distribution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(name: &str) -> Mesh {
        let mut mesh = Mesh::new(name, 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.create_vertex(&[1.0, 1.0]);
        mesh.create_vertex(&[0.0, 1.0]);
        mesh
    }

    #[test]
    fn vertex_ids_are_dense_and_ordered() {
        let mesh = unit_square("square");
        for (i, vertex) in mesh.vertices().iter().enumerate() {
            assert_eq!(vertex.id(), i);
            assert_eq!(vertex.global_index(), i);
            assert!(vertex.is_owner());
            assert!(!vertex.is_tagged());
        }
    }

    #[test]
    fn edge_length_is_euclidean() {
        let mut mesh = Mesh::new("line", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[3.0, 4.0]);
        let edge = mesh.create_edge(0, 1);
        assert!((mesh.edge_length(&mesh.edges()[edge]) - 5.0).abs() < 1e-14);
    }

    #[test]
    fn triangle_area_from_edges() {
        let mut mesh = Mesh::new("tri", 3);
        mesh.create_vertex(&[0.0, 0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0, 0.0]);
        mesh.create_vertex(&[0.0, 1.0, 0.0]);
        let e0 = mesh.create_edge(0, 1);
        let e1 = mesh.create_edge(1, 2);
        let e2 = mesh.create_edge(2, 0);
        let t = mesh.create_triangle(e0, e1, e2);
        let triangle = mesh.triangles()[t];
        assert_eq!(triangle.vertices(), [0, 1, 2]);
        assert!((mesh.triangle_area(&triangle) - 0.5).abs() < 1e-14);
    }

    #[test]
    #[should_panic]
    fn disconnected_triangle_edges_are_rejected() {
        let mut mesh = Mesh::new("bad", 3);
        for i in 0..6 {
            mesh.create_vertex(&[i as f64, 0.0, 0.0]);
        }
        let e0 = mesh.create_edge(0, 1);
        let e1 = mesh.create_edge(2, 3);
        let e2 = mesh.create_edge(4, 5);
        mesh.create_triangle(e0, e1, e2);
    }

    #[test]
    fn data_layout_is_vertex_major() {
        let mut mesh = unit_square("square");
        let id = mesh.create_data("field", 2);
        mesh.allocate_data_values();
        assert_eq!(mesh.data(id).values().len(), 8);
        mesh.data_mut(id).values_mut()[2 * 2 + 1] = 7.5;
        assert_eq!(mesh.data(id).values()[5], 7.5);
        assert_eq!(mesh.data(id).dimensions(), 2);
    }

    #[test]
    fn bounding_box_contains_all_vertices_after_expansion() {
        let mesh = unit_square("square");
        let bounds = mesh.bounding_box();
        for vertex in mesh.vertices() {
            assert!(bounds.contains(vertex.coords()));
        }
        let grown = bounds.expanded_by(0.5);
        assert!(grown.contains(&[-0.4, -0.4, -0.4]));
        assert!(!grown.contains(&[-0.6, 0.0, 0.0]));
    }

    #[test]
    fn distribution_covers_and_counts() {
        let distribution = VertexDistribution::new(vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(distribution.size(), 2);
        assert_eq!(distribution.rank(1), &[2, 3]);
        assert_eq!(distribution.covered_count(), 4);

        let mut mesh = unit_square("square");
        mesh.set_vertex_distribution(distribution);
        assert_eq!(mesh.global_vertex_count(), 4);
    }

    #[test]
    fn halo_indices_keep_single_ownership() {
        // global index 1 lives on both ranks, owned on rank 0 only
        let distribution = VertexDistribution::new(vec![vec![0, 1], vec![1, 2]]);
        assert_eq!(distribution.covered_count(), 3);

        let mut mesh = Mesh::new("halo", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.vertices_mut()[1].set_owner(false);
        mesh.vertices_mut()[1].set_global_index(1);
        assert!(!mesh.vertex(1).is_owner());
    }
}
