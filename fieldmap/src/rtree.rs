/////////////////////////////////////////////////////////////////////////////////////////////
//
// Wraps the `rstar` crate to build spatial R-trees for nearest-vertex queries.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # rtree
//!
//! Wrapper module for the rstar crate.
//!
//! Builds a point R-tree over the vertices of a mesh and answers k-nearest
//! queries with a deterministic tie-break. The index is owned by the mapping
//! that built it and is rebuilt from the mesh on every `compute_mapping`, so
//! there is no process-wide cache to invalidate.

use crate::mesh::{Mesh, VertexId};
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint2 = GeomWithData<[f64; 2], usize>;
type IndexedPoint3 = GeomWithData<[f64; 3], usize>;

/// A per-dimensionality R-tree over mesh vertex coordinates.
pub enum VertexRTree {
    D2(RTree<IndexedPoint2>),
    D3(RTree<IndexedPoint3>),
}

impl VertexRTree {
    /// Bulk-loads an index over all vertices of `mesh`.
    pub fn build(mesh: &Mesh) -> Self {
        match mesh.dimensions() {
            2 => {
                let points = mesh
                    .vertices()
                    .iter()
                    .map(|v| GeomWithData::new([v.coords()[0], v.coords()[1]], v.id()))
                    .collect::<Vec<_>>();
                VertexRTree::D2(RTree::bulk_load(points))
            }
            3 => {
                let points = mesh
                    .vertices()
                    .iter()
                    .map(|v| GeomWithData::new(*v.coords(), v.id()))
                    .collect::<Vec<_>>();
                VertexRTree::D3(RTree::bulk_load(points))
            }
            other => panic!("unsupported mesh dimensionality: {other}"),
        }
    }

    /// Returns the ids of the `k` vertices nearest to `coords`.
    ///
    /// Vertices at equal distance are ordered by smallest local id, so the
    /// result is deterministic regardless of tree layout.
    pub fn nearest(&self, coords: &[f64; 3], k: usize) -> Vec<VertexId> {
        match self {
            VertexRTree::D2(tree) => k_nearest(tree, [coords[0], coords[1]], k),
            VertexRTree::D3(tree) => k_nearest(tree, *coords, k),
        }
    }
}

fn k_nearest<const D: usize>(
    tree: &RTree<GeomWithData<[f64; D], usize>>,
    point: [f64; D],
    k: usize,
) -> Vec<VertexId>
where
    [f64; D]: rstar::Point<Scalar = f64>,
{
    if k == 0 {
        return Vec::new();
    }
    // Pull candidates in ascending distance order and keep collecting while
    // the distance still ties with the k-th best, so ties can be resolved by
    // vertex id afterwards.
    let mut hits: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
    for (geom, distance2) in tree.nearest_neighbor_iter_with_distance_2(&point) {
        if hits.len() >= k && distance2 > hits[k - 1].0 {
            break;
        }
        hits.push((distance2, geom.data));
    }
    hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    hits.truncate(k);
    hits.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn square_mesh() -> Mesh {
        let mut mesh = Mesh::new("square", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.create_vertex(&[1.0, 1.0]);
        mesh.create_vertex(&[0.0, 1.0]);
        mesh
    }

    #[test]
    fn nearest_single_vertex_2d() {
        let mesh = square_mesh();
        let tree = VertexRTree::build(&mesh);
        assert_eq!(tree.nearest(&[0.9, 0.9, 0.0], 1), vec![2]);
        assert_eq!(tree.nearest(&[0.1, 0.8, 0.0], 1), vec![3]);
    }

    #[test]
    fn equidistant_query_picks_smallest_id() {
        let mesh = square_mesh();
        let tree = VertexRTree::build(&mesh);
        // (0.5, 0) ties between vertex 0 and vertex 1
        assert_eq!(tree.nearest(&[0.5, 0.0, 0.0], 1), vec![0]);
        // the mesh center ties between all four corners
        assert_eq!(tree.nearest(&[0.5, 0.5, 0.0], 1), vec![0]);
        assert_eq!(tree.nearest(&[0.5, 0.5, 0.0], 2), vec![0, 1]);
    }

    #[test]
    fn k_nearest_orders_by_distance_3d() {
        let mut mesh = Mesh::new("axis", 3);
        for x in 0..5 {
            mesh.create_vertex(&[x as f64, 0.0, 0.0]);
        }
        let tree = VertexRTree::build(&mesh);
        assert_eq!(tree.nearest(&[2.2, 0.0, 0.0], 3), vec![2, 3, 1]);
    }

    #[test]
    fn query_on_a_vertex_returns_it_first() {
        let mesh = square_mesh();
        let tree = VertexRTree::build(&mesh);
        assert_eq!(tree.nearest(&[1.0, 1.0, 0.0], 1), vec![2]);
    }

    fn random_mesh(n: usize, seed: u64) -> Mesh {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut mesh = Mesh::new("random", 3);
        for _ in 0..n {
            mesh.create_vertex(&[
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
            ]);
        }
        mesh
    }

    fn brute_force_nearest(mesh: &Mesh, query: &[f64; 3], k: usize) -> Vec<usize> {
        let mut hits: Vec<(f64, usize)> = mesh
            .vertices()
            .iter()
            .map(|v| {
                let d2 = v
                    .coords()
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>();
                (d2, v.id())
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.truncate(k);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    #[test]
    fn nearest_matches_bruteforce_3d() {
        let mesh = random_mesh(300, 42);
        let tree = VertexRTree::build(&mesh);
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..25 {
            let query = [
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
            ];
            for k in [1, 3, 7] {
                assert_eq!(tree.nearest(&query, k), brute_force_nearest(&mesh, &query, k));
            }
        }
    }
}
