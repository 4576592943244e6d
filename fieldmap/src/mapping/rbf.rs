/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the dense radial basis function mapping with optional polynomial augmentation.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # rbf
//!
//! Global radial basis function interpolation between two meshes. The kernel
//! matrix is assembled over every center vertex, factorised once in
//! `compute_mapping`, and reused for every `map` call. Strictly positive
//! definite kernels go through a Cholesky factorisation; everything else,
//! including the polynomial-augmented saddle system, uses a column-pivoted
//! QR.
//!
//! The conservative direction is the discrete adjoint of the consistent
//! interpolation, so centers live on the output mesh and evaluation rows on
//! the input mesh; global sums are preserved exactly when the polynomial
//! term reproduces constants.

use crate::error::MappingError;
use crate::integral::rescale_consistent_output;
use crate::mapping::{Constraint, Mapping, MappingBase, MeshRequirement, Polynomial};
use crate::mesh::{BoundingBox, DataId, Mesh, MeshHandle};
use crate::polynomials;
use crate::comm::CommContext;
use faer::linalg::solvers::{ColPivQr, Llt, Solve};
use faer::{Mat, Side};
use fieldmap_kernels::{active_axes, distance, squared_distance, RadialBasisFunction};
use log::debug;
use std::sync::Arc;

/// Factorisation of the (possibly augmented) kernel matrix.
enum KernelDecomposition {
    Cholesky(Llt<f64>),
    ColPivQr(ColPivQr<f64>),
}

impl KernelDecomposition {
    fn factorize(matrix: Mat<f64>, strictly_positive_definite: bool) -> Result<Self, MappingError> {
        if strictly_positive_definite {
            match matrix.llt(Side::Lower) {
                Ok(llt) => Ok(KernelDecomposition::Cholesky(llt)),
                Err(_) => Err(MappingError::NotPositiveDefinite),
            }
        } else {
            let size = matrix.nrows();
            let qr = matrix.col_piv_qr();

            // Rank check: treat tiny diagonal entries of R as zero.
            let r = qr.thin_R();
            let tol = 1E-10;
            let thresh = tol * r.get(0, 0).abs();
            let rank = r
                .diagonal()
                .column_vector()
                .iter()
                .filter(|val| val.abs() > thresh)
                .count();
            if rank < size {
                return Err(MappingError::SingularSystem);
            }

            Ok(KernelDecomposition::ColPivQr(qr))
        }
    }

    fn solve(&self, rhs: &Mat<f64>) -> Mat<f64> {
        match self {
            KernelDecomposition::Cholesky(llt) => llt.solve(rhs),
            KernelDecomposition::ColPivQr(qr) => qr.solve(rhs),
        }
    }
}

/// Separate-polynomial state: the trend is fitted by least squares and the
/// kernel system interpolates the residual.
struct SeparatePolynomial {
    monomials_centers: Mat<f64>,
    monomials_eval: Mat<f64>,
}

/// Mapping state assembled by `compute_mapping`.
struct RbfSystem {
    decomposition: KernelDecomposition,
    /// Cross-kernel evaluation matrix, one row per evaluation vertex, one
    /// column per center (plus polynomial columns when augmented).
    eval_matrix: Mat<f64>,
    kernel_size: usize,
    separate: Option<SeparatePolynomial>,
}

/// Dense RBF mapping over all input centers.
pub struct RadialBasisFctMapping<B: RadialBasisFunction> {
    base: MappingBase,
    basis: B,
    active_axis: [bool; 3],
    polynomial: Polynomial,
    system: Option<RbfSystem>,
}

impl<B: RadialBasisFunction> RadialBasisFctMapping<B> {
    pub fn new(
        constraint: Constraint,
        dimensions: usize,
        basis: B,
        dead_axis: [bool; 3],
        polynomial: Polynomial,
        context: Arc<CommContext>,
    ) -> Self {
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
        assert!(
            !(constraint == Constraint::Conservative && polynomial == Polynomial::Separate),
            "conservative mapping does not support a separately fitted polynomial"
        );

        Self {
            base,
            basis,
            active_axis,
            polynomial,
            system: None,
        }
    }

    /// Assembles the symmetric kernel matrix over the centers, rejecting
    /// coincident centers that would make the system singular.
    fn assemble_kernel_matrix(&self, centers: &Mesh, q: usize) -> Result<Mat<f64>, MappingError> {
        let n = centers.vertices().len();
        let mut matrix = Mat::<f64>::zeros(n + q, n + q);

        for i in 0..n {
            let u = centers.vertex(i).coords();
            for j in 0..=i {
                let v = centers.vertex(j).coords();
                if i != j && squared_distance(u, v, &self.active_axis) == 0.0 {
                    return Err(MappingError::SingularSystem);
                }
                let value = self.basis.evaluate(distance(u, v, &self.active_axis));
                matrix[(i, j)] = value;
                matrix[(j, i)] = value;
            }
        }

        if q > 0 {
            let monomials =
                polynomials::evaluate_monomials(centers.vertices(), self.base.dimensions, &self.active_axis);
            for i in 0..n {
                for p in 0..q {
                    matrix[(i, n + p)] = monomials[(i, p)];
                    matrix[(n + p, i)] = monomials[(i, p)];
                }
            }
        }

        Ok(matrix)
    }

    /// Assembles the evaluation matrix: kernel values of every evaluation
    /// vertex against every center, plus matching polynomial columns.
    fn assemble_eval_matrix(&self, centers: &Mesh, eval: &Mesh, q: usize) -> Mat<f64> {
        let n = centers.vertices().len();
        let m = eval.vertices().len();
        let mut matrix = Mat::<f64>::zeros(m, n + q);

        for k in 0..m {
            let u = eval.vertex(k).coords();
            for j in 0..n {
                let v = centers.vertex(j).coords();
                matrix[(k, j)] = self.basis.evaluate(distance(u, v, &self.active_axis));
            }
        }

        if q > 0 {
            let monomials =
                polynomials::evaluate_monomials(eval.vertices(), self.base.dimensions, &self.active_axis);
            for k in 0..m {
                for p in 0..q {
                    matrix[(k, n + p)] = monomials[(k, p)];
                }
            }
        }

        matrix
    }
}

impl<B: RadialBasisFunction> Mapping for RadialBasisFctMapping<B> {
    fn set_meshes(&mut self, input: MeshHandle, output: MeshHandle) {
        self.base.set_meshes(input, output);
    }

    fn constraint(&self) -> Constraint {
        self.base.constraint
    }

    fn compute_mapping(&mut self) -> Result<(), MappingError> {
        let centers_handle = self.base.searched_mesh();
        let eval_handle = self.base.reference_mesh();
        let centers = centers_handle.read();
        let eval = eval_handle.read();
        assert!(
            !centers.vertices().is_empty(),
            "kernel mapping needs at least one center vertex"
        );
        debug!(
            "computing RBF mapping with {} centers and {} evaluation vertices",
            centers.vertices().len(),
            eval.vertices().len()
        );

        let q = match self.polynomial {
            Polynomial::On => polynomials::basis_size(self.base.dimensions, &self.active_axis),
            _ => 0,
        };

        let kernel_matrix = self.assemble_kernel_matrix(&centers, q)?;
        // the saddle augmentation is indefinite, so only the plain system
        // may use Cholesky
        let decomposition = KernelDecomposition::factorize(
            kernel_matrix,
            B::STRICTLY_POSITIVE_DEFINITE && q == 0,
        )?;
        let eval_matrix = self.assemble_eval_matrix(&centers, &eval, q);

        let separate = match self.polynomial {
            Polynomial::Separate => Some(SeparatePolynomial {
                monomials_centers: polynomials::evaluate_monomials(
                    centers.vertices(),
                    self.base.dimensions,
                    &self.active_axis,
                ),
                monomials_eval: polynomials::evaluate_monomials(
                    eval.vertices(),
                    self.base.dimensions,
                    &self.active_axis,
                ),
            }),
            _ => None,
        };

        self.system = Some(RbfSystem {
            decomposition,
            eval_matrix,
            kernel_size: centers.vertices().len(),
            separate,
        });
        self.base.has_computed = true;
        Ok(())
    }

    fn has_computed_mapping(&self) -> bool {
        self.base.has_computed
    }

    fn clear(&mut self) {
        self.system = None;
        self.base.has_computed = false;
    }

    fn map(&mut self, input_data: DataId, output_data: DataId) -> Result<(), MappingError> {
        assert!(
            self.base.has_computed,
            "map() called before compute_mapping()"
        );
        let system = self
            .system
            .as_ref()
            .expect("mapping state missing after compute_mapping");

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

        let n = system.kernel_size;
        let in_values = input.data(input_data).values();

        match self.base.constraint {
            Constraint::Conservative => {
                // adjoint direction: input values live on the evaluation
                // rows, the solve lands on the centers
                let m = system.eval_matrix.nrows();
                assert_eq!(in_values.len(), m * value_dim);
                let yin = Mat::<f64>::from_fn(m, value_dim, |i, d| in_values[i * value_dim + d]);
                let epsilon = system.eval_matrix.transpose() * &yin;
                let beta = system.decomposition.solve(&epsilon);

                let out_values = output.data_mut(output_data).values_mut();
                assert_eq!(out_values.len(), n * value_dim);
                for i in 0..n {
                    for d in 0..value_dim {
                        out_values[i * value_dim + d] = beta[(i, d)];
                    }
                }
            }
            _ => {
                assert_eq!(in_values.len(), n * value_dim);
                let sys_cols = system.eval_matrix.ncols();
                let mut rhs = Mat::<f64>::zeros(sys_cols, value_dim);
                for i in 0..n {
                    for d in 0..value_dim {
                        rhs[(i, d)] = in_values[i * value_dim + d];
                    }
                }

                let prediction = match &system.separate {
                    Some(poly) => {
                        // least-squares trend via the normal equations, then
                        // kernel interpolation of the residual
                        let normal =
                            poly.monomials_centers.transpose() * &poly.monomials_centers;
                        let projected = poly.monomials_centers.transpose() * &rhs;
                        let trend = normal.full_piv_lu().solve(&projected);
                        let fitted = &poly.monomials_centers * &trend;
                        let residual = &rhs - &fitted;
                        let alpha = system.decomposition.solve(&residual);
                        let kernel_part = &system.eval_matrix * &alpha;
                        let trend_part = &poly.monomials_eval * &trend;
                        &kernel_part + &trend_part
                    }
                    None => {
                        let alpha = system.decomposition.solve(&rhs);
                        &system.eval_matrix * &alpha
                    }
                };

                let out_values = output.data_mut(output_data).values_mut();
                assert_eq!(out_values.len(), prediction.nrows() * value_dim);
                for j in 0..prediction.nrows() {
                    for d in 0..value_dim {
                        out_values[j * value_dim + d] = prediction[(j, d)];
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
        let tagged_handle = self.base.searched_mesh();

        if !self.basis.has_compact_support() {
            // a global kernel couples every center to every output vertex
            for vertex in tagged_handle.write().vertices_mut() {
                vertex.tag();
            }
            return Ok(());
        }

        let bounds = {
            let opposite_handle = self.base.reference_mesh();
            let opposite = opposite_handle.read();
            opposite.bounding_box().expanded_by(self.basis.support_radius())
        };
        for vertex in tagged_handle.write().vertices_mut() {
            if bounds.contains(vertex.coords()) {
                vertex.tag();
            }
        }
        Ok(())
    }

    fn tag_mesh_second_round(&mut self) -> Result<(), MappingError> {
        if !self.basis.has_compact_support() {
            return Ok(());
        }
        let tagged_handle = self.base.searched_mesh();
        let mut mesh = tagged_handle.write();
        let bounds =
            BoundingBox::from_vertices(mesh.vertices().iter().filter(|v| v.is_tagged()))
                .expanded_by(self.basis.support_radius());
        for vertex in mesh.vertices_mut() {
            if bounds.contains(vertex.coords()) {
                vertex.tag();
            }
        }
        Ok(())
    }

    fn input_requirement(&self) -> MeshRequirement {
        self.base.input_requirement
    }

    fn output_requirement(&self) -> MeshRequirement {
        self.base.output_requirement
    }
}
