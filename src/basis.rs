//! Bases evaluate element data at quadrature points.
//!
//! On the node side a basis acts on element data laid out as `[num_comp][num_nodes]`. On the
//! quadrature side the layout is `[q_comp][num_comp][num_qpts]`, where `q_comp` depends on the
//! evaluation mode: it is the number of reference directions for gradients, so component `c` of
//! the derivative in direction `d` is stored in field component `d * num_comp + c`. Several
//! elements are stored one after the other.
use crate::backend::Operation;
use crate::quadrature::univariate::{gauss, try_gauss_lobatto};
use crate::vector::Vector;
use crate::{Ceed, ElemTopology, Error, EvalMode, FunctionSpace, QuadMode, Real, Result, TransposeMode};
use contract::{tensor_contract, tensor_weights, with_contraction_buffers, ContractionBuffers};
use nalgebra::{convert, DMatrix};
use std::fmt;

mod contract;
mod lagrange;

pub use lagrange::lagrange_matrices;

pub struct Basis<T: Real> {
    ceed: Ceed<T>,
    num_comp: usize,
    kind: BasisKind<T>,
}

#[derive(Debug, Clone)]
enum BasisKind<T: Real> {
    Tensor(TensorBasis<T>),
    Dense(DenseBasis<T>),
    /// Data is already given at quadrature points.
    Collocated { num_qpts: usize },
}

#[derive(Debug, Clone)]
struct TensorBasis<T: Real> {
    dim: usize,
    interp_1d: DMatrix<T>,
    grad_1d: DMatrix<T>,
    q_ref_1d: Vec<T>,
    q_weight_1d: Vec<T>,
}

#[derive(Debug, Clone)]
struct DenseBasis<T: Real> {
    topology: ElemTopology,
    space: FunctionSpace,
    interp: DMatrix<T>,
    /// Gradient for H1, divergence for H(div) and curl for H(curl).
    derivative: DMatrix<T>,
    q_ref: Vec<T>,
    q_weight: Vec<T>,
}

impl<T: Real> TensorBasis<T> {
    fn p_1d(&self) -> usize {
        self.interp_1d.ncols()
    }

    fn q_1d(&self) -> usize {
        self.interp_1d.nrows()
    }

    fn matrices(&self, grad_direction: Option<usize>) -> Vec<&DMatrix<T>> {
        (0..self.dim)
            .map(|d| {
                if Some(d) == grad_direction {
                    &self.grad_1d
                } else {
                    &self.interp_1d
                }
            })
            .collect()
    }

    fn full_matrix(&self, grad_direction: Option<usize>) -> DMatrix<T> {
        let matrices = self.matrices(grad_direction);
        // The last direction varies slowest and forms the outermost Kronecker factor
        let mut full = matrices[self.dim - 1].clone();
        for d in (0..self.dim - 1).rev() {
            full = full.kronecker(matrices[d]);
        }
        full
    }
}

impl<T: Real> DenseBasis<T> {
    fn num_nodes(&self) -> usize {
        self.interp.ncols()
    }

    fn num_qpts(&self) -> usize {
        self.q_weight.len()
    }
}

fn curl_components(dim: usize) -> usize {
    if dim == 2 {
        1
    } else {
        3
    }
}

impl<T: Real> fmt::Debug for Basis<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Basis")
            .field("num_comp", &self.num_comp)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T: Real> fmt::Display for Basis<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BasisKind::Tensor(tensor) => write!(
                f,
                "tensor H1 Basis in {} dimensions with {} components, P = {}, Q = {}",
                tensor.dim,
                self.num_comp,
                tensor.p_1d(),
                tensor.q_1d()
            ),
            BasisKind::Dense(dense) => write!(
                f,
                "{:?} Basis on {:?} with {} components, {} nodes and {} quadrature points",
                dense.space,
                dense.topology,
                self.num_comp,
                dense.num_nodes(),
                dense.num_qpts()
            ),
            BasisKind::Collocated { num_qpts } => write!(
                f,
                "collocated Basis with {} components at {} quadrature points",
                self.num_comp, num_qpts
            ),
        }
    }
}

impl<T: Real> Basis<T> {
    pub(crate) fn collocated(ceed: &Ceed<T>, num_comp: usize, num_qpts: usize) -> Result<Self> {
        if num_comp == 0 || num_qpts == 0 {
            return Err(Error::configuration("number of components and quadrature points must be positive")
                .with_object("Basis"));
        }
        Ok(Self {
            ceed: ceed.clone(),
            num_comp,
            kind: BasisKind::Collocated { num_qpts },
        })
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    /// Dimension of the reference element. Collocated bases have no reference element and
    /// report zero.
    pub fn dim(&self) -> usize {
        match &self.kind {
            BasisKind::Tensor(tensor) => tensor.dim,
            BasisKind::Dense(dense) => dense.topology.dim(),
            BasisKind::Collocated { .. } => 0,
        }
    }

    pub fn topology(&self) -> Option<ElemTopology> {
        match &self.kind {
            BasisKind::Tensor(tensor) => ElemTopology::tensor_product(tensor.dim),
            BasisKind::Dense(dense) => Some(dense.topology),
            BasisKind::Collocated { .. } => None,
        }
    }

    pub fn function_space(&self) -> FunctionSpace {
        match &self.kind {
            BasisKind::Dense(dense) => dense.space,
            _ => FunctionSpace::H1,
        }
    }

    pub fn num_components(&self) -> usize {
        self.num_comp
    }

    pub fn num_nodes(&self) -> usize {
        match &self.kind {
            BasisKind::Tensor(tensor) => tensor.p_1d().pow(tensor.dim as u32),
            BasisKind::Dense(dense) => dense.num_nodes(),
            BasisKind::Collocated { num_qpts } => *num_qpts,
        }
    }

    pub fn num_quadrature_points(&self) -> usize {
        match &self.kind {
            BasisKind::Tensor(tensor) => tensor.q_1d().pow(tensor.dim as u32),
            BasisKind::Dense(dense) => dense.num_qpts(),
            BasisKind::Collocated { num_qpts } => *num_qpts,
        }
    }

    /// Number of nodes in one direction, for tensor product bases.
    pub fn num_nodes_1d(&self) -> Option<usize> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(tensor.p_1d()),
            _ => None,
        }
    }

    /// Number of quadrature points in one direction, for tensor product bases.
    pub fn num_quadrature_points_1d(&self) -> Option<usize> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(tensor.q_1d()),
            _ => None,
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self.kind, BasisKind::Tensor(_))
    }

    pub fn is_collocated(&self) -> bool {
        matches!(self.kind, BasisKind::Collocated { .. })
    }

    pub fn interp_1d(&self) -> Option<&DMatrix<T>> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(&tensor.interp_1d),
            _ => None,
        }
    }

    pub fn grad_1d(&self) -> Option<&DMatrix<T>> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(&tensor.grad_1d),
            _ => None,
        }
    }

    pub fn q_ref_1d(&self) -> Option<&[T]> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(&tensor.q_ref_1d),
            _ => None,
        }
    }

    pub fn q_weights_1d(&self) -> Option<&[T]> {
        match &self.kind {
            BasisKind::Tensor(tensor) => Some(&tensor.q_weight_1d),
            _ => None,
        }
    }

    /// Quadrature weights of all points of the reference element.
    pub fn q_weights(&self) -> Option<Vec<T>> {
        match &self.kind {
            BasisKind::Tensor(tensor) => {
                let mut weights = vec![T::zero(); self.num_quadrature_points()];
                tensor_weights(&tensor.q_weight_1d, tensor.dim, &mut weights);
                Some(weights)
            }
            BasisKind::Dense(dense) => Some(dense.q_weight.clone()),
            BasisKind::Collocated { .. } => None,
        }
    }

    /// Reference coordinates of all quadrature points, stored as `[dim][num_qpts]`.
    pub fn q_ref(&self) -> Option<Vec<T>> {
        match &self.kind {
            BasisKind::Tensor(tensor) => {
                let q = tensor.q_1d();
                let num_qpts = self.num_quadrature_points();
                let mut coords = vec![T::zero(); tensor.dim * num_qpts];
                for d in 0..tensor.dim {
                    for point in 0..num_qpts {
                        let index_1d = (point / q.pow(d as u32)) % q;
                        coords[d * num_qpts + point] = tensor.q_ref_1d[index_1d];
                    }
                }
                Some(coords)
            }
            BasisKind::Dense(dense) => Some(dense.q_ref.clone()),
            BasisKind::Collocated { .. } => None,
        }
    }

    /// Number of quadrature-side components per basis component for `eval_mode`.
    pub fn q_comp(&self, eval_mode: EvalMode) -> Result<usize> {
        let dim = self.dim();
        let q_comp = match (&self.kind, eval_mode) {
            (_, EvalMode::Weight) if !self.is_collocated() => Some(1),
            (BasisKind::Collocated { .. }, EvalMode::None | EvalMode::Interp) => Some(1),
            (BasisKind::Tensor(_), EvalMode::Interp) => Some(1),
            (BasisKind::Tensor(_), EvalMode::Grad) => Some(dim),
            (BasisKind::Dense(dense), mode) => match (dense.space, mode) {
                (FunctionSpace::H1, EvalMode::Interp) => Some(1),
                (FunctionSpace::H1, EvalMode::Grad) => Some(dim),
                (FunctionSpace::HDiv, EvalMode::Interp) => Some(dim),
                (FunctionSpace::HDiv, EvalMode::Div) => Some(1),
                (FunctionSpace::HCurl, EvalMode::Interp) => Some(dim),
                (FunctionSpace::HCurl, EvalMode::Curl) => Some(curl_components(dim)),
                _ => None,
            },
            _ => None,
        };
        q_comp.ok_or_else(|| {
            Error::configuration(format!("evaluation mode {} is not supported by {}", eval_mode, self))
                .with_object("Basis")
        })
    }

    /// Dense `Q^dim x P^dim` interpolation matrix of a single component.
    pub fn full_interp(&self) -> DMatrix<T> {
        match &self.kind {
            BasisKind::Tensor(tensor) => tensor.full_matrix(None),
            BasisKind::Dense(dense) => dense.interp.clone(),
            BasisKind::Collocated { num_qpts } => DMatrix::identity(*num_qpts, *num_qpts),
        }
    }

    /// Dense gradient matrix of a single component, with the rows of direction `d` in the
    /// block `d * num_qpts..(d + 1) * num_qpts`.
    pub fn full_grad(&self) -> Option<DMatrix<T>> {
        match &self.kind {
            BasisKind::Tensor(tensor) => {
                let q = self.num_quadrature_points();
                let p = self.num_nodes();
                let mut grad = DMatrix::zeros(tensor.dim * q, p);
                for d in 0..tensor.dim {
                    grad.rows_mut(d * q, q)
                        .copy_from(&tensor.full_matrix(Some(d)));
                }
                Some(grad)
            }
            BasisKind::Dense(dense) if dense.space == FunctionSpace::H1 => Some(dense.derivative.clone()),
            _ => None,
        }
    }

    /// Length of the data of one element on the node side and on the quadrature side.
    pub fn element_sizes(&self, eval_mode: EvalMode) -> Result<(usize, usize)> {
        let q_comp = self.q_comp(eval_mode)?;
        let num_qpts = self.num_quadrature_points();
        let q_size = match eval_mode {
            EvalMode::Weight => num_qpts,
            _ => q_comp * self.num_comp * num_qpts,
        };
        Ok((self.num_comp * self.num_nodes(), q_size))
    }

    /// Applies the basis to the data of `num_elem` elements.
    ///
    /// `u` is ignored for [`EvalMode::Weight`], which is only defined without transpose.
    pub fn apply(
        &self,
        num_elem: usize,
        t_mode: TransposeMode,
        eval_mode: EvalMode,
        u: Option<&Vector<T>>,
        v: &mut Vector<T>,
    ) -> Result<()> {
        let (node_size, q_size) = self.element_sizes(eval_mode)?;
        let (expected_u, expected_v) = match t_mode {
            TransposeMode::NoTranspose => (num_elem * node_size, num_elem * q_size),
            TransposeMode::Transpose => (num_elem * q_size, num_elem * node_size),
        };
        let u = match eval_mode {
            EvalMode::Weight => None,
            _ => Some(u.ok_or_else(|| {
                Error::configuration(format!("evaluation mode {} requires an input vector", eval_mode))
                    .with_object("Basis")
            })?),
        };
        let u_len = u.map_or(expected_u, |u| u.len());
        if (eval_mode != EvalMode::Weight && u_len != expected_u) || v.len() != expected_v {
            return Err(Error::configuration(format!(
                "expected input of length {} and output of length {}, got {} and {}",
                expected_u,
                expected_v,
                u_len,
                v.len()
            ))
            .with_object("Basis"));
        }
        self.ceed
            .backend_for(Operation::BasisApply)?
            .basis_apply(&self.ceed, self, num_elem, t_mode, eval_mode, u, v)
    }

    /// Applies the basis to element data stored in host slices.
    ///
    /// This is the computational kernel behind [`Basis::apply`]. The output is overwritten.
    pub fn apply_to_slices(
        &self,
        num_elem: usize,
        t_mode: TransposeMode,
        eval_mode: EvalMode,
        u: &[T],
        v: &mut [T],
    ) -> Result<()> {
        let (node_size, q_size) = self.element_sizes(eval_mode)?;
        let (in_size, out_size) = match t_mode {
            TransposeMode::NoTranspose => (node_size, q_size),
            TransposeMode::Transpose => (q_size, node_size),
        };
        if eval_mode == EvalMode::Weight {
            if t_mode == TransposeMode::Transpose {
                return Err(Error::configuration("quadrature weights can only be computed without transpose")
                    .with_object("Basis"));
            }
        } else if u.len() != num_elem * in_size {
            return Err(Error::configuration(format!(
                "expected input of length {}, got {}",
                num_elem * in_size,
                u.len()
            ))
            .with_object("Basis"));
        }
        if v.len() != num_elem * out_size {
            return Err(Error::configuration(format!(
                "expected output of length {}, got {}",
                num_elem * out_size,
                v.len()
            ))
            .with_object("Basis"));
        }
        if num_elem == 0 {
            return Ok(());
        }

        if eval_mode == EvalMode::Weight {
            let weights = self.q_weights().unwrap_or_default();
            for v_e in v.chunks_exact_mut(out_size) {
                v_e.copy_from_slice(&weights);
            }
            return Ok(());
        }

        let transpose = t_mode == TransposeMode::Transpose;
        match &self.kind {
            BasisKind::Collocated { .. } => v.copy_from_slice(u),
            BasisKind::Tensor(tensor) => with_contraction_buffers(|buffers: &mut ContractionBuffers<T>| {
                for (u_e, v_e) in u
                    .chunks_exact(in_size)
                    .zip(v.chunks_exact_mut(out_size))
                {
                    self.apply_tensor_element(tensor, transpose, eval_mode, u_e, v_e, buffers);
                }
            }),
            BasisKind::Dense(dense) => {
                let matrix = match eval_mode {
                    EvalMode::Interp => &dense.interp,
                    _ => &dense.derivative,
                };
                for (u_e, v_e) in u
                    .chunks_exact(in_size)
                    .zip(v.chunks_exact_mut(out_size))
                {
                    self.apply_dense_element(matrix, transpose, u_e, v_e);
                }
            }
        }
        Ok(())
    }

    fn apply_tensor_element(
        &self,
        tensor: &TensorBasis<T>,
        transpose: bool,
        eval_mode: EvalMode,
        u: &[T],
        v: &mut [T],
        buffers: &mut ContractionBuffers<T>,
    ) {
        match eval_mode {
            EvalMode::Grad => {
                let block = self.num_comp * self.num_quadrature_points();
                for d in 0..tensor.dim {
                    let matrices = tensor.matrices(Some(d));
                    if transpose {
                        let u_d = &u[d * block..(d + 1) * block];
                        tensor_contract(&matrices, self.num_comp, true, u_d, v, d > 0, buffers);
                    } else {
                        let v_d = &mut v[d * block..(d + 1) * block];
                        tensor_contract(&matrices, self.num_comp, false, u, v_d, false, buffers);
                    }
                }
            }
            _ => {
                let matrices = tensor.matrices(None);
                tensor_contract(&matrices, self.num_comp, transpose, u, v, false, buffers);
            }
        }
    }

    fn apply_dense_element(&self, matrix: &DMatrix<T>, transpose: bool, u: &[T], v: &mut [T]) {
        let p = self.num_nodes();
        let q = self.num_quadrature_points();
        let q_comp = matrix.nrows() / q;
        let nc = self.num_comp;
        v.fill(T::zero());
        for k in 0..q_comp {
            for c in 0..nc {
                for point in 0..q {
                    let row = k * q + point;
                    let q_index = (k * nc + c) * q + point;
                    for node in 0..p {
                        if transpose {
                            v[c * p + node] += matrix[(row, node)] * u[q_index];
                        } else {
                            v[q_index] += matrix[(row, node)] * u[c * p + node];
                        }
                    }
                }
            }
        }
    }
}

fn convert_slice<T: Real>(values: &[f64]) -> Vec<T> {
    values.iter().map(|&x| convert(x)).collect()
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        Err(
            Error::configuration(format!("expected {} of length {}, got {}", what, expected, actual))
                .with_object("Basis"),
        )
    } else {
        Ok(())
    }
}

impl<T: Real> Ceed<T> {
    /// A tensor product Lagrange basis with nodes at the Gauss-Lobatto points.
    ///
    /// `p` is the number of nodes and `q` the number of quadrature points in each direction.
    pub fn basis_tensor_h1_lagrange(
        &self,
        dim: usize,
        num_comp: usize,
        p: usize,
        q: usize,
        quad_mode: QuadMode,
    ) -> Result<Basis<T>> {
        let nodes = try_gauss_lobatto(p).ok_or_else(|| {
            Error::configuration(format!("a Lagrange basis needs at least 2 nodes, got {}", p)).with_object("Basis")
        })?;
        let (weights, points) = match quad_mode {
            QuadMode::Gauss if q >= 1 => gauss(q),
            QuadMode::GaussLobatto => try_gauss_lobatto(q).ok_or_else(|| {
                Error::configuration(format!("Gauss-Lobatto quadrature needs at least 2 points, got {}", q))
                    .with_object("Basis")
            })?,
            QuadMode::Gauss => {
                return Err(Error::configuration("Gauss quadrature needs at least 1 point").with_object("Basis"));
            }
        };
        let nodes: Vec<f64> = nodes.1.iter().map(|[x]| *x).collect();
        let points: Vec<f64> = points.iter().map(|[x]| *x).collect();
        let (interp, grad) = lagrange_matrices(&nodes, &points);

        self.tensor_basis(
            dim,
            num_comp,
            interp.map(|x| convert(x)),
            grad.map(|x| convert(x)),
            convert_slice(&points),
            convert_slice(&weights),
        )
    }

    /// A tensor product H1 basis from one-dimensional data.
    ///
    /// `interp_1d` and `grad_1d` are `q_1d x p_1d` matrices stored row by row.
    #[allow(clippy::too_many_arguments)]
    pub fn basis_tensor_h1(
        &self,
        dim: usize,
        num_comp: usize,
        p_1d: usize,
        q_1d: usize,
        interp_1d: &[T],
        grad_1d: &[T],
        q_ref_1d: &[T],
        q_weight_1d: &[T],
    ) -> Result<Basis<T>> {
        if p_1d == 0 || q_1d == 0 {
            return Err(
                Error::configuration("number of nodes and quadrature points must be positive").with_object("Basis"),
            );
        }
        check_len("interpolation matrix", interp_1d.len(), q_1d * p_1d)?;
        check_len("gradient matrix", grad_1d.len(), q_1d * p_1d)?;
        check_len("quadrature points", q_ref_1d.len(), q_1d)?;
        check_len("quadrature weights", q_weight_1d.len(), q_1d)?;
        self.tensor_basis(
            dim,
            num_comp,
            DMatrix::from_row_slice(q_1d, p_1d, interp_1d),
            DMatrix::from_row_slice(q_1d, p_1d, grad_1d),
            q_ref_1d.to_vec(),
            q_weight_1d.to_vec(),
        )
    }

    fn tensor_basis(
        &self,
        dim: usize,
        num_comp: usize,
        interp_1d: DMatrix<T>,
        grad_1d: DMatrix<T>,
        q_ref_1d: Vec<T>,
        q_weight_1d: Vec<T>,
    ) -> Result<Basis<T>> {
        if !(1..=3).contains(&dim) {
            return Err(Error::configuration(format!("tensor bases exist in 1, 2 or 3 dimensions, got {}", dim))
                .with_object("Basis"));
        }
        if num_comp == 0 {
            return Err(Error::configuration("number of components must be positive").with_object("Basis"));
        }
        Ok(Basis {
            ceed: self.clone(),
            num_comp,
            kind: BasisKind::Tensor(TensorBasis {
                dim,
                interp_1d,
                grad_1d,
                q_ref_1d,
                q_weight_1d,
            }),
        })
    }

    /// A non-tensor H1 basis.
    ///
    /// `interp` is `num_qpts x num_nodes`, `grad` is `dim * num_qpts x num_nodes`, both stored row
    /// by row. `q_ref` holds the reference coordinates as `[dim][num_qpts]`.
    #[allow(clippy::too_many_arguments)]
    pub fn basis_h1(
        &self,
        topology: ElemTopology,
        num_comp: usize,
        num_nodes: usize,
        num_qpts: usize,
        interp: &[T],
        grad: &[T],
        q_ref: &[T],
        q_weight: &[T],
    ) -> Result<Basis<T>> {
        let dim = topology.dim();
        self.dense_basis(
            FunctionSpace::H1,
            topology,
            num_comp,
            num_nodes,
            num_qpts,
            (interp, 1),
            (grad, dim),
            q_ref,
            q_weight,
        )
    }

    /// A basis for H(div), with vector valued interpolation and a scalar divergence.
    #[allow(clippy::too_many_arguments)]
    pub fn basis_hdiv(
        &self,
        topology: ElemTopology,
        num_comp: usize,
        num_nodes: usize,
        num_qpts: usize,
        interp: &[T],
        div: &[T],
        q_ref: &[T],
        q_weight: &[T],
    ) -> Result<Basis<T>> {
        let dim = topology.dim();
        self.dense_basis(
            FunctionSpace::HDiv,
            topology,
            num_comp,
            num_nodes,
            num_qpts,
            (interp, dim),
            (div, 1),
            q_ref,
            q_weight,
        )
    }

    /// A basis for H(curl). The curl has one component in 2D and three in 3D.
    #[allow(clippy::too_many_arguments)]
    pub fn basis_hcurl(
        &self,
        topology: ElemTopology,
        num_comp: usize,
        num_nodes: usize,
        num_qpts: usize,
        interp: &[T],
        curl: &[T],
        q_ref: &[T],
        q_weight: &[T],
    ) -> Result<Basis<T>> {
        let dim = topology.dim();
        self.dense_basis(
            FunctionSpace::HCurl,
            topology,
            num_comp,
            num_nodes,
            num_qpts,
            (interp, dim),
            (curl, curl_components(dim)),
            q_ref,
            q_weight,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn dense_basis(
        &self,
        space: FunctionSpace,
        topology: ElemTopology,
        num_comp: usize,
        num_nodes: usize,
        num_qpts: usize,
        (interp, interp_comp): (&[T], usize),
        (derivative, derivative_comp): (&[T], usize),
        q_ref: &[T],
        q_weight: &[T],
    ) -> Result<Basis<T>> {
        let dim = topology.dim();
        if num_comp == 0 || num_nodes == 0 || num_qpts == 0 {
            return Err(Error::configuration(
                "number of components, nodes and quadrature points must be positive",
            )
            .with_object("Basis"));
        }
        if space != FunctionSpace::H1 && dim < 2 {
            return Err(
                Error::configuration(format!("{:?} bases need a reference dimension of at least 2", space))
                    .with_object("Basis"),
            );
        }
        check_len("interpolation matrix", interp.len(), interp_comp * num_qpts * num_nodes)?;
        check_len("derivative matrix", derivative.len(), derivative_comp * num_qpts * num_nodes)?;
        check_len("quadrature points", q_ref.len(), dim * num_qpts)?;
        check_len("quadrature weights", q_weight.len(), num_qpts)?;
        Ok(Basis {
            ceed: self.clone(),
            num_comp,
            kind: BasisKind::Dense(DenseBasis {
                topology,
                space,
                interp: DMatrix::from_row_slice(interp_comp * num_qpts, num_nodes, interp),
                derivative: DMatrix::from_row_slice(derivative_comp * num_qpts, num_nodes, derivative),
                q_ref: q_ref.to_vec(),
                q_weight: q_weight.to_vec(),
            }),
        })
    }

    /// The identity basis for data that is already given at quadrature points.
    pub fn basis_collocated(&self, num_comp: usize, num_qpts: usize) -> Result<Basis<T>> {
        Basis::collocated(self, num_comp, num_qpts)
    }
}
