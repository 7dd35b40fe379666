use matfree::prelude::*;
use matfree::quadrature::univariate::gauss_lobatto;
use std::sync::Arc;

mod backends;
mod poisson;

/// Number of nodes in each direction of a structured mesh of `n` elements with `p` nodes per direction.
fn nodes_per_direction(n: usize, p: usize) -> usize {
    n * (p - 1) + 1
}

/// Offsets of a structured `nx x ny` mesh of quadrilaterals with `p x p` nodes each.
///
/// Nodes are numbered with x varying fastest, both globally and within each element.
fn structured_offsets(nx: usize, ny: usize, p: usize) -> Vec<usize> {
    let row_len = nodes_per_direction(nx, p);
    let mut offsets = Vec::with_capacity(nx * ny * p * p);
    for e in 0..nx * ny {
        let (col, row) = (e % nx, e / nx);
        let first = col * (p - 1) + row * (p - 1) * row_len;
        for k in 0..p {
            for j in 0..p {
                offsets.push(first + k * row_len + j);
            }
        }
    }
    offsets
}

/// Node coordinates of a structured mesh of the unit square, x components first, then y.
///
/// Element nodes sit at the mapped Gauss-Lobatto points, so the geometry is affine on every element.
fn structured_coordinates(nx: usize, ny: usize, p: usize) -> Vec<f64> {
    let (_, points) = gauss_lobatto(p);
    let coordinate = |n: usize, index: usize| {
        let (element, local) = if index == n * (p - 1) {
            (n - 1, p - 1)
        } else {
            (index / (p - 1), index % (p - 1))
        };
        (element as f64 + 0.5 * (points[local][0] + 1.0)) / n as f64
    };
    let (row_len, col_len) = (nodes_per_direction(nx, p), nodes_per_direction(ny, p));
    let num_nodes = row_len * col_len;
    let mut coords = vec![0.0; 2 * num_nodes];
    for j in 0..col_len {
        for i in 0..row_len {
            coords[j * row_len + i] = coordinate(nx, i);
            coords[num_nodes + j * row_len + i] = coordinate(ny, j);
        }
    }
    coords
}

/// Restriction of `size` values per quadrature point, stored contiguously per element.
fn quadrature_data_restriction(
    ceed: &Ceed<f64>,
    num_elem: usize,
    num_qpts: usize,
    size: usize,
) -> Arc<ElemRestriction<f64>> {
    let strides = [1, num_qpts, size * num_qpts];
    Arc::new(
        ceed.strided_elem_restriction(num_elem, num_qpts, size, num_elem * num_qpts * size, strides)
            .unwrap(),
    )
}

/// Mass and Poisson operators for a scalar field on a structured mesh of the unit square.
///
/// The quadrature data of both operators is computed by build operators running on `ceed`.
struct UnitSquareProblem {
    mass: Operator<f64>,
    poisson: Operator<f64>,
    num_nodes: usize,
}

impl UnitSquareProblem {
    fn new(ceed: &Ceed<f64>, nx: usize, ny: usize, p: usize, q: usize) -> Self {
        let num_elem = nx * ny;
        let num_nodes = nodes_per_direction(nx, p) * nodes_per_direction(ny, p);
        let offsets = structured_offsets(nx, ny, p);
        let restriction_x = Arc::new(
            ceed.elem_restriction(num_elem, p * p, 2, num_nodes, 2 * num_nodes, &offsets)
                .unwrap(),
        );
        let restriction_u = Arc::new(
            ceed.elem_restriction(num_elem, p * p, 1, num_nodes, num_nodes, &offsets)
                .unwrap(),
        );
        let basis_x = Arc::new(
            ceed.basis_tensor_h1_lagrange(2, 2, p, q, QuadMode::Gauss)
                .unwrap(),
        );
        let basis_u = Arc::new(
            ceed.basis_tensor_h1_lagrange(2, 1, p, q, QuadMode::Gauss)
                .unwrap(),
        );
        let coords = ceed.vector_from_slice(&structured_coordinates(nx, ny, p));

        let build = |name: &str, size: usize| {
            let restriction_q = quadrature_data_restriction(ceed, num_elem, q * q, size);
            let qf = Arc::new(ceed.q_function_by_name(name).unwrap());
            let op = ceed
                .operator(&qf)
                .unwrap()
                .field("dx", &restriction_x, &basis_x, VectorOpt::Active)
                .unwrap()
                .field("weights", RestrictionOpt::None, &basis_x, VectorOpt::None)
                .unwrap()
                .field("qdata", &restriction_q, BasisOpt::Collocated, VectorOpt::Active)
                .unwrap();
            let mut q_data = ceed.vector(restriction_q.l_size());
            op.apply(&coords, &mut q_data).unwrap();
            (restriction_q, Arc::new(q_data))
        };

        let (restriction_mass, q_data_mass) = build("Mass2DBuild", 1);
        let mass = ceed
            .operator(&Arc::new(ceed.q_function_by_name("MassApply").unwrap()))
            .unwrap()
            .with_name("mass")
            .field("u", &restriction_u, &basis_u, VectorOpt::Active)
            .unwrap()
            .field("qdata", &restriction_mass, BasisOpt::Collocated, &q_data_mass)
            .unwrap()
            .field("v", &restriction_u, &basis_u, VectorOpt::Active)
            .unwrap();

        let (restriction_poisson, q_data_poisson) = build("Poisson2DBuild", 3);
        let poisson = ceed
            .operator(&Arc::new(ceed.q_function_by_name("Poisson2DApply").unwrap()))
            .unwrap()
            .with_name("poisson")
            .field("du", &restriction_u, &basis_u, VectorOpt::Active)
            .unwrap()
            .field("qdata", &restriction_poisson, BasisOpt::Collocated, &q_data_poisson)
            .unwrap()
            .field("dv", &restriction_u, &basis_u, VectorOpt::Active)
            .unwrap();

        Self {
            mass,
            poisson,
            num_nodes,
        }
    }

    /// Nodal values of `f` at the mesh nodes.
    fn interpolate(&self, nx: usize, ny: usize, p: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        let coords = structured_coordinates(nx, ny, p);
        let (x, y) = coords.split_at(self.num_nodes);
        x.iter().zip(y).map(|(&x, &y)| f(x, y)).collect()
    }
}
