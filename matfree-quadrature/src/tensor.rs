//! Quadrature rules formed by tensor products of one-dimensional rules.
//!
//! For quadrilaterals and hexahedra, quadrature rules can be constructed as tensor products
//! of 1D rules. Points are ordered with the first coordinate varying fastest, which is the
//! ordering used by sum-factorized tensor bases.

use crate::univariate::{gauss, gauss_lobatto};
use crate::Rule;

/// Forms the `D`-dimensional tensor product of a one-dimensional rule.
pub fn tensor_product<const D: usize>(rule: &Rule<1>) -> Rule<D> {
    let (weights1d, points1d) = rule;
    let n = weights1d.len();
    let num_points = n.pow(D as u32);
    let mut weights = Vec::with_capacity(num_points);
    let mut points = Vec::with_capacity(num_points);

    for linear_index in 0..num_points {
        let mut remainder = linear_index;
        let mut w = 1.0;
        let mut point = [0.0; D];
        for coord in point.iter_mut() {
            let i = remainder % n;
            remainder /= n;
            w *= weights1d[i];
            *coord = points1d[i][0];
        }
        weights.push(w);
        points.push(point);
    }

    (weights, points)
}

/// A Gauss quadrature rule for the reference quadrilateral `[-1, 1]^2`.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided number of
/// points per dimension.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    tensor_product(&gauss(num_points_per_dim))
}

/// A Gauss quadrature rule for the reference hexahedron `[-1, 1]^3`.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided number of
/// points per dimension.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    tensor_product(&gauss(num_points_per_dim))
}

/// A Gauss-Lobatto rule for the reference quadrilateral `[-1, 1]^2`.
///
/// # Panics
///
/// Panics if fewer than two points per dimension are requested.
pub fn quadrilateral_gauss_lobatto(num_points_per_dim: usize) -> Rule<2> {
    tensor_product(&gauss_lobatto(num_points_per_dim))
}

/// A Gauss-Lobatto rule for the reference hexahedron `[-1, 1]^3`.
///
/// # Panics
///
/// Panics if fewer than two points per dimension are requested.
pub fn hexahedron_gauss_lobatto(num_points_per_dim: usize) -> Rule<3> {
    tensor_product(&gauss_lobatto(num_points_per_dim))
}
