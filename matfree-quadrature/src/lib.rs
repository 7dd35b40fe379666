//! Quadrature rules for tensor-product reference domains.
//!
//! The main purpose of this crate is to support the `matfree` operator library, which builds its
//! tensor-product bases from one-dimensional rules. The rules are plain `f64` data and may be used
//! independently of `matfree`.
//!
//! All rules live on the reference interval `[-1, 1]` (or its tensor products). Multi-dimensional
//! rules order their points with the first coordinate varying fastest.

pub mod tensor;
pub mod univariate;

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, p)| w * f(p))
        .sum()
}
