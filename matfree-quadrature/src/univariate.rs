//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Recurrence relation for Legendre polynomials.
///
/// Note: we use a formula for which derivatives are *not* defined at |x| == 1, so it is only
/// suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // The current value, i.e. p_n(x)
    p1: f64,
    // The previous value in the recurrence, i.e. p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        // Use recurrence relation
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // Use the standard recurrence relation
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (x * p1 - p2) / (x * x - 1.0)
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        (self.value(), self.derivative())
    }
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points. Given `n` points,
/// the rule integrates polynomials of order up to `2 n - 1` exactly. Points are returned in
/// ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Loosely based on the procedure used in
    // Numerical Recipes, The art of Scientific Computing, Third Edition (2007)
    let num_roots = n;
    let m = (num_roots + 1) / 2;

    let mut points = Vec::with_capacity(num_roots);
    let mut weights = Vec::with_capacity(num_roots);

    // Only find the first m roots. The remaining roots can be found by symmetry
    for i in 0..m {
        // Compute a fairly accurate initial guess
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (mut p, mut dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();

        // Newton's method, bounded so that a pathological guess cannot loop forever
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -p / dp;
            x += dx;
            let (p_new, dp_new) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
            p = p_new;
            dp = dp_new;
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        // Once a root is known, its corresponding weight is given explicitly by a standard
        // formula
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        points.push([x]);
        weights.push(w);
    }

    // Recover the remaining points and weights by symmetry
    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push([-points[mirror_idx][0]]);
        weights.push(weights[mirror_idx]);
    }

    assert_eq!(points.len(), weights.len());
    assert_eq!(points.len(), n, "Internal error: incorrect number of points produced");

    // Roots were found in descending order
    points.reverse();
    weights.reverse();

    (weights, points)
}

/// Gauss-Lobatto quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss-Lobatto rule] with the given number of points, or `None` if fewer than
/// two points are requested. The rule contains both endpoints and integrates polynomials of
/// order up to `2 n - 3` exactly. Its points are also the standard nodes of high-order
/// Lagrange bases.
///
/// [Gauss–Lobatto rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature#Gauss%E2%80%93Lobatto_rules
pub fn try_gauss_lobatto(num_points: usize) -> Option<Rule<1>> {
    let n = num_points;
    if n < 2 {
        return None;
    }

    // Interior points are the roots of P'_{n - 1}. We use the Newton iteration
    //  x <- x - (x P_{n-1}(x) - P_{n-2}(x)) / (n P_{n-1}(x)),
    // starting from the Chebyshev-Gauss-Lobatto points. The endpoints are fixed points.
    let degree = n - 1;
    let m = (n + 1) / 2;
    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    for i in 0..m {
        let mut x = -(PI * i as f64 / degree as f64).cos();
        if i > 0 {
            for _ in 0..MAX_NEWTON_ITERATIONS {
                let recurrence = LegendreRecurrence::evaluate(degree, x);
                let dx = (x * recurrence.p1 - recurrence.p2) / (n as f64 * recurrence.p1);
                x -= dx;
                if dx.abs() <= 1e-15 {
                    break;
                }
            }
        } else {
            x = -1.0;
        }
        let p = LegendreRecurrence::evaluate(degree, x).value();
        let w = 2.0 / ((degree * n) as f64 * p * p);

        points[i] = [x];
        weights[i] = w;
        points[n - i - 1] = [-x];
        weights[n - i - 1] = w;
    }

    // The middle point of an odd rule is exactly zero
    if n % 2 == 1 {
        points[n / 2] = [0.0];
    }

    Some((weights, points))
}

/// Gauss-Lobatto quadrature for the reference interval [-1, 1].
///
/// # Panics
///
/// Panics if fewer than two points are requested.
pub fn gauss_lobatto(num_points: usize) -> Rule<1> {
    try_gauss_lobatto(num_points).expect("Gauss-Lobatto rules need at least two points")
}

const MAX_NEWTON_ITERATIONS: usize = 100;
