use nalgebra::DMatrix;

/// Interpolation and derivative matrices of the Lagrange polynomials on `nodes`, evaluated at
/// `points`.
///
/// Both matrices have one row per point and one column per node.
pub fn lagrange_matrices(nodes: &[f64], points: &[f64]) -> (DMatrix<f64>, DMatrix<f64>) {
    let p = nodes.len();
    let q = points.len();
    let mut interp = DMatrix::zeros(q, p);
    let mut grad = DMatrix::zeros(q, p);

    for (k, &x) in points.iter().enumerate() {
        for j in 0..p {
            let x_j = nodes[j];
            let mut value = 1.0;
            let mut derivative = 0.0;
            for (m, &x_m) in nodes.iter().enumerate() {
                if m == j {
                    continue;
                }
                // Product rule applied to the running product of linear factors
                derivative = derivative * (x - x_m) / (x_j - x_m) + value / (x_j - x_m);
                value *= (x - x_m) / (x_j - x_m);
            }
            interp[(k, j)] = value;
            grad[(k, j)] = derivative;
        }
    }

    (interp, grad)
}
