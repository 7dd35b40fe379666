use nalgebra::DMatrix;
use num::Zero;
use std::ops::AddAssign;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Entry-wise comparison of two slices of equal length.
#[macro_export]
macro_rules! assert_slices_approx_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let x: &[f64] = &$x;
        let y: &[f64] = &$y;
        assert_eq!(x.len(), y.len(), "slices differ in length");
        let max_absdiff = $crate::max_abs_diff(x, y);
        if max_absdiff > $tol {
            println!("abstol: {:e}", $tol);
            println!("left: {:?}", x);
            println!("right: {:?}", y);
            println!("max abs diff: {:e}", max_absdiff);
        }
        assert!(max_absdiff <= $tol);
    }};
}

pub fn max_abs_diff(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

/// Sums coordinate triplets into a dense matrix. Duplicate entries accumulate.
pub fn dense_from_triplets<T>(nrows: usize, ncols: usize, rows: &[usize], cols: &[usize], values: &[T]) -> DMatrix<T>
where
    T: nalgebra::Scalar + Zero + AddAssign + Copy,
{
    assert_eq!(rows.len(), cols.len(), "row and column index arrays differ in length");
    assert_eq!(rows.len(), values.len(), "index and value arrays differ in length");
    let mut dense = DMatrix::zeros(nrows, ncols);
    for ((&i, &j), &v) in rows.iter().zip(cols).zip(values) {
        dense[(i, j)] += v;
    }
    dense
}
