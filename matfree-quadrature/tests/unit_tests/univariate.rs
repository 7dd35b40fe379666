use matfree_quadrature::integrate;
use matfree_quadrature::univariate::{gauss, gauss_lobatto, try_gauss_lobatto};

use matrixcompare::assert_scalar_eq;

fn monomial_integral(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=64 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);

        // Also test that weights are positive
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let estimated_integral = integrate(&rule, |x| x[0].powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral(alpha), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_points_are_ascending_and_symmetric() {
    for n in 1..=20 {
        let (_, points) = gauss(n);
        assert!(points.windows(2).all(|pair| pair[0][0] < pair[1][0]));
        for i in 0..n {
            assert_scalar_eq!(points[i][0], -points[n - i - 1][0], comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn gauss_lobatto_rules_satisfy_expected_accuracy() {
    assert!(try_gauss_lobatto(0).is_none());
    assert!(try_gauss_lobatto(1).is_none());

    for n in 2..=32 {
        let expected_polynomial_degree = 2 * n - 3;
        let rule = gauss_lobatto(n);

        // Check that rule contains endpoints, like Gauss-Lobatto should
        assert_eq!(rule.1.first().unwrap(), &[-1.0]);
        assert_eq!(rule.1.last().unwrap(), &[1.0]);

        assert!(rule.0.iter().all(|&w| w > 0.0));
        assert!(rule.1.windows(2).all(|pair| pair[0][0] < pair[1][0]));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let estimated_integral = integrate(&rule, |x| x[0].powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral(alpha), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_lobatto_small_rules_match_closed_form() {
    let (weights, points) = gauss_lobatto(3);
    assert_eq!(points, vec![[-1.0], [0.0], [1.0]]);
    assert_scalar_eq!(weights[0], 1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 4.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[2], 1.0 / 3.0, comp = abs, tol = 1e-14);

    let (weights, points) = gauss_lobatto(4);
    let x = 1.0 / 5.0f64.sqrt();
    assert_scalar_eq!(points[1][0], -x, comp = abs, tol = 1e-14);
    assert_scalar_eq!(points[2][0], x, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[0], 1.0 / 6.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 5.0 / 6.0, comp = abs, tol = 1e-14);
}
