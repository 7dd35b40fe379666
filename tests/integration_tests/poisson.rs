use super::{quadrature_data_restriction, UnitSquareProblem};
use matfree::nalgebra::DMatrix;
use matfree::prelude::*;
use std::sync::Arc;
use util::{assert_approx_matrix_eq, assert_slices_approx_eq};

/// Stiffness operator of linear elements on the line through `coords`.
fn line_stiffness(ceed: &Ceed<f64>, coords: &[f64]) -> Operator<f64> {
    let num_elem = coords.len() - 1;
    let num_nodes = coords.len();
    let offsets: Vec<usize> = (0..num_elem).flat_map(|e| [e, e + 1]).collect();
    let restriction = Arc::new(
        ceed.elem_restriction(num_elem, 2, 1, num_nodes, num_nodes, &offsets)
            .unwrap(),
    );
    let basis = Arc::new(
        ceed.basis_tensor_h1_lagrange(1, 1, 2, 2, QuadMode::Gauss)
            .unwrap(),
    );
    let restriction_q = quadrature_data_restriction(ceed, num_elem, 2, 1);

    let build = ceed
        .operator(&Arc::new(ceed.q_function_by_name("Poisson1DBuild").unwrap()))
        .unwrap()
        .field("dx", &restriction, &basis, VectorOpt::Active)
        .unwrap()
        .field("weights", RestrictionOpt::None, &basis, VectorOpt::None)
        .unwrap()
        .field("qdata", &restriction_q, BasisOpt::Collocated, VectorOpt::Active)
        .unwrap();
    let mut q_data = ceed.vector(restriction_q.l_size());
    build
        .apply(&ceed.vector_from_slice(coords), &mut q_data)
        .unwrap();

    ceed.operator(&Arc::new(ceed.q_function_by_name("Poisson1DApply").unwrap()))
        .unwrap()
        .field("du", &restriction, &basis, VectorOpt::Active)
        .unwrap()
        .field("qdata", &restriction_q, BasisOpt::Collocated, &Arc::new(q_data))
        .unwrap()
        .field("dv", &restriction, &basis, VectorOpt::Active)
        .unwrap()
}

#[test]
fn linear_stiffness_on_a_nonuniform_line() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/serial").unwrap();
    let coords = [0.0, 0.5, 1.5, 1.75];
    let op = line_stiffness(&ceed, &coords);

    // Element stiffness is [[1, -1], [-1, 1]] / h
    let mut expected = DMatrix::<f64>::zeros(4, 4);
    for e in 0..3 {
        let k = 1.0 / (coords[e + 1] - coords[e]);
        expected[(e, e)] += k;
        expected[(e + 1, e + 1)] += k;
        expected[(e, e + 1)] -= k;
        expected[(e + 1, e)] -= k;
    }
    let stiffness = DMatrix::from(&op.linear_assemble_csr().unwrap());
    assert_approx_matrix_eq!(&stiffness, &expected, abstol = 1e-13);

    let mut diagonal = ceed.vector(4);
    op.linear_assemble_diagonal(&mut diagonal).unwrap();
    assert_slices_approx_eq!(diagonal.to_vec(), [2.0, 3.0, 5.0, 4.0], abstol = 1e-13);

    // Linear functions are in the kernel away from the boundary
    let u = ceed.vector_from_slice(&coords);
    let mut v = ceed.vector(4);
    op.apply(&u, &mut v).unwrap();
    assert_slices_approx_eq!(v.to_vec(), [-1.0, 0.0, 0.0, 1.0], abstol = 1e-13);
}

#[test]
fn degenerate_elements_fail_the_build() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/serial").unwrap();
    let offsets = [0, 1];
    let restriction = Arc::new(
        ceed.elem_restriction(1, 2, 1, 2, 2, &offsets)
            .unwrap(),
    );
    let basis = Arc::new(
        ceed.basis_tensor_h1_lagrange(1, 1, 2, 2, QuadMode::Gauss)
            .unwrap(),
    );
    let restriction_q = quadrature_data_restriction(&ceed, 1, 2, 1);
    let build = ceed
        .operator(&Arc::new(ceed.q_function_by_name("Poisson1DBuild").unwrap()))
        .unwrap()
        .field("dx", &restriction, &basis, VectorOpt::Active)
        .unwrap()
        .field("weights", RestrictionOpt::None, &basis, VectorOpt::None)
        .unwrap()
        .field("qdata", &restriction_q, BasisOpt::Collocated, VectorOpt::Active)
        .unwrap();
    let mut q_data = ceed.vector(2);
    let err = build
        .apply(&ceed.vector_from_slice(&[1.0, 1.0]), &mut q_data)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.message().contains("singular Jacobian"));
}

#[test]
fn stiffness_on_the_unit_square_annihilates_linear_functions_in_the_interior() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/serial").unwrap();
    let (nx, ny, p, q) = (2, 2, 3, 4);
    let problem = UnitSquareProblem::new(&ceed, nx, ny, p, q);
    let n = problem.num_nodes;

    let ones = ceed.vector_from_slice(&vec![1.0; n]);
    let mut v = ceed.vector(n);
    problem.poisson.apply(&ones, &mut v).unwrap();
    assert!(v.norm(NormType::Max) < 1e-12);

    // A linear function only produces boundary fluxes
    let linear = problem.interpolate(nx, ny, p, |x, y| 2.0 * x - y + 0.5);
    let u = ceed.vector_from_slice(&linear);
    problem.poisson.apply(&u, &mut v).unwrap();
    let row_len = nx * (p - 1) + 1;
    let values = v.to_vec();
    for j in 1..row_len - 1 {
        for i in 1..row_len - 1 {
            assert!(values[j * row_len + i].abs() < 1e-12, "interior node ({}, {})", i, j);
        }
    }

    // u^T A u is the Dirichlet energy |grad u|^2 over the unit square
    let energy: f64 = linear.iter().zip(&values).map(|(a, b)| a * b).sum();
    assert!((energy - 5.0).abs() < 1e-12);

    let stiffness = DMatrix::from(&problem.poisson.linear_assemble_csr().unwrap());
    assert_approx_matrix_eq!(&stiffness, &stiffness.transpose(), abstol = 1e-12);
    let mut diagonal = ceed.vector(n);
    problem
        .poisson
        .linear_assemble_diagonal(&mut diagonal)
        .unwrap();
    let expected: Vec<f64> = stiffness.diagonal().iter().copied().collect();
    assert_slices_approx_eq!(diagonal.to_vec(), expected, abstol = 1e-12);
}

#[test]
fn composite_of_mass_and_stiffness() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/serial").unwrap();
    let (nx, ny, p, q) = (2, 1, 2, 3);
    let problem = UnitSquareProblem::new(&ceed, nx, ny, p, q);
    let n = problem.num_nodes;
    let helmholtz = ceed
        .composite_operator()
        .unwrap()
        .sub_operator(&problem.mass)
        .unwrap()
        .sub_operator(&problem.poisson)
        .unwrap();

    let expected = DMatrix::from(&problem.mass.linear_assemble_csr().unwrap())
        + DMatrix::from(&problem.poisson.linear_assemble_csr().unwrap());
    let assembled = DMatrix::from(&helmholtz.linear_assemble_csr().unwrap());
    assert_approx_matrix_eq!(&assembled, &expected, abstol = 1e-13);

    let values: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let u = ceed.vector_from_slice(&values);
    let mut v = ceed.vector(n);
    helmholtz.apply(&u, &mut v).unwrap();
    let expected_v = &expected * matfree::nalgebra::DVector::from_vec(values);
    assert_slices_approx_eq!(v.to_vec(), expected_v.as_slice(), abstol = 1e-13);
}
