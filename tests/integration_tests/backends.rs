use super::UnitSquareProblem;
use matfree::prelude::*;
use paste::paste;
use util::assert_slices_approx_eq;

const NX: usize = 3;
const NY: usize = 2;
const P: usize = 3;
const Q: usize = 4;

struct Results {
    mass: Vec<f64>,
    poisson: Vec<f64>,
    diagonal: Vec<f64>,
    assembled: Vec<f64>,
}

/// Applies and assembles the unit square operators on the backend selected by `resource`.
fn compute(resource: &str) -> Results {
    let ceed = Ceed::<f64>::init(resource).unwrap();
    let problem = UnitSquareProblem::new(&ceed, NX, NY, P, Q);
    let values = problem.interpolate(NX, NY, P, |x, y| (3.0 * x).sin() * (1.0 + y * y));
    let u = ceed.vector_from_slice(&values);

    let mut mass = ceed.vector(problem.num_nodes);
    problem.mass.apply(&u, &mut mass).unwrap();
    let mut poisson = ceed.vector(problem.num_nodes);
    problem.poisson.apply(&u, &mut poisson).unwrap();

    let mut diagonal = ceed.vector(problem.num_nodes);
    problem
        .poisson
        .linear_assemble_diagonal(&mut diagonal)
        .unwrap();
    let mut assembled = ceed.vector(problem.mass.num_assembled_entries().unwrap());
    problem.mass.linear_assemble(&mut assembled).unwrap();

    Results {
        mass: mass.to_vec(),
        poisson: poisson.to_vec(),
        diagonal: diagonal.to_vec(),
        assembled: assembled.to_vec(),
    }
}

fn reference() -> Results {
    compute("/cpu/self/ref/serial")
}

macro_rules! backend_tests {
    ($($name:ident => $resource:expr),* $(,)?) => {
        $(
            paste! {
                #[test]
                fn [<$name _resolves_to_the_requested_backend>]() {
                    let ceed = Ceed::<f64>::init($resource).unwrap();
                    assert!($resource.starts_with(ceed.resource()));
                }

                #[test]
                fn [<$name _apply_matches_reference>]() {
                    let (expected, result) = (reference(), compute($resource));
                    assert_slices_approx_eq!(result.mass, expected.mass, abstol = 1e-14);
                    assert_slices_approx_eq!(result.poisson, expected.poisson, abstol = 1e-13);
                }

                #[test]
                fn [<$name _assembly_matches_reference>]() {
                    let (expected, result) = (reference(), compute($resource));
                    assert_slices_approx_eq!(result.diagonal, expected.diagonal, abstol = 1e-13);
                    assert_slices_approx_eq!(result.assembled, expected.assembled, abstol = 1e-14);
                }
            }
        )*
    };
}

backend_tests!(
    blocked => "/cpu/self/ref/blocked",
    blocked_size_3 => "/cpu/self/ref/blocked/block_size=3",
    parallel => "/cpu/self/par",
    parallel_size_2 => "/cpu/self/par/block_size=2",
    device_emulation => "/cpu/self/devsim",
);

#[test]
fn parallel_apply_is_bitwise_identical_to_serial() {
    // Element contributions are scattered in element order on every backend
    for resource in ["/cpu/self/par", "/cpu/self/par/block_size=1", "/cpu/self/ref/blocked"] {
        let (expected, result) = (reference(), compute(resource));
        assert_eq!(result.mass, expected.mass, "{}", resource);
        assert_eq!(result.poisson, expected.poisson, "{}", resource);
    }
}

#[test]
fn device_results_are_synchronized_to_the_host() {
    let ceed = Ceed::<f64>::init("/cpu/self/devsim").unwrap();
    let problem = UnitSquareProblem::new(&ceed, 1, 1, 2, 2);
    let u = ceed.vector_from_slice(&vec![1.0; problem.num_nodes]);
    let mut v = ceed.vector(problem.num_nodes);
    problem.mass.apply(&u, &mut v).unwrap();
    assert!(v.is_valid(MemType::Device));
    assert!(!v.is_valid(MemType::Host));
    assert_slices_approx_eq!(v.to_vec(), [0.25; 4], abstol = 1e-14);
}
