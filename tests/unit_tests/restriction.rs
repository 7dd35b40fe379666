use crate::{dot, reference_ceed};
use matfree::prelude::*;
use matfree::proptest::{restriction_params, vector_values};
use proptest::prelude::*;

/// Three two-node elements on a line with four nodes.
fn line_restriction(ceed: &Ceed<f64>) -> ElemRestriction<f64> {
    ceed.elem_restriction(3, 2, 1, 1, 4, &[0, 1, 1, 2, 2, 3])
        .unwrap()
}

#[test]
fn gather_and_scatter_on_a_line() {
    let ceed = reference_ceed();
    let r = line_restriction(&ceed);
    assert_eq!(r.e_size(), 6);
    assert_eq!(r.element_e_size(), 2);

    let l = ceed.vector_from_slice(&[1.0, 2.0, 3.0, 4.0]);
    let mut e = r.create_evector();
    r.apply(TransposeMode::NoTranspose, &l, &mut e).unwrap();
    assert_eq!(e.to_vec(), vec![1.0, 2.0, 2.0, 3.0, 3.0, 4.0]);

    // The transpose adds into the output
    let mut sum = ceed.vector_from_slice(&[100.0, 0.0, 0.0, 0.0]);
    r.apply(TransposeMode::Transpose, &e, &mut sum).unwrap();
    assert_eq!(sum.to_vec(), vec![101.0, 4.0, 6.0, 4.0]);
}

#[test]
fn multiplicity_counts_references() {
    let ceed = reference_ceed();
    let r = line_restriction(&ceed);
    assert_eq!(r.multiplicity().to_vec(), vec![1.0, 2.0, 2.0, 1.0]);
}

#[test]
fn components_are_offset_by_the_component_stride() {
    let ceed = reference_ceed();
    // Two elements sharing node 1, two components stored in blocks of three
    let r = ceed
        .elem_restriction(2, 2, 2, 3, 6, &[0, 1, 1, 2])
        .unwrap();
    assert_eq!(r.entry(0, 1, 0), (3, 1.0));
    assert_eq!(r.entry(1, 1, 1), (5, 1.0));

    let l = ceed.vector_from_slice(&[1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
    let mut e = r.create_evector();
    r.apply(TransposeMode::NoTranspose, &l, &mut e).unwrap();
    assert_eq!(e.to_vec(), vec![1.0, 2.0, 10.0, 20.0, 2.0, 3.0, 20.0, 30.0]);
}

#[test]
fn strided_restriction() {
    let ceed = reference_ceed();
    // Element data stored contiguously per element: node fastest, then component, then element
    let r = ceed
        .strided_elem_restriction(2, 3, 2, 12, [1, 3, 6])
        .unwrap();
    assert_eq!(r.entry(1, 1, 2), (11, 1.0));

    let values: Vec<f64> = (0..12).map(f64::from).collect();
    let l = ceed.vector_from_slice(&values);
    let mut e = r.create_evector();
    r.apply(TransposeMode::NoTranspose, &l, &mut e).unwrap();
    assert_eq!(e.to_vec(), values);
}

#[test]
fn oriented_restriction_flips_signs_both_ways() {
    let ceed = reference_ceed();
    let r = ceed
        .oriented_elem_restriction(2, 2, 1, 1, 3, &[0, 1, 1, 2], &[false, false, true, false])
        .unwrap();
    assert!(r.is_oriented());
    assert_eq!(r.entry(1, 0, 0), (1, -1.0));

    let l = ceed.vector_from_slice(&[1.0, 2.0, 3.0]);
    let mut e = r.create_evector();
    r.apply(TransposeMode::NoTranspose, &l, &mut e).unwrap();
    assert_eq!(e.to_vec(), vec![1.0, 2.0, -2.0, 3.0]);

    let mut back = r.create_lvector();
    r.apply(TransposeMode::Transpose, &e, &mut back).unwrap();
    assert_eq!(back.to_vec(), vec![1.0, 4.0, 3.0]);

    // Orientation does not affect the multiplicity
    assert_eq!(r.multiplicity().to_vec(), vec![1.0, 2.0, 1.0]);
}

#[test]
fn permuted_restriction_reorders_local_nodes() {
    let ceed = reference_ceed();
    let r = ceed
        .permuted_elem_restriction(1, 3, 1, 1, 3, &[0, 1, 2], &[2, 0, 1])
        .unwrap();
    assert_eq!(r.entry(0, 0, 0), (2, 1.0));
    assert_eq!(r.entry(0, 0, 1), (0, 1.0));

    let l = ceed.vector_from_slice(&[10.0, 20.0, 30.0]);
    let mut e = r.create_evector();
    r.apply(TransposeMode::NoTranspose, &l, &mut e).unwrap();
    assert_eq!(e.to_vec(), vec![30.0, 10.0, 20.0]);
}

#[test]
fn apply_block_gathers_a_range_of_elements() {
    let ceed = reference_ceed();
    let r = line_restriction(&ceed);
    let l = [1.0, 2.0, 3.0, 4.0];
    let mut block = vec![0.0; 4];
    r.apply_block(TransposeMode::NoTranspose, 1..3, &l, &mut block)
        .unwrap();
    assert_eq!(block, vec![2.0, 3.0, 3.0, 4.0]);

    assert!(r
        .apply_block(TransposeMode::NoTranspose, 2..4, &l, &mut block)
        .is_err());
}

#[test]
fn invalid_restrictions_are_rejected_at_creation() {
    let ceed = reference_ceed();
    let invalid = [
        // Offset out of bounds
        ceed.elem_restriction(1, 2, 1, 1, 2, &[0, 2]),
        // Second component out of bounds
        ceed.elem_restriction(1, 2, 2, 2, 3, &[0, 1]),
        // Wrong number of offsets
        ceed.elem_restriction(2, 2, 1, 1, 4, &[0, 1, 2]),
        // Zero element size
        ceed.elem_restriction(1, 0, 1, 1, 4, &[]),
        // Not a permutation
        ceed.permuted_elem_restriction(1, 2, 1, 1, 2, &[0, 1], &[1, 1]),
        // Orientation of wrong length
        ceed.oriented_elem_restriction(1, 2, 1, 1, 2, &[0, 1], &[true]),
        // Strides out of bounds
        ceed.strided_elem_restriction(2, 2, 1, 3, [1, 2, 2]),
        // Offsets and strides whose extent overflows
        ceed.elem_restriction(1, 2, 2, 1, 4, &[0, usize::MAX]),
        ceed.elem_restriction(1, 2, 2, usize::MAX, 4, &[0, 1]),
        ceed.strided_elem_restriction(2, 2, 1, 4, [usize::MAX, 1, 1]),
        ceed.strided_elem_restriction(2, 2, 1, 4, [1, 1, usize::MAX]),
        // E-vector size overflows
        ceed.elem_restriction(usize::MAX, 2, 1, 1, 4, &[]),
    ];
    for result in invalid {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.object(), Some("ElemRestriction"));
    }
}

#[test]
fn vectors_of_the_wrong_length_are_rejected() {
    let ceed = reference_ceed();
    let r = line_restriction(&ceed);
    let l = ceed.vector(5);
    let mut e = r.create_evector();
    assert!(r.apply(TransposeMode::NoTranspose, &l, &mut e).is_err());
}

#[test]
#[should_panic(expected = "element index out of bounds")]
fn entry_panics_for_element_out_of_bounds() {
    let ceed = reference_ceed();
    line_restriction(&ceed).entry(3, 0, 0);
}

#[test]
#[should_panic(expected = "node index out of bounds")]
fn entry_panics_for_node_out_of_bounds() {
    let ceed = reference_ceed();
    line_restriction(&ceed).entry(0, 0, 2);
}

proptest! {
    #[test]
    fn gather_and_scatter_are_adjoint(
        (params, u, v) in restriction_params(5, 4, 3, true)
            .prop_flat_map(|params| {
                let (l_size, e_size) = (params.l_size(), params.e_size());
                (Just(params), vector_values(l_size), vector_values(e_size))
            })
    ) {
        let ceed = reference_ceed();
        let r = params.build(&ceed).unwrap();
        let u_l = ceed.vector_from_slice(&u);
        let v_e = ceed.vector_from_slice(&v);

        let mut ru = r.create_evector();
        r.apply(TransposeMode::NoTranspose, &u_l, &mut ru).unwrap();
        let mut rt_v = r.create_lvector();
        r.apply(TransposeMode::Transpose, &v_e, &mut rt_v).unwrap();

        let lhs = dot(&ru.to_vec(), &v);
        let rhs = dot(&u, &rt_v.to_vec());
        prop_assert!((lhs - rhs).abs() <= 1e-9);
    }

    #[test]
    fn scatter_of_gather_scales_by_multiplicity(
        (params, u) in restriction_params(5, 4, 3, true)
            .prop_flat_map(|params| {
                let l_size = params.l_size();
                (Just(params), vector_values(l_size))
            })
    ) {
        let ceed = reference_ceed();
        let r = params.build(&ceed).unwrap();
        let u_l = ceed.vector_from_slice(&u);

        let mut e = r.create_evector();
        r.apply(TransposeMode::NoTranspose, &u_l, &mut e).unwrap();
        let mut round_trip = r.create_lvector();
        r.apply(TransposeMode::Transpose, &e, &mut round_trip).unwrap();

        // Orientation signs cancel in the round trip
        let multiplicity = r.multiplicity().to_vec();
        for ((&actual, &m), &x) in round_trip.to_vec().iter().zip(&multiplicity).zip(&u) {
            prop_assert!((actual - m * x).abs() <= 1e-12 * (1.0 + (m * x).abs()));
        }
    }

    #[test]
    fn multiplicity_is_scatter_of_ones(params in restriction_params(5, 4, 2, false)) {
        let ceed = reference_ceed();
        let r = params.build(&ceed).unwrap();
        let ones = r.create_evector();
        ones.set_value(1.0);
        let mut scattered = r.create_lvector();
        r.apply(TransposeMode::Transpose, &ones, &mut scattered).unwrap();
        prop_assert_eq!(scattered.to_vec(), r.multiplicity().to_vec());
    }
}
