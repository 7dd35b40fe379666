//! Strategies for property-based testing with `proptest`.
use crate::restriction::ElemRestriction;
use crate::{Ceed, Result};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

pub fn vector_values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    // Keep entries moderate so that accumulated round-off stays predictable
    vec(-10.0..10.0, len)
}

/// The data of an offset restriction with component-blocked storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictionParams {
    pub num_elem: usize,
    pub elem_size: usize,
    pub num_comp: usize,
    pub num_nodes: usize,
    pub offsets: Vec<usize>,
    /// Per-entry sign flips, if the restriction is oriented.
    pub orientations: Option<Vec<bool>>,
}

impl RestrictionParams {
    pub fn l_size(&self) -> usize {
        self.num_nodes * self.num_comp
    }

    pub fn e_size(&self) -> usize {
        self.num_elem * self.elem_size * self.num_comp
    }

    pub fn build(&self, ceed: &Ceed<f64>) -> Result<ElemRestriction<f64>> {
        match &self.orientations {
            None => ceed.elem_restriction(
                self.num_elem,
                self.elem_size,
                self.num_comp,
                self.num_nodes,
                self.l_size(),
                &self.offsets,
            ),
            Some(orientations) => ceed.oriented_elem_restriction(
                self.num_elem,
                self.elem_size,
                self.num_comp,
                self.num_nodes,
                self.l_size(),
                &self.offsets,
                orientations,
            ),
        }
    }
}

/// Restrictions with up to `max_elem` elements of up to `max_elem_size` nodes each.
///
/// Nodes may be shared by several elements or not referenced at all.
pub fn restriction_params(
    max_elem: usize,
    max_elem_size: usize,
    max_comp: usize,
    oriented: bool,
) -> impl Strategy<Value = RestrictionParams> {
    (1..=max_elem, 1..=max_elem_size, 1..=max_comp, 1..=max_elem * max_elem_size).prop_flat_map(
        move |(num_elem, elem_size, num_comp, num_nodes)| {
            let entries = num_elem * elem_size;
            let orientations = if oriented {
                vec(any::<bool>(), entries).prop_map(Some).boxed()
            } else {
                Just(None).boxed()
            };
            (vec(0..num_nodes, entries), orientations).prop_map(move |(offsets, orientations)| RestrictionParams {
                num_elem,
                elem_size,
                num_comp,
                num_nodes,
                offsets,
                orientations,
            })
        },
    )
}
