//! Element restrictions map between L-vectors and element-local E-vectors.
//!
//! The E-vector of a restriction is ordered by element, then component, then element node: the
//! value of component `c` at local node `i` of element `e` is stored at
//! `(e * num_comp + c) * elem_size + i`.
use crate::backend::Operation;
use crate::vector::Vector;
use crate::{Ceed, Error, Real, Result, TransposeMode};
use std::fmt;
use std::ops::Range;

/// How element entries are addressed in the L-vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestrictionLayout {
    /// Entry `(e, c, i)` lives at `offsets[e * elem_size + i] + c * comp_stride`.
    Offsets {
        offsets: Vec<usize>,
        comp_stride: usize,
        orientation: Orientation,
    },
    /// Entry `(e, c, i)` lives at `i * strides[0] + c * strides[1] + e * strides[2]`.
    Strided { strides: [usize; 3] },
}

/// Orientation of element entries relative to the L-vector entries they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Orientation {
    None,
    /// Entries flagged `true` change sign when gathered and scattered.
    Signs(Vec<bool>),
    /// Each element's slice is a permutation of `0..elem_size`: local node `i` of element `e`
    /// reads the offset at position `permutations[e * elem_size + i]` of that element.
    Permutations(Vec<usize>),
}

pub struct ElemRestriction<T: Real> {
    ceed: Ceed<T>,
    num_elem: usize,
    elem_size: usize,
    num_comp: usize,
    l_size: usize,
    layout: RestrictionLayout,
}

impl<T: Real> fmt::Debug for ElemRestriction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElemRestriction")
            .field("num_elem", &self.num_elem)
            .field("elem_size", &self.elem_size)
            .field("num_comp", &self.num_comp)
            .field("l_size", &self.l_size)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<T: Real> fmt::Display for ElemRestriction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.layout {
            RestrictionLayout::Offsets {
                orientation: Orientation::None,
                ..
            } => "ElemRestriction",
            RestrictionLayout::Offsets {
                orientation: Orientation::Signs(_),
                ..
            } => "oriented ElemRestriction",
            RestrictionLayout::Offsets {
                orientation: Orientation::Permutations(_),
                ..
            } => "permuted ElemRestriction",
            RestrictionLayout::Strided { .. } => "strided ElemRestriction",
        };
        write!(
            f,
            "{} from ({}, {}) to {} elements with {} nodes each",
            kind, self.l_size, self.num_comp, self.num_elem, self.elem_size
        )
    }
}

impl<T: Real> ElemRestriction<T> {
    fn new(
        ceed: &Ceed<T>,
        num_elem: usize,
        elem_size: usize,
        num_comp: usize,
        l_size: usize,
        layout: RestrictionLayout,
    ) -> Result<Self> {
        let restriction = Self {
            ceed: ceed.clone(),
            num_elem,
            elem_size,
            num_comp,
            l_size,
            layout,
        };
        restriction
            .validate()
            .map_err(|err| err.with_object("ElemRestriction"))?;
        Ok(restriction)
    }

    fn validate(&self) -> Result<()> {
        if self.elem_size == 0 || self.num_comp == 0 {
            return Err(Error::configuration("element size and number of components must be positive"));
        }
        let num_entries = self
            .num_elem
            .checked_mul(self.elem_size)
            .filter(|entries| entries.checked_mul(self.num_comp).is_some())
            .ok_or_else(|| Error::configuration("E-vector size overflows usize"))?;
        match &self.layout {
            RestrictionLayout::Offsets {
                offsets,
                comp_stride,
                orientation,
            } => {
                if offsets.len() != num_entries {
                    return Err(Error::configuration(format!(
                        "expected {} offsets for {} elements of size {}, got {}",
                        num_entries,
                        self.num_elem,
                        self.elem_size,
                        offsets.len()
                    )));
                }
                let comp_extent = (self.num_comp - 1).checked_mul(*comp_stride);
                let out_of_range = |offset: usize| {
                    comp_extent
                        .and_then(|extent| offset.checked_add(extent))
                        .map_or(true, |last| last >= self.l_size)
                };
                if let Some(&offset) = offsets.iter().find(|&&offset| out_of_range(offset)) {
                    return Err(Error::configuration(format!(
                        "offset {} with component stride {} addresses outside of L-vector of size {}",
                        offset, comp_stride, self.l_size
                    )));
                }
                match orientation {
                    Orientation::None => {}
                    Orientation::Signs(signs) => {
                        if signs.len() != num_entries {
                            return Err(Error::configuration(format!(
                                "expected {} orientations, got {}",
                                num_entries,
                                signs.len()
                            )));
                        }
                    }
                    Orientation::Permutations(permutations) => {
                        if permutations.len() != num_entries {
                            return Err(Error::configuration(format!(
                                "expected {} permutation entries, got {}",
                                num_entries,
                                permutations.len()
                            )));
                        }
                        let mut seen = vec![false; self.elem_size];
                        for (e, element_permutation) in permutations.chunks(self.elem_size).enumerate() {
                            seen.fill(false);
                            for &local in element_permutation {
                                if local >= self.elem_size || seen[local] {
                                    return Err(Error::configuration(format!(
                                        "local indices of element {} are not a permutation of 0..{}",
                                        e, self.elem_size
                                    )));
                                }
                                seen[local] = true;
                            }
                        }
                    }
                }
            }
            RestrictionLayout::Strided { strides } => {
                if self.num_elem > 0 {
                    let max_index = [self.elem_size - 1, self.num_comp - 1, self.num_elem - 1]
                        .iter()
                        .zip(strides)
                        .try_fold(0usize, |sum, (&count, &stride)| {
                            count
                                .checked_mul(stride)
                                .and_then(|extent| sum.checked_add(extent))
                        });
                    match max_index {
                        Some(max_index) if max_index < self.l_size => {}
                        Some(max_index) => {
                            return Err(Error::configuration(format!(
                                "strides {:?} address index {} outside of L-vector of size {}",
                                strides, max_index, self.l_size
                            )));
                        }
                        None => {
                            return Err(Error::configuration(format!(
                                "strides {:?} address indices beyond usize::MAX",
                                strides
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    pub fn num_elements(&self) -> usize {
        self.num_elem
    }

    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    pub fn num_components(&self) -> usize {
        self.num_comp
    }

    /// Distance in the L-vector between the entries of consecutive components.
    pub fn comp_stride(&self) -> usize {
        match &self.layout {
            RestrictionLayout::Offsets { comp_stride, .. } => *comp_stride,
            RestrictionLayout::Strided { strides } => strides[1],
        }
    }

    pub fn l_size(&self) -> usize {
        self.l_size
    }

    /// Length of the E-vector, `num_elem * num_comp * elem_size`.
    pub fn e_size(&self) -> usize {
        self.num_elem * self.element_e_size()
    }

    /// Length of the E-vector of a single element.
    pub fn element_e_size(&self) -> usize {
        self.num_comp * self.elem_size
    }

    pub fn layout(&self) -> &RestrictionLayout {
        &self.layout
    }

    pub fn is_oriented(&self) -> bool {
        matches!(
            self.layout,
            RestrictionLayout::Offsets {
                orientation: Orientation::Signs(_),
                ..
            }
        )
    }

    /// L-vector index and sign of component `c` at local node `i` of element `e`.
    ///
    /// # Panics
    ///
    /// Panics if `e`, `c` or `i` is out of bounds.
    pub fn entry(&self, e: usize, c: usize, i: usize) -> (usize, T) {
        assert!(e < self.num_elem, "element index out of bounds");
        assert!(c < self.num_comp, "component index out of bounds");
        assert!(i < self.elem_size, "node index out of bounds");
        match &self.layout {
            RestrictionLayout::Offsets {
                offsets,
                comp_stride,
                orientation,
            } => {
                let k = e * self.elem_size + i;
                match orientation {
                    Orientation::None => (offsets[k] + c * comp_stride, T::one()),
                    Orientation::Signs(signs) => {
                        let sign = if signs[k] { -T::one() } else { T::one() };
                        (offsets[k] + c * comp_stride, sign)
                    }
                    Orientation::Permutations(permutations) => {
                        let k = e * self.elem_size + permutations[k];
                        (offsets[k] + c * comp_stride, T::one())
                    }
                }
            }
            RestrictionLayout::Strided { strides } => (i * strides[0] + c * strides[1] + e * strides[2], T::one()),
        }
    }

    /// Applies the restriction to the elements in `elements`.
    ///
    /// With `NoTranspose`, `u` is an L-vector and `v` holds the E-vector entries of the given
    /// elements only, which are overwritten. With `Transpose`, `u` holds the E-vector entries of
    /// the given elements and is added into the L-vector `v`.
    pub fn apply_block(&self, t_mode: TransposeMode, elements: Range<usize>, u: &[T], v: &mut [T]) -> Result<()> {
        if elements.end > self.num_elem {
            return Err(Error::configuration(format!(
                "element range {:?} exceeds the {} elements of the restriction",
                elements, self.num_elem
            ))
            .with_object("ElemRestriction"));
        }
        let block_e_size = elements.len() * self.element_e_size();
        let (l, e) = match t_mode {
            TransposeMode::NoTranspose => (u.len(), v.len()),
            TransposeMode::Transpose => (v.len(), u.len()),
        };
        if l != self.l_size || e != block_e_size {
            return Err(Error::configuration(format!(
                "expected L-vector of length {} and E-vector block of length {}, got {} and {}",
                self.l_size, block_e_size, l, e
            ))
            .with_object("ElemRestriction"));
        }

        let first = elements.start;
        for e in elements {
            for c in 0..self.num_comp {
                for i in 0..self.elem_size {
                    let (index, sign) = self.entry(e, c, i);
                    let local = ((e - first) * self.num_comp + c) * self.elem_size + i;
                    match t_mode {
                        TransposeMode::NoTranspose => v[local] = sign * u[index],
                        TransposeMode::Transpose => v[index] += sign * u[local],
                    }
                }
            }
        }
        Ok(())
    }

    /// Restricts (`NoTranspose`, overwriting the E-vector `v`) or scatter-adds (`Transpose`, adding
    /// into the L-vector `v`).
    pub fn apply(&self, t_mode: TransposeMode, u: &Vector<T>, v: &mut Vector<T>) -> Result<()> {
        let (expected_u, expected_v) = match t_mode {
            TransposeMode::NoTranspose => (self.l_size, self.e_size()),
            TransposeMode::Transpose => (self.e_size(), self.l_size),
        };
        if u.len() != expected_u || v.len() != expected_v {
            return Err(Error::configuration(format!(
                "{:?} application expects input of length {} and output of length {}, got {} and {}",
                t_mode,
                expected_u,
                expected_v,
                u.len(),
                v.len()
            ))
            .with_object("ElemRestriction"));
        }
        self.ceed
            .backend_for(Operation::RestrictionApply)?
            .restriction_apply(&self.ceed, self, t_mode, u, v)
    }

    /// Number of (element, node) entries referencing each L-vector entry.
    ///
    /// Orientation is ignored, every reference counts as one.
    pub fn multiplicity(&self) -> Vector<T> {
        let multiplicity = self.create_lvector();
        {
            let mut m = multiplicity.view_mut(self.ceed.preferred_mem_type());
            for e in 0..self.num_elem {
                for c in 0..self.num_comp {
                    for i in 0..self.elem_size {
                        let (index, _) = self.entry(e, c, i);
                        m[index] += T::one();
                    }
                }
            }
        }
        multiplicity
    }

    pub fn create_lvector(&self) -> Vector<T> {
        self.ceed.vector(self.l_size)
    }

    pub fn create_evector(&self) -> Vector<T> {
        self.ceed.vector(self.e_size())
    }
}

impl<T: Real> Ceed<T> {
    /// A restriction given by element offsets.
    ///
    /// Component `c` of the entry at offset `o` is stored at `o + c * comp_stride` in the L-vector.
    pub fn elem_restriction(
        &self,
        num_elem: usize,
        elem_size: usize,
        num_comp: usize,
        comp_stride: usize,
        l_size: usize,
        offsets: &[usize],
    ) -> Result<ElemRestriction<T>> {
        let layout = RestrictionLayout::Offsets {
            offsets: offsets.to_vec(),
            comp_stride,
            orientation: Orientation::None,
        };
        ElemRestriction::new(self, num_elem, elem_size, num_comp, l_size, layout)
    }

    /// A restriction given by element offsets whose entries flagged in `orientations` change sign.
    #[allow(clippy::too_many_arguments)]
    pub fn oriented_elem_restriction(
        &self,
        num_elem: usize,
        elem_size: usize,
        num_comp: usize,
        comp_stride: usize,
        l_size: usize,
        offsets: &[usize],
        orientations: &[bool],
    ) -> Result<ElemRestriction<T>> {
        let layout = RestrictionLayout::Offsets {
            offsets: offsets.to_vec(),
            comp_stride,
            orientation: Orientation::Signs(orientations.to_vec()),
        };
        ElemRestriction::new(self, num_elem, elem_size, num_comp, l_size, layout)
    }

    /// A restriction given by element offsets and a local node permutation per element.
    #[allow(clippy::too_many_arguments)]
    pub fn permuted_elem_restriction(
        &self,
        num_elem: usize,
        elem_size: usize,
        num_comp: usize,
        comp_stride: usize,
        l_size: usize,
        offsets: &[usize],
        permutations: &[usize],
    ) -> Result<ElemRestriction<T>> {
        let layout = RestrictionLayout::Offsets {
            offsets: offsets.to_vec(),
            comp_stride,
            orientation: Orientation::Permutations(permutations.to_vec()),
        };
        ElemRestriction::new(self, num_elem, elem_size, num_comp, l_size, layout)
    }

    /// A restriction whose L-vector index is `i * strides[0] + c * strides[1] + e * strides[2]`.
    pub fn strided_elem_restriction(
        &self,
        num_elem: usize,
        elem_size: usize,
        num_comp: usize,
        l_size: usize,
        strides: [usize; 3],
    ) -> Result<ElemRestriction<T>> {
        let layout = RestrictionLayout::Strided { strides };
        ElemRestriction::new(self, num_elem, elem_size, num_comp, l_size, layout)
    }
}
