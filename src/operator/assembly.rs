//! Host assembly of the diagonal and the entries of linear operators.
//!
//! Element matrices are never formed through a dedicated code path. Instead, the element
//! pipeline is applied to unit element vectors, one local input entry at a time for all
//! elements together, and the active outputs are collected.
use crate::operator::pipeline::{ElementPipeline, InputViews};
use crate::operator::{Operator, VectorOpt};
use crate::restriction::ElemRestriction;
use crate::vector::Vector;
use crate::{Error, MemType, Real, Result};
use nalgebra::DMatrix;
use std::sync::Arc;

/// The restrictions of the active input and output fields of an assembled operator.
#[derive(Debug)]
pub(crate) struct ActiveLayout<'a, T: Real> {
    input: &'a ElemRestriction<T>,
    output: &'a ElemRestriction<T>,
}

impl<'a, T: Real> ActiveLayout<'a, T> {
    pub fn new(operator: &'a Operator<T>) -> Result<Self> {
        let error = |message: &str| Error::configuration(message).with_object("Operator assembly");
        if operator
            .fields()
            .iter()
            .any(|f| !f.is_input() && f.vector().is_passive())
        {
            return Err(error("operators with passive outputs cannot be assembled"));
        }
        let shared = |is_input: bool| -> Result<&'a Arc<ElemRestriction<T>>> {
            let mut restrictions = operator
                .fields()
                .iter()
                .filter(|f| f.is_input() == is_input && matches!(f.vector(), VectorOpt::Active))
                .filter_map(|f| f.restriction());
            let first = restrictions.next().ok_or_else(|| {
                error(if is_input {
                    "operator has no active input field"
                } else {
                    "operator has no active output field"
                })
            })?;
            if restrictions.any(|r| !Arc::ptr_eq(r, first)) {
                return Err(error("active fields must share a single restriction"));
            }
            Ok(first)
        };
        Ok(Self {
            input: shared(true)?,
            output: shared(false)?,
        })
    }

    pub fn input(&self) -> &'a ElemRestriction<T> {
        self.input
    }

    pub fn output(&self) -> &'a ElemRestriction<T> {
        self.output
    }

    /// The diagonal is only defined for operators mapping a space to itself.
    pub fn check_square(&self) -> Result<()> {
        if std::ptr::eq(self.input, self.output) {
            Ok(())
        } else {
            Err(Error::configuration("diagonal assembly requires the same active input and output restriction")
                .with_object("Operator assembly"))
        }
    }

    /// Number of (row, column) pairs produced by assembly.
    pub fn num_entries(&self) -> usize {
        self.input.num_elements() * self.input.element_e_size() * self.output.element_e_size()
    }
}

/// Calls `column(j, e_out)` for every local input entry `j`, where `e_out` is the sum of the
/// active outputs, as an E-vector, for unit input at entry `j` of every element.
fn for_each_element_column<T: Real>(
    operator: &Operator<T>,
    layout: &ActiveLayout<'_, T>,
    mem: MemType,
    mut column: impl FnMut(usize, &[T]),
) -> Result<()> {
    let pipeline = ElementPipeline::new(operator)?;
    let inputs = InputViews::acquire(&pipeline, None, mem);
    let num_elem = pipeline.num_elements();
    let n_in = layout.input().element_e_size();
    let n_out = layout.output().element_e_size();

    let mut probe = vec![T::zero(); num_elem * n_in];
    let mut element_outputs = pipeline.output_buffers();
    let mut e_out = vec![T::zero(); num_elem * n_out];
    for j in 0..n_in {
        for e in 0..num_elem {
            probe[e * n_in + j] = T::one();
        }
        {
            let input_data = inputs.data(&pipeline, Some(&probe))?;
            pipeline.evaluate_block(0..num_elem, &input_data, &mut element_outputs)?;
        }
        e_out.fill(T::zero());
        for (field, values) in pipeline.outputs().iter().zip(&element_outputs) {
            if field.vector().is_active() {
                for (sum, value) in e_out.iter_mut().zip(values) {
                    *sum += *value;
                }
            }
        }
        column(j, &e_out);
        for e in 0..num_elem {
            probe[e * n_in + j] = T::zero();
        }
    }
    Ok(())
}

/// Adds the diagonal of the assembled operator to `diagonal`.
pub(crate) fn assemble_add_diagonal<T: Real>(
    operator: &Operator<T>,
    diagonal: &Vector<T>,
    mem: MemType,
) -> Result<()> {
    let layout = ActiveLayout::new(operator)?;
    layout.check_square()?;
    let restriction = layout.input();
    let n = restriction.element_e_size();
    let num_elem = restriction.num_elements();

    let mut element_diagonals = vec![T::zero(); num_elem * n];
    for_each_element_column(operator, &layout, mem, |j, e_out| {
        for e in 0..num_elem {
            element_diagonals[e * n + j] = e_out[e * n + j];
        }
    })?;

    // Signs cancel on the diagonal, so the unsigned scatter is used.
    let (num_comp, elem_size) = (restriction.num_components(), restriction.elem_size());
    let mut diagonal = diagonal.view_mut(mem);
    for e in 0..num_elem {
        for c in 0..num_comp {
            for i in 0..elem_size {
                let (index, _) = restriction.entry(e, c, i);
                diagonal[index] += element_diagonals[(e * num_comp + c) * elem_size + i];
            }
        }
    }
    Ok(())
}

/// Calls `f(e, c_in, c_out, i, j)` in assembly order.
fn for_each_entry(layout: &ActiveLayout<'_, impl Real>, mut f: impl FnMut(usize, usize, usize, usize, usize)) {
    let (input, output) = (layout.input(), layout.output());
    for e in 0..input.num_elements() {
        for c_in in 0..input.num_components() {
            for c_out in 0..output.num_components() {
                for i in 0..output.elem_size() {
                    for j in 0..input.elem_size() {
                        f(e, c_in, c_out, i, j);
                    }
                }
            }
        }
    }
}

pub(crate) fn assemble_symbolic<T: Real>(operator: &Operator<T>) -> Result<(Vec<usize>, Vec<usize>)> {
    let layout = ActiveLayout::new(operator)?;
    let mut rows = Vec::with_capacity(layout.num_entries());
    let mut cols = Vec::with_capacity(layout.num_entries());
    for_each_entry(&layout, |e, c_in, c_out, i, j| {
        rows.push(layout.output().entry(e, c_out, i).0);
        cols.push(layout.input().entry(e, c_in, j).0);
    });
    Ok((rows, cols))
}

pub(crate) fn assemble_values<T: Real>(operator: &Operator<T>, mem: MemType) -> Result<Vec<T>> {
    let layout = ActiveLayout::new(operator)?;
    let (input, output) = (layout.input(), layout.output());
    let n_in = input.element_e_size();
    let n_out = output.element_e_size();

    let mut element_matrices = vec![DMatrix::zeros(n_out, n_in); input.num_elements()];
    for_each_element_column(operator, &layout, mem, |j, e_out| {
        for (e, matrix) in element_matrices.iter_mut().enumerate() {
            matrix
                .column_mut(j)
                .copy_from_slice(&e_out[e * n_out..(e + 1) * n_out]);
        }
    })?;

    let mut values = Vec::with_capacity(layout.num_entries());
    for_each_entry(&layout, |e, c_in, c_out, i, j| {
        let (_, row_sign) = output.entry(e, c_out, i);
        let (_, col_sign) = input.entry(e, c_in, j);
        let local = element_matrices[e][(c_out * output.elem_size() + i, c_in * input.elem_size() + j)];
        values.push(row_sign * local * col_sign);
    });
    Ok(values)
}
