//! The per-element evaluation shared by the host backends.
//!
//! A block of consecutive elements is gathered, interpolated to quadrature points, passed through
//! the QFunction and integrated back to element nodes. Scattering the element results into the
//! output L-vectors is a separate step, so that blocks can be evaluated concurrently and
//! scattered in a fixed order.
use crate::operator::{Operator, OperatorField, VectorOpt};
use crate::restriction::ElemRestriction;
use crate::vector::{Vector, VectorView, VectorViewMut};
use crate::{Error, EvalMode, MemType, Real, Result, TransposeMode};
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use std::ops::Range;

/// Where the data of an input field comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum InputData<'a, T> {
    /// Quadrature weights computed by the basis.
    Weights,
    /// An L-vector, gathered by the field restriction.
    LVector(&'a [T]),
    /// An E-vector covering all elements of the operator.
    EVector(&'a [T]),
}

#[derive(Debug)]
struct PipelineBuffers<T> {
    e_data: Vec<T>,
    q_element: Vec<T>,
    q_inputs: Vec<Vec<T>>,
    q_outputs: Vec<Vec<T>>,
}

impl<T> Default for PipelineBuffers<T> {
    fn default() -> Self {
        Self {
            e_data: Vec::new(),
            q_element: Vec::new(),
            q_inputs: Vec::new(),
            q_outputs: Vec::new(),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

/// The fields of an operator in QFunction order.
#[derive(Debug)]
pub(crate) struct ElementPipeline<'a, T: Real> {
    operator: &'a Operator<T>,
    inputs: Vec<&'a OperatorField<T>>,
    outputs: Vec<&'a OperatorField<T>>,
    num_qpts: usize,
}

impl<'a, T: Real> ElementPipeline<'a, T> {
    pub fn new(operator: &'a Operator<T>) -> Result<Self> {
        operator.check_ready()?;
        Ok(Self {
            operator,
            inputs: operator.ordered_inputs()?,
            outputs: operator.ordered_outputs()?,
            num_qpts: operator.num_quadrature_points(),
        })
    }

    pub fn num_elements(&self) -> usize {
        self.operator.num_elements()
    }

    pub fn inputs(&self) -> &[&'a OperatorField<T>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[&'a OperatorField<T>] {
        &self.outputs
    }

    /// Empty element buffers, one per output field, for [`ElementPipeline::evaluate_block`].
    pub fn output_buffers(&self) -> Vec<Vec<T>> {
        vec![Vec::new(); self.outputs.len()]
    }

    /// Evaluates the elements in `elements`.
    ///
    /// `inputs` holds the data of each input field in QFunction order. On return, `outputs`
    /// holds the element data of each output field for the block, laid out like an E-vector
    /// starting at the first element of the block.
    pub fn evaluate_block(
        &self,
        elements: Range<usize>,
        inputs: &[InputData<'_, T>],
        outputs: &mut [Vec<T>],
    ) -> Result<()> {
        debug_assert_eq!(inputs.len(), self.inputs.len());
        debug_assert_eq!(outputs.len(), self.outputs.len());
        let num_points = elements.len() * self.num_qpts;
        with_thread_local_workspace(&WORKSPACE, |buffers: &mut PipelineBuffers<T>| {
            let PipelineBuffers {
                e_data,
                q_element,
                q_inputs,
                q_outputs,
            } = buffers;
            q_inputs.resize_with(self.inputs.len(), Vec::new);
            q_outputs.resize_with(self.outputs.len(), Vec::new);

            for ((field, data), q_field) in self.inputs.iter().zip(inputs).zip(q_inputs.iter_mut()) {
                q_field.resize(field.size() * num_points, T::zero());
                self.evaluate_input(field, *data, elements.clone(), e_data, q_element, q_field)?;
            }
            for (field, q_field) in self.outputs.iter().zip(q_outputs.iter_mut()) {
                q_field.clear();
                q_field.resize(field.size() * num_points, T::zero());
            }

            {
                let qf_inputs: Vec<&[T]> = q_inputs.iter().map(Vec::as_slice).collect();
                let mut qf_outputs: Vec<&mut [T]> = q_outputs.iter_mut().map(Vec::as_mut_slice).collect();
                self.operator
                    .qfunction()
                    .evaluate(num_points, &qf_inputs, &mut qf_outputs)?;
            }

            for ((field, q_field), e_out) in self.outputs.iter().zip(q_outputs.iter()).zip(outputs.iter_mut()) {
                self.integrate_output(field, q_field, elements.len(), q_element, e_out)?;
            }
            Ok(())
        })
    }

    fn evaluate_input(
        &self,
        field: &OperatorField<T>,
        data: InputData<'_, T>,
        elements: Range<usize>,
        e_data: &mut Vec<T>,
        q_element: &mut Vec<T>,
        q_field: &mut [T],
    ) -> Result<()> {
        let num_elem = elements.len();
        let basis = field.basis();
        q_element.resize(num_elem * field.size() * self.num_qpts, T::zero());
        match data {
            InputData::Weights => {
                basis.apply_to_slices(num_elem, TransposeMode::NoTranspose, EvalMode::Weight, &[], q_element)?;
            }
            InputData::LVector(l_data) => {
                let restriction = restricted(field)?;
                e_data.resize(num_elem * restriction.element_e_size(), T::zero());
                restriction.apply_block(TransposeMode::NoTranspose, elements, l_data, e_data)?;
                basis.apply_to_slices(num_elem, TransposeMode::NoTranspose, field.eval_mode(), e_data, q_element)?;
            }
            InputData::EVector(e_vector) => {
                let size = restricted(field)?.element_e_size();
                let block = &e_vector[elements.start * size..elements.end * size];
                basis.apply_to_slices(num_elem, TransposeMode::NoTranspose, field.eval_mode(), block, q_element)?;
            }
        }
        element_to_field_major(q_element, field.size(), self.num_qpts, num_elem, q_field);
        Ok(())
    }

    fn integrate_output(
        &self,
        field: &OperatorField<T>,
        q_field: &[T],
        num_elem: usize,
        q_element: &mut Vec<T>,
        e_out: &mut Vec<T>,
    ) -> Result<()> {
        let restriction = restricted(field)?;
        q_element.resize(q_field.len(), T::zero());
        field_to_element_major(q_field, field.size(), self.num_qpts, num_elem, q_element);
        e_out.resize(num_elem * restriction.element_e_size(), T::zero());
        field
            .basis()
            .apply_to_slices(num_elem, TransposeMode::Transpose, field.eval_mode(), q_element, e_out)
    }
}

fn restricted<T: Real>(field: &OperatorField<T>) -> Result<&ElemRestriction<T>> {
    field.restriction().map(|r| r.as_ref()).ok_or_else(|| {
        Error::configuration(format!("field \"{}\" has no restriction", field.name())).with_object("Operator")
    })
}

/// Reorders `[element][component][point]` into `[component][element][point]`.
fn element_to_field_major<T: Copy>(src: &[T], size: usize, num_qpts: usize, num_elem: usize, dst: &mut [T]) {
    for e in 0..num_elem {
        for k in 0..size {
            let src_start = (e * size + k) * num_qpts;
            let dst_start = (k * num_elem + e) * num_qpts;
            dst[dst_start..dst_start + num_qpts].copy_from_slice(&src[src_start..src_start + num_qpts]);
        }
    }
}

/// Reorders `[component][element][point]` into `[element][component][point]`.
fn field_to_element_major<T: Copy>(src: &[T], size: usize, num_qpts: usize, num_elem: usize, dst: &mut [T]) {
    for e in 0..num_elem {
        for k in 0..size {
            let src_start = (k * num_elem + e) * num_qpts;
            let dst_start = (e * size + k) * num_qpts;
            dst[dst_start..dst_start + num_qpts].copy_from_slice(&src[src_start..src_start + num_qpts]);
        }
    }
}

fn same_vector<T: Real>(a: &Vector<T>, b: &Vector<T>) -> bool {
    std::ptr::eq(a, b)
}

/// Read views of the input vectors of an operator, each distinct vector viewed once.
pub(crate) struct InputViews<'v, T: Real> {
    views: Vec<VectorView<'v, T>>,
    vectors: Vec<&'v Vector<T>>,
    slots: Vec<Option<usize>>,
}

impl<'v, T: Real> InputViews<'v, T> {
    /// Views the vectors bound to the input fields in `mem`.
    ///
    /// Active fields read `active`. Without an active vector their slot stays empty, which is
    /// how assembly feeds element data to active fields instead.
    pub fn acquire(
        pipeline: &ElementPipeline<'v, T>,
        active: Option<&'v Vector<T>>,
        mem: MemType,
    ) -> Self {
        let mut vectors: Vec<&'v Vector<T>> = Vec::new();
        let slots = pipeline
            .inputs()
            .iter()
            .map(|field| {
                let vector = match field.vector() {
                    VectorOpt::Passive(v) => Some(v.as_ref()),
                    VectorOpt::Active => active,
                    VectorOpt::None => None,
                }?;
                match vectors.iter().position(|v| same_vector(v, vector)) {
                    Some(slot) => Some(slot),
                    None => {
                        vectors.push(vector);
                        Some(vectors.len() - 1)
                    }
                }
            })
            .collect();
        let views = vectors.iter().map(|v| v.view(mem)).collect();
        Self { views, vectors, slots }
    }

    fn contains(&self, vector: &Vector<T>) -> bool {
        self.vectors.iter().any(|v| same_vector(v, vector))
    }

    /// The data of every input field, in QFunction order.
    ///
    /// Fields without a vector are either weight fields or active fields without an active
    /// vector, which read `active_e_vector`.
    pub fn data<'s>(
        &'s self,
        pipeline: &ElementPipeline<'_, T>,
        active_e_vector: Option<&'s [T]>,
    ) -> Result<Vec<InputData<'s, T>>> {
        pipeline
            .inputs()
            .iter()
            .zip(&self.slots)
            .map(|(field, slot)| match (slot, field.eval_mode()) {
                (Some(slot), _) => Ok(InputData::LVector(&*self.views[*slot])),
                (None, EvalMode::Weight) => Ok(InputData::Weights),
                (None, _) => active_e_vector.map(InputData::EVector).ok_or_else(|| {
                    Error::configuration(format!("no data for input field \"{}\"", field.name()))
                        .with_object("Operator")
                }),
            })
            .collect()
    }
}

/// Write views of the output vectors of an operator, each distinct vector viewed once.
pub(crate) struct OutputViews<'v, T: Real> {
    views: Vec<VectorViewMut<'v, T>>,
    slots: Vec<Option<usize>>,
}

impl<'v, T: Real> OutputViews<'v, T> {
    /// Views the vectors bound to the output fields in `mem`. Fields without a vector discard
    /// their results.
    ///
    /// Fails if an output vector is also read by `inputs`.
    pub fn acquire(
        pipeline: &ElementPipeline<'v, T>,
        active: Option<&'v Vector<T>>,
        inputs: &InputViews<'_, T>,
        mem: MemType,
    ) -> Result<Self> {
        let mut vectors: Vec<&'v Vector<T>> = Vec::new();
        let mut slots = Vec::with_capacity(pipeline.outputs().len());
        for field in pipeline.outputs() {
            let vector = match field.vector() {
                VectorOpt::Passive(v) => Some(v.as_ref()),
                VectorOpt::Active => active,
                VectorOpt::None => None,
            };
            let slot = match vector {
                None => None,
                Some(vector) => {
                    if inputs.contains(vector) {
                        return Err(Error::configuration(format!(
                            "output field \"{}\" writes to a vector that is also an input",
                            field.name()
                        ))
                        .with_object("Operator"));
                    }
                    match vectors.iter().position(|v| same_vector(v, vector)) {
                        Some(slot) => Some(slot),
                        None => {
                            vectors.push(vector);
                            Some(vectors.len() - 1)
                        }
                    }
                }
            };
            slots.push(slot);
        }
        let views = vectors.iter().map(|v| v.view_mut(mem)).collect();
        Ok(Self { views, slots })
    }

    /// Adds the element data of a block, as produced by [`ElementPipeline::evaluate_block`],
    /// into the output vectors.
    pub fn scatter(
        &mut self,
        pipeline: &ElementPipeline<'_, T>,
        elements: Range<usize>,
        element_outputs: &[Vec<T>],
    ) -> Result<()> {
        for ((field, slot), e_out) in pipeline.outputs().iter().zip(&self.slots).zip(element_outputs) {
            if let Some(slot) = slot {
                restricted(field)?.apply_block(
                    TransposeMode::Transpose,
                    elements.clone(),
                    e_out,
                    &mut self.views[*slot],
                )?;
            }
        }
        Ok(())
    }
}

/// Blocks of at most `block_size` consecutive elements covering `0..num_elem`.
pub(crate) fn element_blocks(num_elem: usize, block_size: usize) -> impl Iterator<Item = Range<usize>> {
    let block_size = block_size.max(1);
    (0..num_elem)
        .step_by(block_size)
        .map(move |start| start..(start + block_size).min(num_elem))
}

/// Adds the action of the operator to `output`, evaluating `block_size` elements at a time on
/// the calling thread.
pub(crate) fn apply_add_serial<T: Real>(
    operator: &Operator<T>,
    input: &Vector<T>,
    output: &Vector<T>,
    mem: MemType,
    block_size: usize,
) -> Result<()> {
    let pipeline = ElementPipeline::new(operator)?;
    let inputs = InputViews::acquire(&pipeline, Some(input), mem);
    let mut outputs = OutputViews::acquire(&pipeline, Some(output), &inputs, mem)?;
    let input_data = inputs.data(&pipeline, None)?;
    let mut element_outputs = pipeline.output_buffers();
    for elements in element_blocks(pipeline.num_elements(), block_size) {
        pipeline.evaluate_block(elements.clone(), &input_data, &mut element_outputs)?;
        outputs.scatter(&pipeline, elements, &element_outputs)?;
    }
    Ok(())
}
