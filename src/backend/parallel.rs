use crate::backend::reference::{basis_apply_serial, check_distinct, restriction_apply_serial};
use crate::backend::{Backend, BackendRequest, Operation, ReferenceBackend};
use crate::basis::Basis;
use crate::operator::pipeline::{element_blocks, ElementPipeline, InputViews, OutputViews};
use crate::operator::Operator;
use crate::restriction::ElemRestriction;
use crate::vector::Vector;
use crate::{Ceed, Error, EvalMode, Real, Result, TransposeMode};
use rayon::prelude::*;
use std::ops::Range;

/// Distributes elements over the rayon thread pool.
///
/// Element contributions are computed in parallel and scattered in element order on the calling
/// thread, so results agree exactly with the serial backends. Gathers and basis applications
/// write disjoint element ranges and run fully in parallel.
#[derive(Debug, Clone)]
pub struct ParallelBackend {
    resource: String,
    block_size: usize,
}

impl ParallelBackend {
    pub const RESOURCE: &'static str = "/cpu/self/par";
    pub const DEFAULT_BLOCK_SIZE: usize = 32;

    pub fn new(request: &BackendRequest) -> Result<Self> {
        request.warn_unrecognized_options(&["block_size"]);
        let block_size = match request.option("block_size") {
            None => Self::DEFAULT_BLOCK_SIZE,
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|&size| size > 0)
                .ok_or_else(|| {
                    Error::configuration(format!("block_size must be a positive integer, got \"{}\"", value))
                        .with_object(Self::RESOURCE)
                })?,
        };
        Ok(Self {
            resource: request.resource().to_string(),
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl<T: Real> Backend<T> for ParallelBackend {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn implements(&self, operation: Operation) -> bool {
        matches!(
            operation,
            Operation::RestrictionApply | Operation::BasisApply | Operation::OperatorApply
        )
    }

    fn delegate_resource(&self) -> Option<&str> {
        Some(ReferenceBackend::RESOURCE)
    }

    fn restriction_apply(
        &self,
        ceed: &Ceed<T>,
        restriction: &ElemRestriction<T>,
        t_mode: TransposeMode,
        u: &Vector<T>,
        v: &mut Vector<T>,
    ) -> Result<()> {
        // Elements share L-vector entries, so the scatter stays serial.
        if t_mode == TransposeMode::Transpose {
            return restriction_apply_serial(ceed, restriction, t_mode, u, v);
        }
        check_distinct(u, v, "ElemRestriction")?;
        let mem = ceed.preferred_mem_type();
        let u_view = u.view(mem);
        let u: &[T] = &u_view;
        let mut v = v.view_mut(mem);
        let block_e_size = self.block_size * restriction.element_e_size();
        if block_e_size == 0 {
            return Ok(());
        }
        v.par_chunks_mut(block_e_size)
            .zip(element_blocks(restriction.num_elements(), self.block_size).collect::<Vec<_>>())
            .try_for_each(|(v_block, elements)| restriction.apply_block(t_mode, elements, u, v_block))
    }

    fn basis_apply(
        &self,
        ceed: &Ceed<T>,
        basis: &Basis<T>,
        num_elem: usize,
        t_mode: TransposeMode,
        eval_mode: EvalMode,
        u: Option<&Vector<T>>,
        v: &mut Vector<T>,
    ) -> Result<()> {
        let u = match u {
            Some(u) if eval_mode != EvalMode::Weight => u,
            _ => return basis_apply_serial(ceed, basis, num_elem, t_mode, eval_mode, None, v),
        };
        check_distinct(u, v, "Basis")?;
        let (node_size, q_size) = basis.element_sizes(eval_mode)?;
        let (in_size, out_size) = match t_mode {
            TransposeMode::NoTranspose => (node_size, q_size),
            TransposeMode::Transpose => (q_size, node_size),
        };
        if in_size == 0 || out_size == 0 {
            return Ok(());
        }
        let mem = ceed.preferred_mem_type();
        let u_view = u.view(mem);
        let mut v = v.view_mut(mem);
        u_view
            .par_chunks(self.block_size * in_size)
            .zip(v.par_chunks_mut(self.block_size * out_size))
            .try_for_each(|(u_block, v_block)| {
                basis.apply_to_slices(u_block.len() / in_size, t_mode, eval_mode, u_block, v_block)
            })
    }

    fn operator_apply_add(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        input: &Vector<T>,
        output: &mut Vector<T>,
    ) -> Result<()> {
        let mem = ceed.preferred_mem_type();
        let pipeline = ElementPipeline::new(operator)?;
        let inputs = InputViews::acquire(&pipeline, Some(input), mem);
        let mut outputs = OutputViews::acquire(&pipeline, Some(output), &inputs, mem)?;
        let input_data = inputs.data(&pipeline, None)?;

        let blocks: Vec<Range<usize>> = element_blocks(pipeline.num_elements(), self.block_size).collect();
        let element_outputs = blocks
            .par_iter()
            .map(|elements| -> Result<Vec<Vec<T>>> {
                let mut element_outputs = pipeline.output_buffers();
                pipeline.evaluate_block(elements.clone(), &input_data, &mut element_outputs)?;
                Ok(element_outputs)
            })
            .collect::<Result<Vec<_>>>()?;

        for (elements, block_outputs) in blocks.into_iter().zip(element_outputs) {
            outputs.scatter(&pipeline, elements, &block_outputs)?;
        }
        Ok(())
    }
}
