use crate::backend::{Backend, BackendRequest, Operation};
use crate::basis::Basis;
use crate::operator::{assembly, pipeline, Operator};
use crate::qfunction::QFunction;
use crate::restriction::ElemRestriction;
use crate::vector::Vector;
use crate::{Ceed, Error, EvalMode, MemType, Real, Result, TransposeMode};

/// The serial reference backend, which implements every operation.
///
/// It works on whichever memory location the calling context prefers, so that backends
/// preferring emulated device memory can delegate to it.
#[derive(Debug, Clone)]
pub struct ReferenceBackend {
    resource: String,
}

impl ReferenceBackend {
    pub const RESOURCE: &'static str = "/cpu/self/ref/serial";

    pub fn new(request: &BackendRequest) -> Result<Self> {
        request.warn_unrecognized_options(&[]);
        Ok(Self {
            resource: request.resource().to_string(),
        })
    }
}

pub(super) fn check_distinct<T: Real>(u: &Vector<T>, v: &Vector<T>, object: &str) -> Result<()> {
    if std::ptr::eq(u, v) {
        Err(Error::configuration("input and output must be distinct vectors").with_object(object))
    } else {
        Ok(())
    }
}

pub(super) fn restriction_apply_serial<T: Real>(
    ceed: &Ceed<T>,
    restriction: &ElemRestriction<T>,
    t_mode: TransposeMode,
    u: &Vector<T>,
    v: &Vector<T>,
) -> Result<()> {
    check_distinct(u, v, "ElemRestriction")?;
    let mem = ceed.preferred_mem_type();
    let u = u.view(mem);
    let mut v = v.view_mut(mem);
    restriction.apply_block(t_mode, 0..restriction.num_elements(), &u, &mut v)
}

pub(super) fn basis_apply_serial<T: Real>(
    ceed: &Ceed<T>,
    basis: &Basis<T>,
    num_elem: usize,
    t_mode: TransposeMode,
    eval_mode: EvalMode,
    u: Option<&Vector<T>>,
    v: &Vector<T>,
) -> Result<()> {
    let mem = ceed.preferred_mem_type();
    match u {
        Some(u) if eval_mode != EvalMode::Weight => {
            check_distinct(u, v, "Basis")?;
            let u = u.view(mem);
            basis.apply_to_slices(num_elem, t_mode, eval_mode, &u, &mut v.view_mut(mem))
        }
        _ => basis.apply_to_slices(num_elem, t_mode, eval_mode, &[], &mut v.view_mut(mem)),
    }
}

impl<T: Real> Backend<T> for ReferenceBackend {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn supports_mem_type(&self, _mem: MemType) -> bool {
        true
    }

    fn implements(&self, _operation: Operation) -> bool {
        true
    }

    fn restriction_apply(
        &self,
        ceed: &Ceed<T>,
        restriction: &ElemRestriction<T>,
        t_mode: TransposeMode,
        u: &Vector<T>,
        v: &mut Vector<T>,
    ) -> Result<()> {
        restriction_apply_serial(ceed, restriction, t_mode, u, v)
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
        basis_apply_serial(ceed, basis, num_elem, t_mode, eval_mode, u, v)
    }

    fn qfunction_apply(
        &self,
        _ceed: &Ceed<T>,
        qfunction: &QFunction<T>,
        num_points: usize,
        inputs: &[&[T]],
        outputs: &mut [&mut [T]],
    ) -> Result<()> {
        qfunction.evaluate(num_points, inputs, outputs)
    }

    fn operator_apply_add(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        input: &Vector<T>,
        output: &mut Vector<T>,
    ) -> Result<()> {
        let block_size = operator.qfunction_block_size();
        pipeline::apply_add_serial(operator, input, output, ceed.preferred_mem_type(), block_size)
    }

    fn operator_assemble_add_diagonal(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        diagonal: &mut Vector<T>,
    ) -> Result<()> {
        assembly::assemble_add_diagonal(operator, diagonal, ceed.preferred_mem_type())
    }

    fn operator_assemble_symbolic(&self, _ceed: &Ceed<T>, operator: &Operator<T>) -> Result<(Vec<usize>, Vec<usize>)> {
        assembly::assemble_symbolic(operator)
    }

    fn operator_assemble_values(&self, ceed: &Ceed<T>, operator: &Operator<T>) -> Result<Vec<T>> {
        assembly::assemble_values(operator, ceed.preferred_mem_type())
    }
}
