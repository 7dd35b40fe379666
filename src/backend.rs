//! Backends execute the kernels of vectors, restrictions, bases, QFunctions and operators.
//!
//! A backend implements a subset of the [`Operation`]s. Operations it does not implement are
//! forwarded to its delegate, a second backend named by [`Backend::delegate_resource`]. The
//! [`Registry`] maps resource strings to backend factories and builds the delegation chain.
use crate::basis::Basis;
use crate::operator::Operator;
use crate::qfunction::QFunction;
use crate::restriction::ElemRestriction;
use crate::vector::Vector;
use crate::{Ceed, Error, EvalMode, MemType, Real, Result, TransposeMode};
use std::fmt;

mod blocked;
mod devsim;
mod parallel;
mod reference;
mod registry;

pub use blocked::BlockedBackend;
pub use devsim::DeviceEmulationBackend;
pub use parallel::ParallelBackend;
pub use reference::ReferenceBackend;
pub use registry::{BackendFactory, BackendRequest, Registry, Resolution};

/// Operations a backend may implement natively.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    RestrictionApply,
    BasisApply,
    QFunctionApply,
    OperatorApply,
    OperatorAssembleDiagonal,
    OperatorAssembleSymbolic,
    OperatorAssembleNumeric,
}

impl Operation {
    pub fn all() -> [Operation; 7] {
        [
            Operation::RestrictionApply,
            Operation::BasisApply,
            Operation::QFunctionApply,
            Operation::OperatorApply,
            Operation::OperatorAssembleDiagonal,
            Operation::OperatorAssembleSymbolic,
            Operation::OperatorAssembleNumeric,
        ]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::RestrictionApply => "ElemRestrictionApply",
            Operation::BasisApply => "BasisApply",
            Operation::QFunctionApply => "QFunctionApply",
            Operation::OperatorApply => "OperatorApply",
            Operation::OperatorAssembleDiagonal => "OperatorLinearAssembleDiagonal",
            Operation::OperatorAssembleSymbolic => "OperatorLinearAssembleSymbolic",
            Operation::OperatorAssembleNumeric => "OperatorLinearAssemble",
        };
        write!(f, "{}", name)
    }
}

/// The plugin interface for backends.
///
/// Every operation receives the context it was invoked on, which is the top of the delegation
/// chain. Backends must read and write vectors in `ceed.preferred_mem_type()`, so that delegated
/// operations observe the same memory as the backend that delegated them.
///
/// The default implementation of each operation reports that the backend does not provide it.
/// Dispatch only calls operations for which [`Backend::implements`] returns `true`.
#[allow(unused_variables)]
pub trait Backend<T: Real>: Send + Sync {
    /// The resource this backend is registered under.
    fn resource(&self) -> &str;

    fn preferred_mem_type(&self) -> MemType {
        MemType::Host
    }

    fn supports_mem_type(&self, mem: MemType) -> bool {
        mem == MemType::Host
    }

    fn implements(&self, operation: Operation) -> bool;

    /// Resource of the backend that handles operations this backend does not implement.
    fn delegate_resource(&self) -> Option<&str> {
        None
    }

    /// Gathers (`NoTranspose`, overwriting `v`) or scatter-adds (`Transpose`, adding into `v`).
    fn restriction_apply(
        &self,
        ceed: &Ceed<T>,
        restriction: &ElemRestriction<T>,
        t_mode: TransposeMode,
        u: &Vector<T>,
        v: &mut Vector<T>,
    ) -> Result<()> {
        Err(unimplemented_operation(self.resource(), Operation::RestrictionApply))
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
        Err(unimplemented_operation(self.resource(), Operation::BasisApply))
    }

    fn qfunction_apply(
        &self,
        ceed: &Ceed<T>,
        qfunction: &QFunction<T>,
        num_points: usize,
        inputs: &[&[T]],
        outputs: &mut [&mut [T]],
    ) -> Result<()> {
        Err(unimplemented_operation(self.resource(), Operation::QFunctionApply))
    }

    /// Adds the action of the operator on `input` to `output`.
    fn operator_apply_add(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        input: &Vector<T>,
        output: &mut Vector<T>,
    ) -> Result<()> {
        Err(unimplemented_operation(self.resource(), Operation::OperatorApply))
    }

    /// Adds the diagonal of the assembled operator to `diagonal`.
    fn operator_assemble_add_diagonal(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        diagonal: &mut Vector<T>,
    ) -> Result<()> {
        Err(unimplemented_operation(self.resource(), Operation::OperatorAssembleDiagonal))
    }

    /// Row and column indices of the entries produced by numeric assembly.
    fn operator_assemble_symbolic(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        Err(unimplemented_operation(self.resource(), Operation::OperatorAssembleSymbolic))
    }

    /// Values of the entries, in the order of [`Backend::operator_assemble_symbolic`].
    fn operator_assemble_values(&self, ceed: &Ceed<T>, operator: &Operator<T>) -> Result<Vec<T>> {
        Err(unimplemented_operation(self.resource(), Operation::OperatorAssembleNumeric))
    }
}

fn unimplemented_operation(resource: &str, operation: Operation) -> Error {
    Error::resolution(format!("backend {} does not implement {}", resource, operation))
}
