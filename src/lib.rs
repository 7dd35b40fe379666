//! Matrix-free evaluation of finite element operators.
//!
//! An operator is composed from three stages that act on an L-vector (the global vector of
//! degrees of freedom): an [`ElemRestriction`](restriction::ElemRestriction) gathers the
//! element-local values (the E-vector), a [`Basis`](basis::Basis) evaluates them at quadrature
//! points and a [`QFunction`](qfunction::QFunction) computes the pointwise physics. The transposed
//! stages integrate the pointwise result back to the L-vector, so that the action of the
//! operator is computed without ever forming its matrix.
//!
//! All objects are created from a [`Ceed`] context, which is bound to a backend selected at
//! runtime by a resource string such as `/cpu/self/ref/serial`. Different backends produce the
//! same results.
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod backend;
pub mod basis;
pub mod error;
pub mod operator;
pub mod qfunction;
pub mod restriction;
pub mod vector;

mod ceed;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use ceed::Ceed;
pub use error::{Error, ErrorKind, Result};
pub use matfree_quadrature as quadrature;
pub use matfree_traits::Real;

/// Machine epsilon for `f64`, used to express numerical tolerances.
pub const EPSILON: f64 = f64::EPSILON;

/// Location of the memory backing a [`Vector`](vector::Vector).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemType {
    Host,
    Device,
}

impl MemType {
    /// The memory location that is not `self`.
    pub fn other(self) -> Self {
        match self {
            MemType::Host => MemType::Device,
            MemType::Device => MemType::Host,
        }
    }
}

/// The quantity a basis computes at quadrature points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalMode {
    /// No basis action, the field is already given at quadrature points.
    None,
    Interp,
    Grad,
    Div,
    Curl,
    /// Quadrature weights. Only valid as an input.
    Weight,
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvalMode::None => "none",
            EvalMode::Interp => "interpolation",
            EvalMode::Grad => "gradient",
            EvalMode::Div => "divergence",
            EvalMode::Curl => "curl",
            EvalMode::Weight => "quadrature weights",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransposeMode {
    NoTranspose,
    Transpose,
}

/// Placement of the quadrature points of a tensor product basis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuadMode {
    Gauss,
    GaussLobatto,
}

/// Reference element shapes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElemTopology {
    Line,
    Triangle,
    Quad,
    Tet,
    Pyramid,
    Prism,
    Hex,
}

impl ElemTopology {
    /// Dimension of the reference element.
    pub fn dim(self) -> usize {
        match self {
            ElemTopology::Line => 1,
            ElemTopology::Triangle | ElemTopology::Quad => 2,
            ElemTopology::Tet | ElemTopology::Pyramid | ElemTopology::Prism | ElemTopology::Hex => 3,
        }
    }

    /// The tensor product topology of the given dimension, if any.
    pub fn tensor_product(dim: usize) -> Option<Self> {
        match dim {
            1 => Some(ElemTopology::Line),
            2 => Some(ElemTopology::Quad),
            3 => Some(ElemTopology::Hex),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormType {
    One,
    Two,
    Max,
}

/// Function space a non-tensor basis discretizes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionSpace {
    H1,
    HDiv,
    HCurl,
}

pub mod prelude {
    pub use crate::backend::{Backend, BackendRequest, Operation, Registry};
    pub use crate::basis::Basis;
    pub use crate::operator::{BasisOpt, CompositeOperator, Operator, RestrictionOpt, VectorOpt};
    pub use crate::qfunction::{QFunction, QFunctionContext};
    pub use crate::restriction::ElemRestriction;
    pub use crate::vector::Vector;
    pub use crate::{Ceed, ElemTopology, Error, ErrorKind, EvalMode, FunctionSpace, MemType, NormType, QuadMode};
    pub use crate::{Result, TransposeMode, EPSILON};
}
