//! Pointwise kernels evaluated at quadrature points.
//!
//! A QFunction receives one array per input field and one per output field. Each array stores
//! its components one after the other: component `k` at point `i` is `field[k * q + i]`, where
//! `q` is the number of points in the batch. Kernels must be pure functions of their inputs
//! and context, since backends may evaluate any partition of the points in any order.
use crate::backend::Operation;
use crate::{Ceed, Error, EvalMode, Real, Result};
use std::fmt;
use std::sync::Arc;

mod context;
mod gallery;

pub use context::QFunctionContext;
pub use gallery::GALLERY;

/// The signature of a QFunction kernel: context, number of points, inputs, outputs.
pub type QFunctionKernel<T> =
    dyn Fn(&QFunctionContext, usize, &[&[T]], &mut [&mut [T]]) -> eyre::Result<()> + Send + Sync;

/// A named input or output of a QFunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QFunctionField {
    name: String,
    size: usize,
    eval_mode: EvalMode,
}

impl QFunctionField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of components per quadrature point.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn eval_mode(&self) -> EvalMode {
        self.eval_mode
    }
}

pub struct QFunction<T: Real> {
    ceed: Ceed<T>,
    vec_length: usize,
    kernel: Arc<QFunctionKernel<T>>,
    inputs: Vec<QFunctionField>,
    outputs: Vec<QFunctionField>,
    context: Arc<QFunctionContext>,
    source: Option<String>,
    gallery_name: Option<String>,
}

impl<T: Real> fmt::Debug for QFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QFunction")
            .field("vec_length", &self.vec_length)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("source", &self.source)
            .field("gallery_name", &self.gallery_name)
            .finish()
    }
}

impl<T: Real> fmt::Display for QFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.gallery_name {
            Some(name) => writeln!(f, "Gallery QFunction {}", name)?,
            None => writeln!(f, "QFunction")?,
        }
        for (label, fields) in [("input", &self.inputs), ("output", &self.outputs)] {
            writeln!(f, "  {} {} fields:", fields.len(), label)?;
            for (i, field) in fields.iter().enumerate() {
                writeln!(
                    f,
                    "    {} field {}: \"{}\", size {}, {}",
                    label, i, field.name, field.size, field.eval_mode
                )?;
            }
        }
        Ok(())
    }
}

impl<T: Real> QFunction<T> {
    pub(crate) fn new(ceed: &Ceed<T>, vec_length: usize, kernel: Arc<QFunctionKernel<T>>) -> Self {
        Self {
            ceed: ceed.clone(),
            vec_length: vec_length.max(1),
            kernel,
            inputs: Vec::new(),
            outputs: Vec::new(),
            context: Arc::new(QFunctionContext::empty()),
            source: None,
            gallery_name: None,
        }
    }

    /// Adds an input field.
    pub fn input(mut self, name: &str, size: usize, eval_mode: EvalMode) -> Result<Self> {
        if eval_mode == EvalMode::Weight && size != 1 {
            return Err(self.error(format!(
                "quadrature weight field \"{}\" must have size 1, got {}",
                name, size
            )));
        }
        let field = self.check_field(name, size, eval_mode)?;
        self.inputs.push(field);
        Ok(self)
    }

    /// Adds an output field.
    pub fn output(mut self, name: &str, size: usize, eval_mode: EvalMode) -> Result<Self> {
        if eval_mode == EvalMode::Weight {
            return Err(self.error(format!("quadrature weights cannot be an output, field \"{}\"", name)));
        }
        let field = self.check_field(name, size, eval_mode)?;
        self.outputs.push(field);
        Ok(self)
    }

    /// Attaches user data that is passed to every evaluation.
    pub fn context(mut self, context: Arc<QFunctionContext>) -> Self {
        self.context = context;
        self
    }

    /// Records where the kernel is defined, as `path:function`, for backends that compile
    /// kernels from source.
    pub fn source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    fn check_field(&self, name: &str, size: usize, eval_mode: EvalMode) -> Result<QFunctionField> {
        if size == 0 {
            return Err(self.error(format!("field \"{}\" must have positive size", name)));
        }
        if self.field(name).is_some() {
            return Err(self.error(format!("field name \"{}\" is already in use", name)));
        }
        Ok(QFunctionField {
            name: name.to_string(),
            size,
            eval_mode,
        })
    }

    fn error(&self, message: String) -> Error {
        Error::configuration(message).with_object("QFunction")
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    pub fn vec_length(&self) -> usize {
        self.vec_length
    }

    pub fn inputs(&self) -> &[QFunctionField] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[QFunctionField] {
        &self.outputs
    }

    /// The input or output field named `name`.
    pub fn field(&self, name: &str) -> Option<&QFunctionField> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .find(|field| field.name == name)
    }

    pub fn get_context(&self) -> &Arc<QFunctionContext> {
        &self.context
    }

    pub fn get_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn gallery_name(&self) -> Option<&str> {
        self.gallery_name.as_deref()
    }

    /// Evaluates the QFunction at `num_points` points through the backend.
    pub fn apply(&self, num_points: usize, inputs: &[&[T]], outputs: &mut [&mut [T]]) -> Result<()> {
        self.ceed
            .backend_for(Operation::QFunctionApply)?
            .qfunction_apply(&self.ceed, self, num_points, inputs, outputs)
    }

    /// Checks the field arrays and runs the kernel on the host.
    pub fn evaluate(&self, num_points: usize, inputs: &[&[T]], outputs: &mut [&mut [T]]) -> Result<()> {
        if inputs.len() != self.inputs.len() || outputs.len() != self.outputs.len() {
            return Err(self.error(format!(
                "expected {} inputs and {} outputs, got {} and {}",
                self.inputs.len(),
                self.outputs.len(),
                inputs.len(),
                outputs.len()
            )));
        }
        let lengths = inputs
            .iter()
            .map(|a| a.len())
            .zip(&self.inputs)
            .chain(outputs.iter().map(|a| a.len()).zip(&self.outputs));
        for (len, field) in lengths {
            if len != field.size * num_points {
                return Err(self.error(format!(
                    "field \"{}\" of size {} at {} points needs an array of length {}, got {}",
                    field.name,
                    field.size,
                    num_points,
                    field.size * num_points,
                    len
                )));
            }
        }
        (self.kernel)(&self.context, num_points, inputs, outputs).map_err(|report| {
            Error::execution(format!("{:#}", report)).with_object(match &self.gallery_name {
                Some(name) => format!("QFunction {}", name),
                None => "QFunction".to_string(),
            })
        })
    }
}

impl<T: Real> Ceed<T> {
    /// A QFunction defined by a closure.
    ///
    /// `vec_length` is the number of points the kernel prefers to process at once. The serial
    /// backend passes it as many whole elements as fit into `vec_length` points, and always at
    /// least one element.
    ///
    /// ```
    /// # use matfree::prelude::*;
    /// # fn main() -> matfree::Result<()> {
    /// let ceed = Ceed::<f64>::init("/cpu/self/ref/serial")?;
    /// let qf = ceed
    ///     .q_function_interior(1, |_ctx, q, inputs, outputs| {
    ///         let (u, w) = (inputs[0], inputs[1]);
    ///         for i in 0..q {
    ///             outputs[0][i] = u[i] * w[i];
    ///         }
    ///         Ok(())
    ///     })
    ///     .input("u", 1, EvalMode::Interp)?
    ///     .input("w", 1, EvalMode::Weight)?
    ///     .output("v", 1, EvalMode::Interp)?;
    /// assert_eq!(qf.inputs().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn q_function_interior<F>(&self, vec_length: usize, kernel: F) -> QFunction<T>
    where
        F: Fn(&QFunctionContext, usize, &[&[T]], &mut [&mut [T]]) -> eyre::Result<()> + Send + Sync + 'static,
    {
        QFunction::new(self, vec_length, Arc::new(kernel))
    }

    /// A QFunction from the gallery. See [`GALLERY`] for the available names.
    pub fn q_function_by_name(&self, name: &str) -> Result<QFunction<T>> {
        let mut qf = gallery::build(self, name)?;
        qf.gallery_name = Some(name.to_string());
        Ok(qf)
    }

    /// The gallery QFunction copying its input of `size` components to its output.
    pub fn q_function_identity(&self, size: usize, in_mode: EvalMode, out_mode: EvalMode) -> Result<QFunction<T>> {
        let mut qf = gallery::identity(self, size, in_mode, out_mode)?;
        qf.gallery_name = Some("Identity".to_string());
        Ok(qf)
    }

    /// The gallery QFunction multiplying its input of `size` components by `alpha`.
    ///
    /// `alpha` is stored in the context and can be changed through it.
    pub fn q_function_scale(&self, size: usize, alpha: T) -> Result<QFunction<T>> {
        let mut qf = gallery::scale(self, size, alpha)?;
        qf.gallery_name = Some("Scale".to_string());
        Ok(qf)
    }
}
