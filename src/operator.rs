//! Operators compose restrictions, bases and a QFunction into the action of a discretized PDE.
//!
//! Every field of the QFunction is bound to a restriction, a basis and a vector. Applying the
//! operator to an L-vector runs, for every element, the pipeline
//!
//! ```text
//! gather -> basis -> QFunction -> basis transpose -> scatter-add
//! ```
//!
//! where the *active* input vector is the argument of [`Operator::apply`] and *passive* vectors
//! are bound once, for example geometric data computed by a setup operator.
use crate::backend::Operation;
use crate::basis::Basis;
use crate::qfunction::QFunction;
use crate::restriction::ElemRestriction;
use crate::vector::Vector;
use crate::{Ceed, Error, EvalMode, Real, Result};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::fmt;
use std::sync::Arc;

pub(crate) mod assembly;
pub(crate) mod pipeline;

/// The restriction bound to a field.
#[derive(Debug)]
pub enum RestrictionOpt<T: Real> {
    Some(Arc<ElemRestriction<T>>),
    /// Only valid for quadrature weight fields.
    None,
}

/// The basis bound to a field.
#[derive(Debug)]
pub enum BasisOpt<T: Real> {
    Some(Arc<Basis<T>>),
    /// The field is given at quadrature points and the basis is the identity.
    Collocated,
}

/// The vector bound to a field.
#[derive(Debug)]
pub enum VectorOpt<T: Real> {
    /// A vector bound once, shared with other holders.
    Passive(Arc<Vector<T>>),
    /// The vector passed to [`Operator::apply`].
    Active,
    None,
}

impl<T: Real> Clone for RestrictionOpt<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Some(r) => Self::Some(Arc::clone(r)),
            Self::None => Self::None,
        }
    }
}

impl<T: Real> Clone for BasisOpt<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Some(b) => Self::Some(Arc::clone(b)),
            Self::Collocated => Self::Collocated,
        }
    }
}

impl<T: Real> Clone for VectorOpt<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Passive(v) => Self::Passive(Arc::clone(v)),
            Self::Active => Self::Active,
            Self::None => Self::None,
        }
    }
}

impl<T: Real> From<&Arc<ElemRestriction<T>>> for RestrictionOpt<T> {
    fn from(restriction: &Arc<ElemRestriction<T>>) -> Self {
        Self::Some(Arc::clone(restriction))
    }
}

impl<T: Real> From<&Arc<Basis<T>>> for BasisOpt<T> {
    fn from(basis: &Arc<Basis<T>>) -> Self {
        Self::Some(Arc::clone(basis))
    }
}

impl<T: Real> From<&Arc<Vector<T>>> for VectorOpt<T> {
    fn from(vector: &Arc<Vector<T>>) -> Self {
        Self::Passive(Arc::clone(vector))
    }
}

impl<T: Real> VectorOpt<T> {
    pub fn is_active(&self) -> bool {
        matches!(self, VectorOpt::Active)
    }

    pub fn is_passive(&self) -> bool {
        matches!(self, VectorOpt::Passive(_))
    }
}

/// A QFunction field together with the objects bound to it.
#[derive(Debug)]
pub struct OperatorField<T: Real> {
    name: String,
    size: usize,
    eval_mode: EvalMode,
    is_input: bool,
    restriction: RestrictionOpt<T>,
    basis: Arc<Basis<T>>,
    collocated: bool,
    vector: VectorOpt<T>,
}

impl<T: Real> Clone for OperatorField<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            size: self.size,
            eval_mode: self.eval_mode,
            is_input: self.is_input,
            restriction: self.restriction.clone(),
            basis: Arc::clone(&self.basis),
            collocated: self.collocated,
            vector: self.vector.clone(),
        }
    }
}

impl<T: Real> OperatorField<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn eval_mode(&self) -> EvalMode {
        self.eval_mode
    }

    pub fn is_input(&self) -> bool {
        self.is_input
    }

    pub fn restriction(&self) -> Option<&Arc<ElemRestriction<T>>> {
        match &self.restriction {
            RestrictionOpt::Some(r) => Some(r),
            RestrictionOpt::None => None,
        }
    }

    /// The basis of the field. Fields bound with [`BasisOpt::Collocated`] get an identity basis.
    pub fn basis(&self) -> &Arc<Basis<T>> {
        &self.basis
    }

    pub fn is_collocated(&self) -> bool {
        self.collocated
    }

    pub fn vector(&self) -> &VectorOpt<T> {
        &self.vector
    }
}

/// An operator defined by a QFunction and its field bindings.
pub struct Operator<T: Real> {
    ceed: Ceed<T>,
    qf: Arc<QFunction<T>>,
    fields: Vec<OperatorField<T>>,
    num_elem: Option<usize>,
    num_qpts: Option<usize>,
    jacobian: Option<Box<Operator<T>>>,
    name: Option<String>,
}

impl<T: Real> Clone for Operator<T> {
    fn clone(&self) -> Self {
        Self {
            ceed: self.ceed.clone(),
            qf: Arc::clone(&self.qf),
            fields: self.fields.clone(),
            num_elem: self.num_elem,
            num_qpts: self.num_qpts,
            jacobian: self.jacobian.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: Real> fmt::Debug for Operator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("qfunction", &self.qf)
            .field("fields", &self.fields)
            .field("num_elem", &self.num_elem)
            .field("num_qpts", &self.num_qpts)
            .field("has_jacobian", &self.jacobian.is_some())
            .finish()
    }
}

impl<T: Real> fmt::Display for Operator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_view(f, "")
    }
}

impl<T: Real> Operator<T> {
    fn write_view(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "{}Operator: {}", indent, name)?,
            None => writeln!(f, "{}Operator", indent)?,
        }
        writeln!(
            f,
            "{}  {} elements with {} quadrature points each",
            indent,
            self.num_elem.unwrap_or(0),
            self.num_qpts.unwrap_or(0)
        )?;
        writeln!(f, "{}  {} fields", indent, self.fields.len())?;
        for (label, is_input, qf_fields) in [("Input", true, self.qf.inputs()), ("Output", false, self.qf.outputs())] {
            writeln!(f, "{}  {} {} fields:", indent, qf_fields.len(), label.to_lowercase())?;
            for (i, qf_field) in qf_fields.iter().enumerate() {
                writeln!(f, "{}    {} field {}:", indent, label, i)?;
                writeln!(f, "{}      Name: \"{}\"", indent, qf_field.name())?;
                let field = self
                    .fields
                    .iter()
                    .find(|field| field.is_input == is_input && field.name == qf_field.name());
                match field {
                    None => writeln!(f, "{}      Not bound", indent)?,
                    Some(field) => {
                        writeln!(f, "{}      Size: {}", indent, field.size)?;
                        writeln!(f, "{}      EvalMode: {}", indent, field.eval_mode)?;
                        match &field.vector {
                            VectorOpt::Active => writeln!(f, "{}      Active vector", indent)?,
                            VectorOpt::Passive(_) => writeln!(f, "{}      Passive vector", indent)?,
                            VectorOpt::None => writeln!(f, "{}      No vector", indent)?,
                        }
                        if field.collocated {
                            writeln!(f, "{}      Collocated basis", indent)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn new(ceed: &Ceed<T>, qf: &Arc<QFunction<T>>) -> Result<Self> {
        if qf.inputs().is_empty() || qf.outputs().is_empty() {
            return Err(
                Error::configuration("QFunction must have at least one input and one output field")
                    .with_object("Operator"),
            );
        }
        Ok(Self {
            ceed: ceed.clone(),
            qf: Arc::clone(qf),
            fields: Vec::new(),
            num_elem: None,
            num_qpts: None,
            jacobian: None,
            name: None,
        })
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let object = match &self.name {
            Some(name) => format!("Operator {}", name),
            None => "Operator".to_string(),
        };
        Error::configuration(message).with_object(object)
    }

    /// Binds a restriction, basis and vector to the QFunction field `name`.
    ///
    /// All compatibility requirements are checked here, so that an operator with all fields bound
    /// is ready to be applied.
    pub fn field(
        mut self,
        name: &str,
        restriction: impl Into<RestrictionOpt<T>>,
        basis: impl Into<BasisOpt<T>>,
        vector: impl Into<VectorOpt<T>>,
    ) -> Result<Self> {
        let (restriction, basis, vector) = (restriction.into(), basis.into(), vector.into());
        let (qf_field, is_input) = match self.qf.inputs().iter().find(|f| f.name() == name) {
            Some(field) => (field.clone(), true),
            None => match self.qf.outputs().iter().find(|f| f.name() == name) {
                Some(field) => (field.clone(), false),
                None => {
                    let known: Vec<_> = self
                        .qf
                        .inputs()
                        .iter()
                        .chain(self.qf.outputs())
                        .map(|f| f.name())
                        .collect();
                    return Err(self.error(format!(
                        "QFunction has no field \"{}\", its fields are: {}",
                        name,
                        known.join(", ")
                    )));
                }
            },
        };
        if self.fields.iter().any(|f| f.name == name) {
            return Err(self.error(format!("field \"{}\" is already bound", name)));
        }
        let eval_mode = qf_field.eval_mode();

        if eval_mode == EvalMode::Weight {
            if let RestrictionOpt::Some(_) = restriction {
                return Err(self.error(format!("weight field \"{}\" takes no restriction", name)));
            }
            if !matches!(vector, VectorOpt::None) {
                return Err(self.error(format!("weight field \"{}\" takes no vector", name)));
            }
        } else {
            if let RestrictionOpt::None = restriction {
                return Err(self.error(format!("field \"{}\" requires a restriction", name)));
            }
            if is_input && matches!(vector, VectorOpt::None) {
                return Err(self.error(format!("input field \"{}\" requires an active or passive vector", name)));
            }
        }

        let collocated = matches!(basis, BasisOpt::Collocated);
        let basis = match (basis, &restriction) {
            (BasisOpt::Some(basis), _) => basis,
            (BasisOpt::Collocated, RestrictionOpt::Some(r)) => {
                Arc::new(self.ceed.basis_collocated(r.num_components(), r.elem_size())?)
            }
            (BasisOpt::Collocated, RestrictionOpt::None) => {
                return Err(self.error(format!("weight field \"{}\" requires a basis", name)));
            }
        };
        if eval_mode == EvalMode::None && !basis.is_collocated() {
            return Err(self.error(format!(
                "field \"{}\" without evaluation requires a collocated basis",
                name
            )));
        }
        let q_comp = basis.q_comp(eval_mode)?;

        if let RestrictionOpt::Some(r) = &restriction {
            if r.num_components() != basis.num_components() {
                return Err(self.error(format!(
                    "field \"{}\": restriction has {} components but basis has {}",
                    name,
                    r.num_components(),
                    basis.num_components()
                )));
            }
            if qf_field.size() != basis.num_components() * q_comp {
                return Err(self.error(format!(
                    "field \"{}\" of size {} does not match {} components with {} values each in {} mode",
                    name,
                    qf_field.size(),
                    basis.num_components(),
                    q_comp,
                    eval_mode
                )));
            }
            if r.elem_size() != basis.num_nodes() {
                return Err(self.error(format!(
                    "field \"{}\": restriction element size {} does not match {} basis nodes",
                    name,
                    r.elem_size(),
                    basis.num_nodes()
                )));
            }
            match self.num_elem {
                Some(num_elem) if num_elem != r.num_elements() => {
                    return Err(self.error(format!(
                        "field \"{}\": restriction has {} elements but the operator has {}",
                        name,
                        r.num_elements(),
                        num_elem
                    )));
                }
                _ => {}
            }
            if let VectorOpt::Passive(v) = &vector {
                if v.len() != r.l_size() {
                    return Err(self.error(format!(
                        "field \"{}\": passive vector of length {} does not match restriction L-size {}",
                        name,
                        v.len(),
                        r.l_size()
                    )));
                }
            }
            if vector.is_active() {
                if let Some(active) = self.active_restriction(is_input) {
                    if active.l_size() != r.l_size() {
                        return Err(self.error(format!(
                            "field \"{}\": restriction L-size {} does not match active L-size {}",
                            name,
                            r.l_size(),
                            active.l_size()
                        )));
                    }
                }
            }
        }
        if let VectorOpt::Passive(v) = &vector {
            let aliased = self
                .fields
                .iter()
                .filter(|f| f.is_input != is_input)
                .find(|f| matches!(&f.vector, VectorOpt::Passive(w) if Arc::ptr_eq(v, w)));
            if let Some(other) = aliased {
                return Err(self.error(format!(
                    "field \"{}\": vector is also bound to {} field \"{}\"",
                    name,
                    if other.is_input { "input" } else { "output" },
                    other.name
                )));
            }
        }
        let num_qpts = basis.num_quadrature_points();
        match self.num_qpts {
            Some(n) if n != num_qpts => {
                return Err(self.error(format!(
                    "field \"{}\": basis has {} quadrature points but the operator has {}",
                    name, num_qpts, n
                )));
            }
            _ => {}
        }

        if let RestrictionOpt::Some(r) = &restriction {
            self.num_elem = Some(r.num_elements());
        }
        self.num_qpts = Some(num_qpts);
        self.fields.push(OperatorField {
            name: name.to_string(),
            size: qf_field.size(),
            eval_mode,
            is_input,
            restriction,
            basis,
            collocated,
            vector,
        });
        Ok(self)
    }

    /// Attaches an operator that applies the Jacobian of this operator.
    pub fn with_jacobian(mut self, jacobian: &Operator<T>) -> Self {
        self.jacobian = Some(Box::new(jacobian.clone()));
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn qfunction(&self) -> &Arc<QFunction<T>> {
        &self.qf
    }

    /// Bound fields, in binding order.
    pub fn fields(&self) -> &[OperatorField<T>] {
        &self.fields
    }

    pub fn jacobian(&self) -> Option<&Operator<T>> {
        self.jacobian.as_deref()
    }

    pub fn num_elements(&self) -> usize {
        self.num_elem.unwrap_or(0)
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_qpts.unwrap_or(0)
    }

    /// Number of consecutive elements whose quadrature points fill the batch the QFunction
    /// prefers, at least one.
    pub fn qfunction_block_size(&self) -> usize {
        match self.num_quadrature_points() {
            0 => 1,
            num_qpts => ((self.qf.vec_length() + num_qpts - 1) / num_qpts).max(1),
        }
    }

    fn input_field(&self, name: &str) -> Option<&OperatorField<T>> {
        self.fields
            .iter()
            .find(|f| f.is_input && f.name == name)
    }

    fn output_field(&self, name: &str) -> Option<&OperatorField<T>> {
        self.fields
            .iter()
            .find(|f| !f.is_input && f.name == name)
    }

    /// Input fields in QFunction order.
    pub(crate) fn ordered_inputs(&self) -> Result<Vec<&OperatorField<T>>> {
        self.qf
            .inputs()
            .iter()
            .map(|f| {
                self.input_field(f.name())
                    .ok_or_else(|| self.error(format!("input field \"{}\" is not bound", f.name())))
            })
            .collect()
    }

    /// Output fields in QFunction order.
    pub(crate) fn ordered_outputs(&self) -> Result<Vec<&OperatorField<T>>> {
        self.qf
            .outputs()
            .iter()
            .map(|f| {
                self.output_field(f.name())
                    .ok_or_else(|| self.error(format!("output field \"{}\" is not bound", f.name())))
            })
            .collect()
    }

    /// Checks that every QFunction field is bound.
    pub fn check_ready(&self) -> Result<()> {
        self.ordered_inputs()?;
        self.ordered_outputs()?;
        if self.num_elem.is_none() {
            return Err(self.error("no field has a restriction, the number of elements is unknown"));
        }
        Ok(())
    }

    /// The restriction shared by the active fields selected by `is_input`, if any field is active.
    fn active_restriction(&self, is_input: bool) -> Option<&Arc<ElemRestriction<T>>> {
        self.fields
            .iter()
            .filter(|f| f.is_input == is_input && f.vector.is_active())
            .find_map(|f| f.restriction())
    }

    /// Lengths of the active output and input L-vectors, zero if there is no active field.
    pub fn active_sizes(&self) -> (usize, usize) {
        let size = |r: Option<&Arc<ElemRestriction<T>>>| r.map_or(0, |r| r.l_size());
        (size(self.active_restriction(false)), size(self.active_restriction(true)))
    }

    fn check_active_vectors(&self, input: &Vector<T>, output: &Vector<T>) -> Result<()> {
        for (restriction, vector, label) in [
            (self.active_restriction(true), input, "input"),
            (self.active_restriction(false), output, "output"),
        ] {
            if let Some(r) = restriction {
                if r.l_size() != vector.len() {
                    return Err(self.error(format!(
                        "active {} vector has length {} but the active restriction has L-size {}",
                        label,
                        vector.len(),
                        r.l_size()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fails if a passive output vector is the active input vector.
    fn check_output_aliasing(&self, input: &Vector<T>) -> Result<()> {
        for field in self.fields.iter().filter(|f| !f.is_input) {
            if let VectorOpt::Passive(v) = &field.vector {
                if std::ptr::eq(v.as_ref(), input) {
                    return Err(self.error(format!(
                        "output field \"{}\" writes to a vector that is also an input",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn zero_passive_outputs(&self) {
        for field in self.fields.iter().filter(|f| !f.is_input) {
            if let VectorOpt::Passive(v) = &field.vector {
                v.set_value(T::zero());
            }
        }
    }

    /// Computes `output = A(input)`. Passive output vectors are overwritten as well.
    pub fn apply(&self, input: &Vector<T>, output: &mut Vector<T>) -> Result<()> {
        self.check_ready()?;
        self.check_active_vectors(input, output)?;
        self.check_output_aliasing(input)?;
        output.set_value(T::zero());
        self.zero_passive_outputs();
        self.apply_add(input, output)
    }

    /// Computes `output += A(input)`. Passive output vectors are accumulated into as well.
    pub fn apply_add(&self, input: &Vector<T>, output: &mut Vector<T>) -> Result<()> {
        self.check_ready()?;
        self.check_active_vectors(input, output)?;
        self.ceed
            .backend_for(Operation::OperatorApply)?
            .operator_apply_add(&self.ceed, self, input, output)
    }

    /// Applies the Jacobian operator attached with [`Operator::with_jacobian`].
    pub fn apply_jacobian(&self, du: &Vector<T>, dv: &mut Vector<T>) -> Result<()> {
        self.jacobian
            .as_ref()
            .ok_or_else(|| self.error("operator has no Jacobian"))?
            .apply(du, dv)
    }

    /// Overwrites `diagonal` with the diagonal of the assembled operator.
    pub fn linear_assemble_diagonal(&self, diagonal: &mut Vector<T>) -> Result<()> {
        self.check_ready()?;
        diagonal.set_value(T::zero());
        self.linear_assemble_add_diagonal(diagonal)
    }

    /// Adds the diagonal of the assembled operator to `diagonal`.
    pub fn linear_assemble_add_diagonal(&self, diagonal: &mut Vector<T>) -> Result<()> {
        self.check_ready()?;
        let layout = assembly::ActiveLayout::new(self)?;
        layout.check_square()?;
        if diagonal.len() != layout.output().l_size() {
            return Err(self.error(format!(
                "diagonal of length {} does not match active L-size {}",
                diagonal.len(),
                layout.output().l_size()
            )));
        }
        self.ceed
            .backend_for(Operation::OperatorAssembleDiagonal)?
            .operator_assemble_add_diagonal(&self.ceed, self, diagonal)
    }

    /// Row and column indices of the entries computed by [`Operator::linear_assemble`].
    ///
    /// Entries are enumerated by element, then input component, then output component, then
    /// output node, then input node. The same index pair appears once per element that couples
    /// the two entries.
    pub fn linear_assemble_symbolic(&self) -> Result<(Vec<usize>, Vec<usize>)> {
        self.check_ready()?;
        assembly::ActiveLayout::new(self)?;
        self.ceed
            .backend_for(Operation::OperatorAssembleSymbolic)?
            .operator_assemble_symbolic(&self.ceed, self)
    }

    /// Number of entries produced by symbolic and numeric assembly.
    pub fn num_assembled_entries(&self) -> Result<usize> {
        self.check_ready()?;
        Ok(assembly::ActiveLayout::new(self)?.num_entries())
    }

    /// Overwrites `values` with the assembled entries, in the order of
    /// [`Operator::linear_assemble_symbolic`].
    pub fn linear_assemble(&self, values: &mut Vector<T>) -> Result<()> {
        let assembled = self.assemble_values()?;
        if assembled.len() != values.len() {
            return Err(self.error(format!(
                "values vector of length {} does not match the {} assembled entries",
                values.len(),
                assembled.len()
            )));
        }
        values.set_slice(&assembled)
    }

    fn assemble_values(&self) -> Result<Vec<T>> {
        self.check_ready()?;
        assembly::ActiveLayout::new(self)?;
        self.ceed
            .backend_for(Operation::OperatorAssembleNumeric)?
            .operator_assemble_values(&self.ceed, self)
    }

    /// Assembles the operator into a CSR matrix, summing duplicate entries.
    pub fn linear_assemble_csr(&self) -> Result<CsrMatrix<T>> {
        let (rows, cols) = self.linear_assemble_symbolic()?;
        let values = self.assemble_values()?;
        let (num_rows, num_cols) = self.active_sizes();
        csr_from_triplets(num_rows, num_cols, rows, cols, values)
    }
}

fn csr_from_triplets<T: Real>(
    num_rows: usize,
    num_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
) -> Result<CsrMatrix<T>> {
    let coo = CooMatrix::try_from_triplets(num_rows, num_cols, rows, cols, values)
        .map_err(|err| Error::execution(format!("invalid assembled entries: {}", err)).with_object("Operator"))?;
    Ok(CsrMatrix::from(&coo))
}

/// A sum of operators acting on the same active vectors.
pub struct CompositeOperator<T: Real> {
    ceed: Ceed<T>,
    sub_operators: Vec<Operator<T>>,
}

impl<T: Real> Clone for CompositeOperator<T> {
    fn clone(&self) -> Self {
        Self {
            ceed: self.ceed.clone(),
            sub_operators: self.sub_operators.clone(),
        }
    }
}

impl<T: Real> fmt::Debug for CompositeOperator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeOperator")
            .field("sub_operators", &self.sub_operators)
            .finish()
    }
}

impl<T: Real> fmt::Display for CompositeOperator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Composite Operator")?;
        for (i, op) in self.sub_operators.iter().enumerate() {
            writeln!(f, "  SubOperator {}:", i)?;
            op.write_view(f, "    ")?;
        }
        Ok(())
    }
}

impl<T: Real> CompositeOperator<T> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::configuration(message).with_object("CompositeOperator")
    }

    /// Appends a sub-operator. The sub-operator must have all fields bound.
    pub fn sub_operator(mut self, op: &Operator<T>) -> Result<Self> {
        op.check_ready()?;
        if let Some(first) = self.sub_operators.first() {
            let (first_sizes, sizes) = (first.active_sizes(), op.active_sizes());
            if first_sizes != sizes {
                return Err(self.error(format!(
                    "sub-operator active sizes {:?} do not match {:?}",
                    sizes, first_sizes
                )));
            }
        }
        self.sub_operators.push(op.clone());
        Ok(self)
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    pub fn sub_operators(&self) -> &[Operator<T>] {
        &self.sub_operators
    }

    pub fn active_sizes(&self) -> (usize, usize) {
        self.sub_operators
            .first()
            .map_or((0, 0), |op| op.active_sizes())
    }

    pub fn apply(&self, input: &Vector<T>, output: &mut Vector<T>) -> Result<()> {
        for op in &self.sub_operators {
            op.check_ready()?;
            op.check_active_vectors(input, output)?;
            op.check_output_aliasing(input)?;
        }
        output.set_value(T::zero());
        for op in &self.sub_operators {
            op.zero_passive_outputs();
        }
        self.apply_add(input, output)
    }

    pub fn apply_add(&self, input: &Vector<T>, output: &mut Vector<T>) -> Result<()> {
        for op in &self.sub_operators {
            op.apply_add(input, output)?;
        }
        Ok(())
    }

    pub fn linear_assemble_diagonal(&self, diagonal: &mut Vector<T>) -> Result<()> {
        diagonal.set_value(T::zero());
        self.linear_assemble_add_diagonal(diagonal)
    }

    pub fn linear_assemble_add_diagonal(&self, diagonal: &mut Vector<T>) -> Result<()> {
        for op in &self.sub_operators {
            op.linear_assemble_add_diagonal(diagonal)?;
        }
        Ok(())
    }

    /// Concatenation of the symbolic assembly of the sub-operators, in order.
    pub fn linear_assemble_symbolic(&self) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for op in &self.sub_operators {
            let (op_rows, op_cols) = op.linear_assemble_symbolic()?;
            rows.extend(op_rows);
            cols.extend(op_cols);
        }
        Ok((rows, cols))
    }

    pub fn num_assembled_entries(&self) -> Result<usize> {
        self.sub_operators
            .iter()
            .map(|op| op.num_assembled_entries())
            .sum()
    }

    fn assemble_values(&self) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for op in &self.sub_operators {
            values.extend(op.assemble_values()?);
        }
        Ok(values)
    }

    pub fn linear_assemble(&self, values: &mut Vector<T>) -> Result<()> {
        let assembled = self.assemble_values()?;
        if assembled.len() != values.len() {
            return Err(self.error(format!(
                "values vector of length {} does not match the {} assembled entries",
                values.len(),
                assembled.len()
            )));
        }
        values.set_slice(&assembled)
    }

    pub fn linear_assemble_csr(&self) -> Result<CsrMatrix<T>> {
        let (rows, cols) = self.linear_assemble_symbolic()?;
        let values = self.assemble_values()?;
        let (num_rows, num_cols) = self.active_sizes();
        csr_from_triplets(num_rows, num_cols, rows, cols, values)
    }
}

impl<T: Real> Ceed<T> {
    /// An operator for `qf` without any bound fields.
    pub fn operator(&self, qf: &Arc<QFunction<T>>) -> Result<Operator<T>> {
        Operator::new(self, qf)
    }

    /// A composite operator without sub-operators.
    pub fn composite_operator(&self) -> Result<CompositeOperator<T>> {
        Ok(CompositeOperator {
            ceed: self.clone(),
            sub_operators: Vec::new(),
        })
    }
}
