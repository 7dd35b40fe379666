use crate::backend::{Backend, Operation, Registry};
use crate::vector::Vector;
use crate::{MemType, Real, Result};
use log::trace;
use std::fmt;
use std::sync::Arc;

/// A library context bound to a backend.
///
/// The context is cheap to clone and every object created from it holds a clone.
pub struct Ceed<T: Real> {
    inner: Arc<CeedInner<T>>,
}

struct CeedInner<T: Real> {
    resource: String,
    requested: String,
    backend: Arc<dyn Backend<T>>,
    delegate: Option<Ceed<T>>,
}

impl<T: Real> Clone for Ceed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Real> fmt::Debug for Ceed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ceed")
            .field("resource", &self.inner.resource)
            .field("requested", &self.inner.requested)
            .field("delegate", &self.inner.delegate)
            .finish()
    }
}

impl<T: Real> fmt::Display for Ceed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ceed")?;
        writeln!(f, "  Ceed Resource: {}", self.resource())?;
        write!(f, "  Preferred MemType: {:?}", self.preferred_mem_type())?;
        if let Some(delegate) = self.delegate() {
            write!(f, "\n  Delegate: {}", delegate.resource())?;
        }
        Ok(())
    }
}

impl<T: Real> Ceed<T> {
    /// Initializes a context from the backends shipped with this crate.
    ///
    /// ```
    /// # use matfree::Ceed;
    /// let ceed = Ceed::<f64>::init("/cpu/self/ref/serial").unwrap();
    /// assert_eq!(ceed.resource(), "/cpu/self/ref/serial");
    /// ```
    pub fn init(resource: &str) -> Result<Self> {
        Registry::with_default_backends().init(resource)
    }

    pub(crate) fn from_parts(
        resource: String,
        requested: String,
        backend: Arc<dyn Backend<T>>,
        delegate: Option<Ceed<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(CeedInner {
                resource,
                requested,
                backend,
                delegate,
            }),
        }
    }

    /// The resource of the backend that was selected.
    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    /// The resource string passed to [`Ceed::init`].
    pub fn requested_resource(&self) -> &str {
        &self.inner.requested
    }

    pub fn preferred_mem_type(&self) -> MemType {
        self.inner.backend.preferred_mem_type()
    }

    pub fn backend(&self) -> &dyn Backend<T> {
        self.inner.backend.as_ref()
    }

    pub fn delegate(&self) -> Option<&Ceed<T>> {
        self.inner.delegate.as_ref()
    }

    /// The first backend in the delegation chain that implements `operation`.
    pub fn backend_for(&self, operation: Operation) -> Result<&dyn Backend<T>> {
        let mut current = self;
        loop {
            if current.inner.backend.implements(operation) {
                if !std::ptr::eq(current, self) {
                    trace!(
                        "Forwarding {} from backend {} to {}",
                        operation,
                        self.resource(),
                        current.resource()
                    );
                }
                return Ok(current.backend());
            }
            match current.delegate() {
                Some(delegate) => current = delegate,
                None => {
                    return Err(crate::Error::resolution(format!(
                        "no backend in the delegation chain of {} implements {}",
                        self.resource(),
                        operation
                    )))
                }
            }
        }
    }

    /// A zero vector of length `len`.
    pub fn vector(&self, len: usize) -> Vector<T> {
        Vector::zeros(self, len)
    }

    pub fn vector_from_slice(&self, values: &[T]) -> Vector<T> {
        Vector::from_slice(self, values)
    }
}
