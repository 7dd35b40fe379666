use crate::{Error, Result};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::any::{type_name, Any};
use std::fmt;

/// User data passed unchanged to every evaluation of a QFunction.
///
/// The data is type-erased. Access is typed, and asking for a type other than the stored one is
/// an execution error.
#[derive(Default)]
pub struct QFunctionContext {
    data: RwLock<Option<Box<dyn Any + Send + Sync>>>,
}

impl fmt::Debug for QFunctionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QFunctionContext")
            .field("has_data", &self.has_data())
            .finish()
    }
}

impl QFunctionContext {
    pub fn new<C: Any + Send + Sync>(data: C) -> Self {
        Self {
            data: RwLock::new(Some(Box::new(data))),
        }
    }

    /// A context without data.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.data.read().is_some()
    }

    /// Replaces the data.
    pub fn set<C: Any + Send + Sync>(&self, data: C) {
        *self.data.write() = Some(Box::new(data));
    }

    /// Read access to the data, which must be of type `C`.
    pub fn get<C: Any>(&self) -> Result<MappedRwLockReadGuard<'_, C>> {
        RwLockReadGuard::try_map(self.data.read(), |data| {
            data.as_ref()
                .and_then(|data| data.downcast_ref::<C>())
        })
        .map_err(|_| Self::type_error::<C>())
    }

    /// Modifies the data, which must be of type `C`, in place.
    pub fn update<C: Any, R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R> {
        let mut data = self.data.write();
        let data = data
            .as_mut()
            .and_then(|data| data.downcast_mut::<C>())
            .ok_or_else(Self::type_error::<C>)?;
        Ok(f(data))
    }

    fn type_error<C>() -> Error {
        Error::execution(format!("context does not hold data of type {}", type_name::<C>()))
            .with_object("QFunctionContext")
    }
}
