//! Vectors with lazily synchronized host and device storage.
use crate::{Ceed, Error, MemType, NormType, Real, Result};
use itertools::izip;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;

/// Read access to the entries of a [`Vector`] in one memory location.
pub type VectorView<'a, T> = MappedRwLockReadGuard<'a, [T]>;

/// Write access to the entries of a [`Vector`] in one memory location.
pub type VectorViewMut<'a, T> = MappedRwLockWriteGuard<'a, [T]>;

/// A vector of fixed length whose entries may live in host memory, device memory or both.
///
/// Each memory location carries a validity flag. Reading a location that is not valid first
/// copies the entries from the valid location. Writing to a location invalidates the other one.
/// All access goes through an internal read-write lock, so a vector can be shared between
/// operators while being written by the one currently applied.
pub struct Vector<T: Real> {
    ceed: Ceed<T>,
    len: usize,
    storage: RwLock<VectorStorage<T>>,
}

#[derive(Debug)]
struct VectorStorage<T> {
    host: Option<Vec<T>>,
    device: Option<Vec<T>>,
    host_valid: bool,
    device_valid: bool,
}

impl<T: Real> VectorStorage<T> {
    fn zeros(len: usize, mem: MemType) -> Self {
        let mut storage = Self {
            host: None,
            device: None,
            host_valid: false,
            device_valid: false,
        };
        *storage.buffer_entry(mem) = Some(vec![T::zero(); len]);
        storage.set_valid(mem, true);
        storage
    }

    fn is_valid(&self, mem: MemType) -> bool {
        match mem {
            MemType::Host => self.host_valid,
            MemType::Device => self.device_valid,
        }
    }

    fn set_valid(&mut self, mem: MemType, valid: bool) {
        match mem {
            MemType::Host => self.host_valid = valid,
            MemType::Device => self.device_valid = valid,
        }
    }

    fn buffer_entry(&mut self, mem: MemType) -> &mut Option<Vec<T>> {
        match mem {
            MemType::Host => &mut self.host,
            MemType::Device => &mut self.device,
        }
    }

    fn buffer(&self, mem: MemType) -> &[T] {
        let buffer = match mem {
            MemType::Host => &self.host,
            MemType::Device => &self.device,
        };
        buffer.as_deref().unwrap_or(&[])
    }

    fn buffer_mut(&mut self, mem: MemType) -> &mut [T] {
        self.buffer_entry(mem).as_deref_mut().unwrap_or(&mut [])
    }

    /// Makes `mem` valid, copying from the other location if necessary.
    fn sync(&mut self, mem: MemType, len: usize) {
        if self.is_valid(mem) {
            return;
        }
        let source = mem.other();
        let data = if self.is_valid(source) {
            self.buffer(source).to_vec()
        } else {
            vec![T::zero(); len]
        };
        *self.buffer_entry(mem) = Some(data);
        self.set_valid(mem, true);
    }

    /// Makes `mem` the only valid location, allocating it if needed.
    fn claim(&mut self, mem: MemType, len: usize) {
        if self.buffer(mem).len() != len {
            *self.buffer_entry(mem) = Some(vec![T::zero(); len]);
        }
        self.set_valid(mem, true);
        self.set_valid(mem.other(), false);
    }
}

impl<T: Real> Vector<T> {
    pub(crate) fn zeros(ceed: &Ceed<T>, len: usize) -> Self {
        Self {
            ceed: ceed.clone(),
            len,
            storage: RwLock::new(VectorStorage::zeros(len, ceed.preferred_mem_type())),
        }
    }

    pub(crate) fn from_slice(ceed: &Ceed<T>, values: &[T]) -> Self {
        let vector = Self::zeros(ceed, values.len());
        {
            let mut storage = vector.storage.write();
            storage
                .buffer_mut(ceed.preferred_mem_type())
                .copy_from_slice(values);
        }
        vector
    }

    pub fn ceed(&self) -> &Ceed<T> {
        &self.ceed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self, mem: MemType) -> bool {
        self.storage.read().is_valid(mem)
    }

    /// Sets every entry to `value` in the preferred memory location of the context.
    pub fn set_value(&self, value: T) {
        let mem = self.ceed.preferred_mem_type();
        let mut storage = self.storage.write();
        storage.claim(mem, self.len);
        storage.buffer_mut(mem).fill(value);
    }

    /// Copies `values` into the vector in the given memory location.
    ///
    /// The other memory location is invalidated.
    pub fn set_array(&self, mem: MemType, values: &[T]) -> Result<()> {
        self.check_len(values.len(), "array")?;
        let mut storage = self.storage.write();
        storage.claim(mem, self.len);
        storage.buffer_mut(mem).copy_from_slice(values);
        Ok(())
    }

    /// Copies `values` into the vector in the preferred memory location of the context.
    pub fn set_slice(&self, values: &[T]) -> Result<()> {
        self.set_array(self.ceed.preferred_mem_type(), values)
    }

    /// Ensures that the entries are valid in `mem`.
    pub fn sync(&self, mem: MemType) {
        let mut storage = self.storage.write();
        storage.sync(mem, self.len);
    }

    /// Read access to the entries in `mem`, synchronizing first if necessary.
    pub fn view(&self, mem: MemType) -> VectorView<'_, T> {
        {
            let storage = self.storage.read();
            if storage.is_valid(mem) {
                return RwLockReadGuard::map(storage, |s| s.buffer(mem));
            }
        }
        let mut storage = self.storage.write();
        storage.sync(mem, self.len);
        RwLockReadGuard::map(RwLockWriteGuard::downgrade(storage), |s| s.buffer(mem))
    }

    /// Write access to the entries in `mem`.
    ///
    /// The entries are synchronized to `mem` first, afterwards the other location is invalid.
    pub fn view_mut(&self, mem: MemType) -> VectorViewMut<'_, T> {
        let mut storage = self.storage.write();
        storage.sync(mem, self.len);
        storage.set_valid(mem.other(), false);
        RwLockWriteGuard::map(storage, |s| s.buffer_mut(mem))
    }

    /// Copy of the entries, read from host memory.
    pub fn to_vec(&self) -> Vec<T> {
        self.view(MemType::Host).to_vec()
    }

    pub fn norm(&self, norm_type: NormType) -> T {
        let values = self.view(self.ceed.preferred_mem_type());
        match norm_type {
            NormType::One => values
                .iter()
                .fold(T::zero(), |acc, x| acc + x.abs()),
            NormType::Two => values
                .iter()
                .fold(T::zero(), |acc, x| acc + *x * *x)
                .sqrt(),
            NormType::Max => values
                .iter()
                .fold(T::zero(), |acc, x| acc.max(x.abs())),
        }
    }

    /// Computes `self = alpha * self`.
    pub fn scale(&self, alpha: T) {
        let mut values = self.view_mut(self.ceed.preferred_mem_type());
        values.iter_mut().for_each(|x| *x *= alpha);
    }

    /// Computes `self = self + alpha * x`.
    pub fn axpy(&self, alpha: T, x: &Vector<T>) -> Result<()> {
        self.check_len(x.len(), "vector")?;
        self.check_distinct(x)?;
        let mem = self.ceed.preferred_mem_type();
        let x = x.view(mem);
        let mut values = self.view_mut(mem);
        for (y, x) in values.iter_mut().zip(x.iter()) {
            *y += alpha * *x;
        }
        Ok(())
    }

    /// Computes the entrywise product `self = x .* y`.
    ///
    /// `x` and `y` may be the same vector, but neither may be `self`.
    pub fn pointwise_mult(&self, x: &Vector<T>, y: &Vector<T>) -> Result<()> {
        self.check_len(x.len(), "vector")?;
        self.check_len(y.len(), "vector")?;
        self.check_distinct(x)?;
        self.check_distinct(y)?;
        let mem = self.ceed.preferred_mem_type();
        if std::ptr::eq(x, y) {
            let x = x.view(mem);
            for (z, a) in self.view_mut(mem).iter_mut().zip(x.iter()) {
                *z = *a * *a;
            }
        } else {
            let (x, y) = (x.view(mem), y.view(mem));
            for (z, a, b) in izip!(self.view_mut(mem).iter_mut(), x.iter(), y.iter()) {
                *z = *a * *b;
            }
        }
        Ok(())
    }

    /// Replaces every non-zero entry by its reciprocal. Zero entries are left unchanged.
    pub fn reciprocal(&self) {
        let mut values = self.view_mut(self.ceed.preferred_mem_type());
        for x in values.iter_mut() {
            if !x.is_zero() {
                *x = T::one() / *x;
            }
        }
    }

    fn check_len(&self, len: usize, what: &str) -> Result<()> {
        if len != self.len {
            Err(Error::configuration(format!(
                "{} of length {} does not match vector length {}",
                what, len, self.len
            ))
            .with_object("Vector"))
        } else {
            Ok(())
        }
    }

    fn check_distinct(&self, other: &Vector<T>) -> Result<()> {
        if std::ptr::eq(self, other) {
            Err(Error::configuration("an argument must not alias the vector it updates").with_object("Vector"))
        } else {
            Ok(())
        }
    }
}

impl<T: Real> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage.read();
        f.debug_struct("Vector")
            .field("len", &self.len)
            .field("host_valid", &storage.host_valid)
            .field("device_valid", &storage.device_valid)
            .finish()
    }
}
