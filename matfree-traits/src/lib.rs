use nalgebra::RealField;

pub use nalgebra;

/// Scalar types that `matfree` operators compute with.
///
/// Operators are evaluated concurrently by some backends, hence the `Send + Sync` requirement.
pub trait Real: RealField + Copy + Send + Sync {}

impl<T: RealField + Copy + Send + Sync> Real for T {}
