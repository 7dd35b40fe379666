use crate::backend::{Backend, BackendRequest, Operation, ReferenceBackend};
use crate::operator::{pipeline, Operator};
use crate::vector::Vector;
use crate::{Ceed, Error, Real, Result};

/// Applies operators a block of elements at a time, so that each QFunction evaluation covers
/// `block_size` elements worth of quadrature points.
///
/// The block size is set with the `block_size=N` option, e.g. `/cpu/self/ref/blocked/block_size=16`.
/// Everything else is delegated to the serial reference backend.
#[derive(Debug, Clone)]
pub struct BlockedBackend {
    resource: String,
    block_size: usize,
}

impl BlockedBackend {
    pub const RESOURCE: &'static str = "/cpu/self/ref/blocked";
    pub const DEFAULT_BLOCK_SIZE: usize = 8;

    pub fn new(request: &BackendRequest) -> Result<Self> {
        request.warn_unrecognized_options(&["block_size"]);
        let block_size = match request.option("block_size") {
            None => Self::DEFAULT_BLOCK_SIZE,
            Some(value) => match value.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(Error::configuration(format!(
                        "block_size must be a positive integer, got \"{}\"",
                        value
                    ))
                    .with_object(Self::RESOURCE))
                }
            },
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

impl<T: Real> Backend<T> for BlockedBackend {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn implements(&self, operation: Operation) -> bool {
        operation == Operation::OperatorApply
    }

    fn delegate_resource(&self) -> Option<&str> {
        Some(ReferenceBackend::RESOURCE)
    }

    fn operator_apply_add(
        &self,
        ceed: &Ceed<T>,
        operator: &Operator<T>,
        input: &Vector<T>,
        output: &mut Vector<T>,
    ) -> Result<()> {
        pipeline::apply_add_serial(operator, input, output, ceed.preferred_mem_type(), self.block_size)
    }
}
