use crate::backend::{Backend, BackendRequest, Operation, ReferenceBackend};
use crate::{MemType, Real, Result};

/// Emulates a device backend.
///
/// Vectors of a context using this backend live in (emulated) device memory, and host access
/// goes through explicit synchronization. All operations are delegated to the reference backend,
/// which then works on device memory.
#[derive(Debug, Clone)]
pub struct DeviceEmulationBackend {
    resource: String,
}

impl DeviceEmulationBackend {
    pub const RESOURCE: &'static str = "/cpu/self/devsim";

    pub fn new(request: &BackendRequest) -> Result<Self> {
        request.warn_unrecognized_options(&[]);
        Ok(Self {
            resource: request.resource().to_string(),
        })
    }
}

impl<T: Real> Backend<T> for DeviceEmulationBackend {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn preferred_mem_type(&self) -> MemType {
        MemType::Device
    }

    fn supports_mem_type(&self, _mem: MemType) -> bool {
        true
    }

    fn implements(&self, _operation: Operation) -> bool {
        false
    }

    fn delegate_resource(&self) -> Option<&str> {
        Some(ReferenceBackend::RESOURCE)
    }
}
