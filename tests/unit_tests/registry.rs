use matfree::backend::BackendFactory;
use matfree::prelude::*;
use std::sync::Arc;

/// A backend that implements nothing itself.
struct ForwardingBackend {
    resource: String,
    delegate: Option<String>,
    mem: MemType,
}

impl Backend<f64> for ForwardingBackend {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn preferred_mem_type(&self) -> MemType {
        self.mem
    }

    fn supports_mem_type(&self, mem: MemType) -> bool {
        mem == self.mem
    }

    fn implements(&self, _operation: Operation) -> bool {
        false
    }

    fn delegate_resource(&self) -> Option<&str> {
        self.delegate.as_deref()
    }
}

fn forwarding(delegate: Option<&str>, mem: MemType) -> BackendFactory<f64> {
    let delegate = delegate.map(str::to_string);
    Arc::new(move |request: &BackendRequest| -> Result<Arc<dyn Backend<f64>>> {
        let backend = ForwardingBackend {
            resource: request.resource().to_string(),
            delegate: delegate.clone(),
            mem,
        };
        Ok(Arc::new(backend) as Arc<dyn Backend<f64>>)
    })
}

#[test]
fn default_backends_are_registered() {
    let registry = Registry::<f64>::with_default_backends();
    assert_eq!(
        registry.resources(),
        vec!["/cpu/self/ref/serial", "/cpu/self/ref/blocked", "/cpu/self/par", "/cpu/self/devsim"]
    );
}

#[test]
fn longest_prefix_wins_then_lowest_priority() {
    let registry = Registry::<f64>::with_default_backends();
    let resolve = |resource: &str| registry.resolve(resource).unwrap();

    let exact = resolve("/cpu/self/ref/serial");
    assert_eq!(exact.resource(), "/cpu/self/ref/serial");
    assert_eq!(exact.score(), 4);
    assert!(exact.options().is_empty());

    // Serial and blocked match three segments, serial has the lower priority value
    assert_eq!(resolve("/cpu/self/ref").resource(), "/cpu/self/ref/serial");
    // Every backend matches two segments
    assert_eq!(resolve("/cpu/self").resource(), "/cpu/self/par");
    assert_eq!(resolve("/cpu").priority(), 45);
    assert_eq!(resolve("/cpu/self/devsim").resource(), "/cpu/self/devsim");
    // A partial mismatch still resolves by the shared prefix
    assert_eq!(resolve("/cpu/self/ref/avx").resource(), "/cpu/self/ref/serial");
}

#[test]
fn trailing_segments_become_options() {
    let registry = Registry::<f64>::with_default_backends();
    let resolution = registry
        .resolve("/cpu/self/ref/blocked/block_size=4/verbose")
        .unwrap();
    assert_eq!(resolution.resource(), "/cpu/self/ref/blocked");
    assert_eq!(resolution.options(), &["block_size=4".to_string(), "verbose".to_string()]);
}

#[test]
fn unmatched_resources_list_the_available_backends() {
    let err = Ceed::<f64>::init("/gpu/cuda").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.message().starts_with("No suitable backend: /gpu/cuda"));
    assert!(err
        .message()
        .contains("Available backend resources:\n  /cpu/self/ref/serial"));

    let empty = Registry::<f64>::new();
    assert!(empty.resources().is_empty());
    assert_eq!(empty.resolve("/cpu").unwrap_err().kind(), ErrorKind::Resolution);
}

#[test]
fn malformed_resources_are_configuration_errors() {
    for resource in ["", "cpu/self", "/cpu//ref", "/cpu/self/"] {
        let err = Ceed::<f64>::init(resource).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "resource {:?}", resource);
    }
}

#[test]
fn block_size_option_is_validated() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/blocked/block_size=3").unwrap();
    assert_eq!(ceed.resource(), "/cpu/self/ref/blocked");
    assert_eq!(ceed.requested_resource(), "/cpu/self/ref/blocked/block_size=3");

    for invalid in ["/cpu/self/ref/blocked/block_size=0", "/cpu/self/par/block_size=many"] {
        let err = Ceed::<f64>::init(invalid).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains("block_size"));
    }

    // Unknown options are ignored with a warning
    Ceed::<f64>::init("/cpu/self/ref/serial/unknown=1").unwrap();
}

#[test]
fn later_registrations_win_ties() {
    let mut registry = Registry::<f64>::with_default_backends();
    registry
        .register("/cpu/self/custom", 45, forwarding(Some("/cpu/self/ref/serial"), MemType::Host))
        .unwrap();
    assert_eq!(registry.resolve("/cpu/self").unwrap().resource(), "/cpu/self/custom");

    let ceed = registry.init("/cpu/self/custom").unwrap();
    assert_eq!(ceed.resource(), "/cpu/self/custom");
    assert_eq!(ceed.delegate().map(|d| d.resource()), Some("/cpu/self/ref/serial"));

    let err = registry
        .register("/cpu/self/custom", 10, forwarding(None, MemType::Host))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(registry
        .register("no/leading/slash", 10, forwarding(None, MemType::Host))
        .is_err());
}

#[test]
fn delegation_cycles_are_detected() {
    let mut registry = Registry::<f64>::new();
    registry
        .register("/test/a", 10, forwarding(Some("/test/b"), MemType::Host))
        .unwrap();
    registry
        .register("/test/b", 10, forwarding(Some("/test/a"), MemType::Host))
        .unwrap();
    let err = registry.init("/test/a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.message(), "backend delegation cycle: /test/a -> /test/b -> /test/a");
}

#[test]
fn delegates_must_support_the_preferred_memory() {
    let mut registry = Registry::<f64>::new();
    registry
        .register("/test/host", 10, forwarding(None, MemType::Host))
        .unwrap();
    registry
        .register("/test/device", 10, forwarding(Some("/test/host"), MemType::Device))
        .unwrap();
    let err = registry.init("/test/device").unwrap_err();
    assert!(err.message().contains("does not support memory type Device"));
}

#[test]
fn factory_errors_are_propagated() {
    let mut registry = Registry::<f64>::new();
    registry
        .register(
            "/test/broken",
            10,
            Arc::new(|_request: &BackendRequest| -> Result<Arc<dyn Backend<f64>>> {
                Err(Error::configuration("no device found"))
            }),
        )
        .unwrap();
    let err = registry.init("/test/broken").unwrap_err();
    assert_eq!(err.message(), "no device found");
}

#[test]
fn operations_are_forwarded_along_the_chain() {
    let ceed = Ceed::<f64>::init("/cpu/self/ref/blocked").unwrap();
    let delegate = ceed.delegate().unwrap();
    assert_eq!(delegate.resource(), "/cpu/self/ref/serial");
    assert_eq!(
        ceed.backend_for(Operation::OperatorApply)
            .unwrap()
            .resource(),
        "/cpu/self/ref/blocked"
    );
    for operation in [Operation::RestrictionApply, Operation::BasisApply, Operation::OperatorAssembleNumeric] {
        assert_eq!(ceed.backend_for(operation).unwrap().resource(), "/cpu/self/ref/serial");
    }

    let devsim = Ceed::<f64>::init("/cpu/self/devsim").unwrap();
    assert_eq!(devsim.preferred_mem_type(), MemType::Device);
    for operation in Operation::all() {
        assert_eq!(devsim.backend_for(operation).unwrap().resource(), "/cpu/self/ref/serial");
    }
    assert!(devsim
        .to_string()
        .contains("Delegate: /cpu/self/ref/serial"));
}

#[test]
fn operations_without_implementation_fail_to_dispatch() {
    let mut registry = Registry::<f64>::new();
    registry
        .register("/test/empty", 10, forwarding(None, MemType::Host))
        .unwrap();
    let ceed = registry.init("/test/empty").unwrap();
    let err = ceed
        .backend_for(Operation::BasisApply)
        .err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.message().contains("BasisApply"));
}
