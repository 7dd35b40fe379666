use crate::backend::{Backend, BlockedBackend, DeviceEmulationBackend, ParallelBackend, ReferenceBackend};
use crate::{Ceed, Error, Real, Result};
use itertools::Itertools;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Constructs a backend for a resolved request.
pub type BackendFactory<T> = Arc<dyn Fn(&BackendRequest) -> Result<Arc<dyn Backend<T>>> + Send + Sync>;

/// What a backend factory is asked to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    resource: String,
    requested: String,
    options: Vec<String>,
}

impl BackendRequest {
    /// The registered resource that matched.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The resource string as requested.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Request segments beyond the ones matched by the registered resource.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Value of the option `key=value`, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.iter().find_map(|option| {
            option
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, value)| value)
        })
    }

    /// Logs a warning for every option whose key is not in `known`.
    pub fn warn_unrecognized_options(&self, known: &[&str]) {
        for option in &self.options {
            let key = option.split_once('=').map_or(option.as_str(), |(k, _)| k);
            if !known.contains(&key) {
                warn!("Ignoring unrecognized option \"{}\" for backend {}", option, self.resource);
            }
        }
    }
}

/// The outcome of matching a resource string against a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    index: usize,
    resource: String,
    priority: u32,
    score: usize,
    options: Vec<String>,
}

impl Resolution {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Number of leading segments shared by the request and the registered resource.
    pub fn score(&self) -> usize {
        self.score
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

struct RegistryEntry<T: Real> {
    resource: String,
    segments: Vec<String>,
    priority: u32,
    factory: BackendFactory<T>,
}

/// Maps resource prefixes to backend factories.
///
/// A request is matched against every registered resource by counting the leading path segments
/// they share. The highest count wins. Ties are broken by the lower priority value, then by the
/// later registration. A request that shares no segment with any registered resource is an
/// error, there is no fallback backend.
pub struct Registry<T: Real> {
    entries: Vec<RegistryEntry<T>>,
}

impl<T: Real> Default for Registry<T> {
    fn default() -> Self {
        Self::with_default_backends()
    }
}

impl<T: Real> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources())
            .finish()
    }
}

impl<T: Real> Registry<T> {
    /// A registry without any backends.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// A registry containing the backends shipped with this crate.
    pub fn with_default_backends() -> Self {
        let mut registry = Self::new();
        let builtin: [(&str, u32, BackendFactory<T>); 4] = [
            (ReferenceBackend::RESOURCE, 50, factory(ReferenceBackend::new)),
            (BlockedBackend::RESOURCE, 55, factory(BlockedBackend::new)),
            (ParallelBackend::RESOURCE, 45, factory(ParallelBackend::new)),
            (DeviceEmulationBackend::RESOURCE, 90, factory(DeviceEmulationBackend::new)),
        ];
        for (resource, priority, factory) in builtin {
            registry
                .entries
                .push(RegistryEntry::new(resource, priority, factory));
        }
        registry
    }

    /// Registers a backend factory under `resource`.
    ///
    /// Lower priority values are preferred when several resources match a request equally well.
    pub fn register(&mut self, resource: &str, priority: u32, factory: BackendFactory<T>) -> Result<()> {
        parse_resource(resource)?;
        if self.entries.iter().any(|entry| entry.resource == resource) {
            return Err(Error::configuration(format!("backend resource {} is already registered", resource)));
        }
        debug!("Registering backend {} with priority {}", resource, priority);
        self.entries
            .push(RegistryEntry::new(resource, priority, factory));
        Ok(())
    }

    /// Registered resources, in registration order.
    pub fn resources(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.resource.as_str())
            .collect()
    }

    pub fn resolve(&self, resource: &str) -> Result<Resolution> {
        let requested = parse_resource(resource)?;
        let mut best: Option<Resolution> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let score = entry
                .segments
                .iter()
                .zip(&requested)
                .take_while(|(a, b)| a == b)
                .count();
            if score == 0 {
                continue;
            }
            let better = match &best {
                None => true,
                // Entries are visited in registration order, so equal keys favor the later one
                Some(current) => {
                    score > current.score || (score == current.score && entry.priority <= current.priority)
                }
            };
            if better {
                best = Some(Resolution {
                    index,
                    resource: entry.resource.clone(),
                    priority: entry.priority,
                    score,
                    options: requested[score..].to_vec(),
                });
            }
        }

        best.ok_or_else(|| {
            let available = self
                .resources()
                .iter()
                .map(|r| format!("  {}", r))
                .join("\n");
            Error::resolution(format!(
                "No suitable backend: {}\nAvailable backend resources:\n{}",
                resource, available
            ))
        })
    }

    /// Initializes a context for `resource`, including its chain of delegates.
    pub fn init(&self, resource: &str) -> Result<Ceed<T>> {
        self.init_chain(resource, &mut Vec::new())
    }

    fn init_chain(&self, resource: &str, chain: &mut Vec<String>) -> Result<Ceed<T>> {
        let resolution = self.resolve(resource)?;
        if chain.iter().any(|r| r == resolution.resource()) {
            chain.push(resolution.resource.clone());
            return Err(Error::configuration(format!("backend delegation cycle: {}", chain.join(" -> "))));
        }
        chain.push(resolution.resource.clone());
        debug!("Resolved backend resource {} to {}", resource, resolution.resource);

        let entry = &self.entries[resolution.index];
        let request = BackendRequest {
            resource: resolution.resource.clone(),
            requested: resource.to_string(),
            options: resolution.options.clone(),
        };
        let backend = (entry.factory)(&request)?;

        let delegate = match backend.delegate_resource() {
            Some(delegate_resource) => {
                debug!("Backend {} delegates to {}", resolution.resource, delegate_resource);
                let delegate = self.init_chain(delegate_resource, chain)?;
                let mem = backend.preferred_mem_type();
                if !delegate.backend().supports_mem_type(mem) {
                    return Err(Error::configuration(format!(
                        "delegate {} of backend {} does not support memory type {:?}",
                        delegate.resource(),
                        resolution.resource,
                        mem
                    )));
                }
                Some(delegate)
            }
            None => None,
        };

        Ok(Ceed::from_parts(resolution.resource, resource.to_string(), backend, delegate))
    }
}

impl<T: Real> RegistryEntry<T> {
    fn new(resource: &str, priority: u32, factory: BackendFactory<T>) -> Self {
        Self {
            resource: resource.to_string(),
            segments: resource
                .split('/')
                .skip(1)
                .map(str::to_string)
                .collect(),
            priority,
            factory,
        }
    }
}

fn factory<T, B>(construct: fn(&BackendRequest) -> Result<B>) -> BackendFactory<T>
where
    T: Real,
    B: Backend<T> + 'static,
{
    Arc::new(move |request: &BackendRequest| Ok(Arc::new(construct(request)?) as Arc<dyn Backend<T>>))
}

/// Splits a resource string such as `/cpu/self/ref/serial` into its segments.
fn parse_resource(resource: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| Error::configuration(format!("invalid resource \"{}\": {}", resource, reason));
    let path = resource
        .strip_prefix('/')
        .ok_or_else(|| invalid("must start with '/'"))?;
    let allowed = |c: char| c.is_ascii_alphanumeric() || "-_.=:".contains(c);
    path.split('/')
        .map(|segment| {
            if segment.is_empty() {
                Err(invalid("empty segment"))
            } else if !segment.chars().all(allowed) {
                Err(invalid("segments may only contain ASCII letters, digits and -_.=:"))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}
