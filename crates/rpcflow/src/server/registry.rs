use bon::Builder;
use dashmap::DashMap;
use std::sync::Arc;

/// Describes a service as known to the routing surface.
///
/// `declaring_type` is the name handlers are registered under (for example
/// `EchoService`); `full_name` is the package-qualified name used on the wire
/// (for example `demo.EchoService`).
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ServiceDescriptor {
    #[builder(into)]
    pub declaring_type: String,
    #[builder(into)]
    pub full_name: String,
}

impl ServiceDescriptor {
    pub fn new(declaring_type: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            full_name: full_name.into(),
        }
    }
}

/// Service descriptors, keyed by declaring-type name.
///
/// Owned by the application and handed to the binder explicitly.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<ServiceDescriptor>, ahash::RandomState>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning the one it replaced, if any.
    pub fn register(&self, descriptor: ServiceDescriptor) -> Option<Arc<ServiceDescriptor>> {
        self.services
            .insert(descriptor.declaring_type.clone(), Arc::new(descriptor))
    }

    /// Look up a descriptor by declaring-type name.
    pub fn get(&self, declaring_type: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services
            .get(declaring_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, declaring_type: &str) -> bool {
        self.services.contains_key(declaring_type)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
