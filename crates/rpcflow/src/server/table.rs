use std::collections::{BTreeMap, HashMap};

use crate::dispatch::MethodAdapter;

/// Method name to invocation adapter, for one service.
pub type ServiceTable = HashMap<String, MethodAdapter>;

/// Service name to per-service method table.
///
/// Built once by the binder and read-only afterwards; adapters are cheap to
/// clone and safe to call concurrently.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    services: BTreeMap<String, ServiceTable>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an adapter, returning the one it replaced, if any.
    pub(crate) fn insert(
        &mut self,
        service: &str,
        method: &str,
        adapter: MethodAdapter,
    ) -> Option<MethodAdapter> {
        self.services
            .entry(service.to_owned())
            .or_default()
            .insert(method.to_owned(), adapter)
    }

    /// The method table for a service.
    pub fn service(&self, service: &str) -> Option<&ServiceTable> {
        self.services.get(service)
    }

    /// Look up a single method.
    pub fn method(&self, service: &str, method: &str) -> Option<&MethodAdapter> {
        self.services.get(service)?.get(method)
    }

    /// Iterate services in name order.
    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceTable)> {
        self.services
            .iter()
            .map(|(name, methods)| (name.as_str(), methods))
    }

    /// Number of services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Number of methods across all services.
    pub fn method_count(&self) -> usize {
        self.services.values().map(HashMap::len).sum()
    }
}
