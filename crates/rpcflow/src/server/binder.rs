use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use crate::error::RpcConfigError;
use crate::server::config::BinderConfig;
use crate::server::descriptor::CallDescriptor;
use crate::server::registration::Registration;
use crate::server::registry::ServiceRegistry;
use crate::server::router::RoutingSurface;
use crate::server::table::HandlerTable;

/// The outcome of a bind.
#[derive(Debug, Clone, Default)]
pub struct BindReport {
    /// Every handler built, grouped by service.
    pub table: HandlerTable,
    /// Services attached to the routing surface.
    pub attached: Vec<String>,
    /// Services with no registered descriptor.
    pub skipped: Vec<String>,
}

/// Binds registered handlers to service descriptors and attaches them to a
/// routing surface.
#[derive(Debug)]
pub struct Binder {
    registry: Arc<ServiceRegistry>,
    config: BinderConfig,
    skipped: AtomicU64,
}

impl Binder {
    pub fn new(registry: Arc<ServiceRegistry>, config: BinderConfig) -> Self {
        Self {
            registry,
            config,
            skipped: AtomicU64::new(0),
        }
    }

    /// Build the handler table from registrations.
    ///
    /// Fails on the first key that does not parse, including keys naming an
    /// unknown streaming kind.
    pub fn build_table<I>(&self, registrations: I) -> Result<HandlerTable, RpcConfigError>
    where
        I: IntoIterator<Item = Registration>,
    {
        let mut table = HandlerTable::new();

        for registration in registrations {
            let descriptor = CallDescriptor::parse(registration.key())?;
            let adapter = registration.handler().adapter(descriptor.kind);

            if table
                .insert(&descriptor.service, &descriptor.method, adapter)
                .is_some()
            {
                warn!(
                    service = %descriptor.service,
                    method = %descriptor.method,
                    "Duplicate registration replaced an earlier handler"
                );
            }

            info!(
                service = %descriptor.service,
                method = %descriptor.method,
                kind = %descriptor.kind,
                "Registered RPC handler"
            );
        }

        Ok(table)
    }

    /// Attach every service in `table` that has a registered descriptor.
    ///
    /// Services without a descriptor are skipped and counted, or rejected in
    /// strict mode. Descriptors are resolved before anything is attached, so a
    /// strict failure leaves the routing surface untouched.
    pub fn attach<S>(&self, table: HandlerTable, surface: &S) -> Result<BindReport, RpcConfigError>
    where
        S: RoutingSurface + ?Sized,
    {
        let mut resolved = Vec::new();
        let mut skipped = Vec::new();

        for (service, methods) in table.services() {
            match self.registry.get(service) {
                Some(descriptor) => resolved.push((service, descriptor, methods)),
                None if self.config.strict => {
                    return Err(RpcConfigError::UnknownService(service.to_owned()));
                }
                None => {
                    warn!(
                        service = %service,
                        methods = methods.len(),
                        "No service descriptor registered, skipping"
                    );
                    skipped.push(service.to_owned());
                }
            }
        }

        let mut attached = Vec::with_capacity(resolved.len());
        for (service, descriptor, methods) in resolved {
            surface.attach(descriptor, methods)?;
            attached.push(service.to_owned());
        }

        self.skipped.fetch_add(skipped.len() as u64, Ordering::Relaxed);

        Ok(BindReport {
            table,
            attached,
            skipped,
        })
    }

    /// Build the handler table and attach it.
    pub fn bind<I, S>(&self, registrations: I, surface: &S) -> Result<BindReport, RpcConfigError>
    where
        I: IntoIterator<Item = Registration>,
        S: RoutingSurface + ?Sized,
    {
        let table = self.build_table(registrations)?;
        self.attach(table, surface)
    }

    /// Total services skipped for lack of a descriptor, across all binds.
    pub fn skipped_services(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
