//! Service registration and binding.
//!
//! Handlers arrive as [`Registration`]s keyed by a serialized
//! [`CallDescriptor`]. The [`Binder`] turns them into a [`HandlerTable`],
//! resolves each service against the [`ServiceRegistry`] and attaches the
//! result to a [`RoutingSurface`].

mod binder;
mod config;
mod descriptor;
mod registration;
mod registry;
mod router;
mod table;

pub use binder::{BindReport, Binder};
pub use config::BinderConfig;
pub use descriptor::CallDescriptor;
pub use registration::Registration;
pub use registry::{ServiceDescriptor, ServiceRegistry};
pub use router::{Router, RoutingSurface};
pub use table::{HandlerTable, ServiceTable};
