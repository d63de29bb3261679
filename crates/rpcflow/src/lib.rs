//! Handler binding and streaming adaptation for gRPC-style services.
//!
//! - [`stream`]: push sources, the push-to-pull bridge and reply normalization
//! - [`dispatch`]: per-call-shape invocation adapters
//! - [`server`]: registration, binding and routing

pub mod dispatch;
pub mod error;
pub mod path;
pub mod server;
pub mod stream;

pub use dispatch::{
    Adapter, CallContext, Inbound, MethodAdapter, MethodHandler, Streaming, StreamingKind,
    dispatch, handle_dynamic, handle_message, handle_stream,
};
pub use error::{RpcCallError, RpcConfigError, RpcPathError};
pub use path::GrpcPath;
pub use server::{
    BindReport, Binder, BinderConfig, CallDescriptor, HandlerTable, Registration, Router,
    RoutingSurface, ServiceDescriptor, ServiceRegistry,
};
pub use stream::{PullSequence, PushStream, Reply, Subscriber, Subscription, bridge, normalize};
