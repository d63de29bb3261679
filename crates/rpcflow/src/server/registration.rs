use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::dispatch::{MethodAdapter, MethodHandler, StreamingKind, dispatch};
use crate::server::descriptor::CallDescriptor;

/// A type-erased handler that can be stored alongside handlers of other
/// message types.
pub(crate) trait ErasedHandler: Send + Sync {
    /// Build the payload-level adapter for the given call shape.
    fn adapter(&self, kind: StreamingKind) -> MethodAdapter;
}

/// A typed handler together with the message types it speaks.
pub(crate) struct TypedHandler<Req, Resp> {
    handler: Arc<dyn MethodHandler<Req, Resp>>,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> TypedHandler<Req, Resp> {
    pub fn new(handler: Arc<dyn MethodHandler<Req, Resp>>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<Req, Resp> ErasedHandler for TypedHandler<Req, Resp>
where
    Req: prost::Message + Default + Send + 'static,
    Resp: prost::Message + Send + 'static,
{
    fn adapter(&self, kind: StreamingKind) -> MethodAdapter {
        dispatch(kind, Arc::clone(&self.handler)).erase()
    }
}

/// One (serialized call descriptor, raw handler) pair, as produced by the
/// registration mechanism.
#[derive(Clone)]
pub struct Registration {
    key: String,
    handler: Arc<dyn ErasedHandler>,
}

impl Registration {
    /// Pair a handler with a serialized descriptor key.
    ///
    /// The key is only parsed when the registration is bound.
    pub fn new<Req, Resp, H>(key: impl Into<String>, handler: H) -> Self
    where
        Req: prost::Message + Default + Send + 'static,
        Resp: prost::Message + Send + 'static,
        H: MethodHandler<Req, Resp>,
    {
        Self {
            key: key.into(),
            handler: Arc::new(TypedHandler::new(Arc::new(handler))),
        }
    }

    /// Pair a handler with a structured descriptor.
    pub fn with_descriptor<Req, Resp, H>(descriptor: &CallDescriptor, handler: H) -> Self
    where
        Req: prost::Message + Default + Send + 'static,
        Resp: prost::Message + Send + 'static,
        H: MethodHandler<Req, Resp>,
    {
        Self::new(descriptor.key(), handler)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn handler(&self) -> &dyn ErasedHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
