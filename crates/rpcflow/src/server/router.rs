use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tonic::Status;
use tonic::metadata::MetadataMap;
use tracing::{debug, info};

use crate::dispatch::{Adapter, CallContext, MethodAdapter, Streaming, StreamingKind};
use crate::error::{RpcCallError, RpcConfigError};
use crate::path::GrpcPath;
use crate::server::registry::ServiceDescriptor;
use crate::server::table::ServiceTable;

/// Where bound handler tables end up: the transport's routing surface.
pub trait RoutingSurface: Send + Sync {
    /// Attach a service's method table under its descriptor.
    fn attach(
        &self,
        descriptor: Arc<ServiceDescriptor>,
        methods: &ServiceTable,
    ) -> Result<(), RpcConfigError>;
}

/// An in-process routing surface keyed by full gRPC path.
///
/// Invokes adapters directly with encoded payloads, so it doubles as a
/// loopback transport for tests and demos.
#[derive(Debug, Default)]
pub struct Router {
    handlers: DashMap<String, MethodAdapter, ahash::RandomState>,
}

impl RoutingSurface for Router {
    fn attach(
        &self,
        descriptor: Arc<ServiceDescriptor>,
        methods: &ServiceTable,
    ) -> Result<(), RpcConfigError> {
        let routes = methods
            .iter()
            .map(|(method, adapter)| {
                GrpcPath::from_parts(&descriptor.full_name, method).map(|path| (path, adapter))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (grpc_path, adapter) in routes {
            info!(
                grpc_path = %grpc_path,
                kind = %adapter.kind(),
                "Attached RPC handler"
            );
            self.handlers.insert(grpc_path.full_path(), adapter.clone());
        }
        Ok(())
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a handler is attached for the given gRPC path.
    pub fn has_handler(&self, grpc_path: &str) -> bool {
        GrpcPath::parse(grpc_path)
            .map(|path| self.handlers.contains_key(&path.full_path()))
            .unwrap_or(false)
    }

    /// Number of attached methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve a path to its adapter and a fresh call context.
    fn route(
        &self,
        grpc_path: &str,
        metadata: MetadataMap,
    ) -> Result<(MethodAdapter, CallContext), Status> {
        let path =
            GrpcPath::parse(grpc_path).map_err(|e| Status::invalid_argument(e.to_string()))?;
        let full_path = path.full_path();

        let adapter = self
            .handlers
            .get(&full_path)
            .map(|entry| entry.value().clone())
            .ok_or(RpcCallError::NoHandler(full_path))?;

        let ctx = CallContext::builder().path(path).metadata(metadata).build();
        debug!(
            grpc_path = %ctx.path(),
            call_id = %ctx.call_id(),
            kind = %adapter.kind(),
            "Routing call"
        );
        Ok((adapter, ctx))
    }

    /// Invoke a unary method.
    pub async fn call_unary(
        &self,
        grpc_path: &str,
        request: Bytes,
        metadata: MetadataMap,
    ) -> Result<Bytes, Status> {
        match self.route(grpc_path, metadata)? {
            (Adapter::Unary(call), ctx) => call(request, ctx).await,
            (other, ctx) => Err(mismatch(&ctx, &other, StreamingKind::Unary)),
        }
    }

    /// Invoke a server-streaming method.
    pub fn call_server_stream(
        &self,
        grpc_path: &str,
        request: Bytes,
        metadata: MetadataMap,
    ) -> Result<Streaming<Bytes>, Status> {
        match self.route(grpc_path, metadata)? {
            (Adapter::ServerStream(call), ctx) => Ok(call(request, ctx)),
            (other, ctx) => Err(mismatch(&ctx, &other, StreamingKind::ServerStream)),
        }
    }

    /// Invoke a client-streaming method.
    pub async fn call_client_stream(
        &self,
        grpc_path: &str,
        requests: Streaming<Bytes>,
        metadata: MetadataMap,
    ) -> Result<Bytes, Status> {
        match self.route(grpc_path, metadata)? {
            (Adapter::ClientStream(call), ctx) => call(requests, ctx).await,
            (other, ctx) => Err(mismatch(&ctx, &other, StreamingKind::ClientStream)),
        }
    }

    /// Invoke a bidirectional-streaming method.
    pub fn call_bidi_stream(
        &self,
        grpc_path: &str,
        requests: Streaming<Bytes>,
        metadata: MetadataMap,
    ) -> Result<Streaming<Bytes>, Status> {
        match self.route(grpc_path, metadata)? {
            (Adapter::BidiStream(call), ctx) => Ok(call(requests, ctx)),
            (other, ctx) => Err(mismatch(&ctx, &other, StreamingKind::BidiStream)),
        }
    }
}

fn mismatch(ctx: &CallContext, registered: &MethodAdapter, requested: StreamingKind) -> Status {
    RpcCallError::ShapeMismatch {
        grpc_path: ctx.path().full_path(),
        registered: registered.kind().as_str(),
        requested: requested.as_str(),
    }
    .into()
}
