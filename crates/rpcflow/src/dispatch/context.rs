use bon::Builder;
use tonic::metadata::MetadataMap;
use uuid::Uuid;

use crate::path::GrpcPath;

/// Per-call context handed to every handler invocation.
///
/// Handlers may ignore it entirely; it carries what the transport knows about
/// the call.
#[derive(Debug, Clone, Builder)]
pub struct CallContext {
    #[builder(default = Uuid::new_v4())]
    call_id: Uuid,
    path: GrpcPath,
    #[builder(default)]
    metadata: MetadataMap,
}

impl CallContext {
    /// A context with a fresh call id and empty metadata.
    pub fn new(path: GrpcPath) -> Self {
        Self::builder().path(path).build()
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn path(&self) -> &GrpcPath {
        &self.path
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }
}
