use std::fmt;

use crate::dispatch::StreamingKind;
use crate::error::RpcConfigError;

/// Identifies one method registration: its owning service, its name, and
/// its call shape.
///
/// Descriptors travel as opaque keys of the form `{service}/{method}:{kind}`,
/// e.g. `EchoService/Countdown:server_stream`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallDescriptor {
    pub service: String,
    pub method: String,
    pub kind: StreamingKind,
}

impl CallDescriptor {
    pub fn new(service: impl Into<String>, method: impl Into<String>, kind: StreamingKind) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            kind,
        }
    }

    /// Serialize into an opaque registration key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parse a registration key back into a descriptor.
    pub fn parse(key: &str) -> Result<Self, RpcConfigError> {
        let invalid = |reason: &str| RpcConfigError::InvalidKey {
            key: key.to_owned(),
            reason: reason.to_owned(),
        };

        let (path, kind) = key
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing ':{kind}' suffix"))?;
        let (service, method) = path
            .split_once('/')
            .ok_or_else(|| invalid("expected '{service}/{method}'"))?;

        if service.is_empty() || method.is_empty() || method.contains('/') {
            return Err(invalid("service and method must be non-empty names"));
        }

        Ok(Self::new(service, method, kind.parse()?))
    }
}

impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.service, self.method, self.kind)
    }
}
