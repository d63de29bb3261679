use std::fmt;
use std::str::FromStr;

use crate::error::RpcConfigError;

/// The four RPC call shapes, by request/response cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingKind {
    /// One request, one response.
    Unary,
    /// One request, many responses.
    ServerStream,
    /// Many requests, one response.
    ClientStream,
    /// Many requests, many responses.
    BidiStream,
}

impl StreamingKind {
    pub const ALL: [StreamingKind; 4] = [
        StreamingKind::Unary,
        StreamingKind::ServerStream,
        StreamingKind::ClientStream,
        StreamingKind::BidiStream,
    ];

    /// The name used in serialized call descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingKind::Unary => "unary",
            StreamingKind::ServerStream => "server_stream",
            StreamingKind::ClientStream => "client_stream",
            StreamingKind::BidiStream => "bidi_stream",
        }
    }

    /// Whether the caller sends a sequence of requests.
    pub fn client_streaming(&self) -> bool {
        matches!(self, StreamingKind::ClientStream | StreamingKind::BidiStream)
    }

    /// Whether the caller receives a sequence of responses.
    pub fn server_streaming(&self) -> bool {
        matches!(self, StreamingKind::ServerStream | StreamingKind::BidiStream)
    }
}

impl fmt::Display for StreamingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingKind {
    type Err = RpcConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StreamingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RpcConfigError::UnknownStreamingKind(s.to_owned()))
    }
}
