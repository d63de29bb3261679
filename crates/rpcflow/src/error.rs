use thiserror::Error;
use tonic::Status;

/// Errors that can occur while parsing gRPC method paths.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcPathError {
    #[error("invalid RPC path: {0}")]
    Invalid(String),
}

/// Errors raised while building handler tables.
///
/// These are registration-time failures: they abort the bind step rather than
/// an individual call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcConfigError {
    /// The serialized descriptor named a streaming kind we do not know.
    #[error("unrecognized streaming kind '{0}'")]
    UnknownStreamingKind(String),

    /// The serialized descriptor key could not be split into its parts.
    #[error("invalid call descriptor key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// No service descriptor was found and the binder runs in strict mode.
    #[error("no service descriptor registered for '{0}'")]
    UnknownService(String),

    /// The service descriptor's full name is not a valid gRPC service path.
    #[error(transparent)]
    Path(#[from] RpcPathError),
}

/// Errors that fail a single call.
///
/// Every variant converts into a [`Status`] so the transport can report it as
/// the call's terminal outcome.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcCallError {
    /// The push producer failed; the status is forwarded verbatim.
    #[error(transparent)]
    Source(#[from] Status),

    /// A unary or client-streaming handler completed without a value.
    #[error("handler completed without emitting a value")]
    EmptyResult,

    /// A dynamically typed handler returned something that is neither a value,
    /// a deferred value, nor a push stream of the response type.
    #[error("unsupported handler result shape, expected {expected}")]
    UnsupportedShape { expected: &'static str },

    /// No handler registered for the given gRPC path.
    #[error("no handler registered for '{0}'")]
    NoHandler(String),

    /// The method exists but was invoked with a different call shape.
    #[error("'{grpc_path}' is a {registered} method, called as {requested}")]
    ShapeMismatch {
        grpc_path: String,
        registered: &'static str,
        requested: &'static str,
    },
}

impl From<RpcCallError> for Status {
    fn from(err: RpcCallError) -> Self {
        match err {
            RpcCallError::Source(status) => status,
            RpcCallError::EmptyResult | RpcCallError::UnsupportedShape { .. } => {
                Status::internal(err.to_string())
            }
            RpcCallError::NoHandler(_) | RpcCallError::ShapeMismatch { .. } => {
                Status::unimplemented(err.to_string())
            }
        }
    }
}
