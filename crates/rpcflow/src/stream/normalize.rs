use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tonic::Status;

use crate::error::RpcCallError;
use crate::stream::push::PushStream;

/// What a handler hands back: a value now, a value later, or a push stream.
pub enum Reply<T> {
    Value(T),
    Deferred(BoxFuture<'static, Result<T, Status>>),
    Stream(PushStream<T>),
}

impl<T: Send + 'static> Reply<T> {
    pub fn value(value: T) -> Self {
        Reply::Value(value)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Status>> + Send + 'static,
    {
        Reply::Deferred(future.boxed())
    }

    pub fn stream(stream: PushStream<T>) -> Self {
        Reply::Stream(stream)
    }

    /// A deferred reply that has already failed.
    pub fn fail(status: Status) -> Self {
        Reply::Deferred(futures::future::ready(Err(status)).boxed())
    }

    /// Recover a reply from a type-erased handler result.
    ///
    /// Accepts a boxed `Reply<T>`, `T`, `PushStream<T>`, or
    /// `BoxFuture<'static, Result<T, Status>>`. Anything else is an
    /// unsupported shape.
    pub fn downcast(result: Box<dyn Any + Send>) -> Result<Self, RpcCallError> {
        let result = match result.downcast::<Reply<T>>() {
            Ok(reply) => return Ok(*reply),
            Err(other) => other,
        };
        let result = match result.downcast::<T>() {
            Ok(value) => return Ok(Reply::Value(*value)),
            Err(other) => other,
        };
        let result = match result.downcast::<PushStream<T>>() {
            Ok(stream) => return Ok(Reply::Stream(*stream)),
            Err(other) => other,
        };
        match result.downcast::<BoxFuture<'static, Result<T, Status>>>() {
            Ok(future) => Ok(Reply::Deferred(*future)),
            Err(_) => Err(RpcCallError::UnsupportedShape {
                expected: type_name::<T>(),
            }),
        }
    }

    /// Normalize into a push stream.
    pub fn into_push_stream(self) -> PushStream<T> {
        normalize(self)
    }
}

impl<T: Send + 'static> From<Result<T, Status>> for Reply<T> {
    fn from(result: Result<T, Status>) -> Self {
        match result {
            Ok(value) => Reply::Value(value),
            Err(status) => Reply::fail(status),
        }
    }
}

impl<T> From<PushStream<T>> for Reply<T> {
    fn from(stream: PushStream<T>) -> Self {
        Reply::Stream(stream)
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(_) => f.write_str("Reply::Value"),
            Reply::Deferred(_) => f.write_str("Reply::Deferred"),
            Reply::Stream(_) => f.write_str("Reply::Stream"),
        }
    }
}

/// Turn any reply shape into a push stream.
///
/// - a value emits once and completes,
/// - a deferred value emits once it settles, or fails without emitting,
/// - a push stream passes through untouched.
pub fn normalize<T: Send + 'static>(reply: Reply<T>) -> PushStream<T> {
    match reply {
        Reply::Value(value) => PushStream::once(value),
        Reply::Deferred(future) => PushStream::from_future(future),
        Reply::Stream(stream) => stream,
    }
}
