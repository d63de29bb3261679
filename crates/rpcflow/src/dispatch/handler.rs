use std::any::Any;
use std::fmt;
use std::pin::Pin;

use futures::Stream;
use tonic::Status;

use crate::dispatch::context::CallContext;
use crate::stream::Reply;

/// A boxed pull sequence of messages, as delivered by or to the transport.
pub type Streaming<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// The request side of a call as presented to a handler.
///
/// Unary and server-streaming calls carry a single message; client-streaming
/// and bidirectional calls carry a pull sequence.
pub enum Inbound<Req> {
    Message(Req),
    Stream(Streaming<Req>),
}

impl<Req: Send + 'static> Inbound<Req> {
    /// The single request message. Fails if the call carries a stream.
    pub fn into_message(self) -> Result<Req, Status> {
        match self {
            Inbound::Message(message) => Ok(message),
            Inbound::Stream(_) => Err(Status::invalid_argument(
                "expected a single request message, got a request stream",
            )),
        }
    }

    /// The request sequence. A single message becomes a one-element sequence.
    pub fn into_stream(self) -> Streaming<Req> {
        match self {
            Inbound::Message(message) => {
                Box::pin(futures::stream::once(async move { Ok::<_, Status>(message) }))
            }
            Inbound::Stream(stream) => stream,
        }
    }
}

impl<Req> fmt::Debug for Inbound<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inbound::Message(_) => f.write_str("Inbound::Message"),
            Inbound::Stream(_) => f.write_str("Inbound::Stream"),
        }
    }
}

/// A user handler for one RPC method.
///
/// Implemented for any `Fn(Inbound<Req>, CallContext) -> Reply<Resp>` closure.
pub trait MethodHandler<Req, Resp>: Send + Sync + 'static {
    fn call(&self, request: Inbound<Req>, ctx: CallContext) -> Reply<Resp>;
}

impl<Req, Resp, F> MethodHandler<Req, Resp> for F
where
    F: Fn(Inbound<Req>, CallContext) -> Reply<Resp> + Send + Sync + 'static,
{
    fn call(&self, request: Inbound<Req>, ctx: CallContext) -> Reply<Resp> {
        self(request, ctx)
    }
}

/// Wrap a handler that takes a single request message.
pub fn handle_message<Req, Resp, F>(f: F) -> impl MethodHandler<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Req, CallContext) -> Reply<Resp> + Send + Sync + 'static,
{
    move |request: Inbound<Req>, ctx: CallContext| -> Reply<Resp> {
        match request.into_message() {
            Ok(message) => f(message, ctx),
            Err(status) => Reply::fail(status),
        }
    }
}

/// Wrap a handler that consumes a request sequence.
pub fn handle_stream<Req, Resp, F>(f: F) -> impl MethodHandler<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Streaming<Req>, CallContext) -> Reply<Resp> + Send + Sync + 'static,
{
    move |request: Inbound<Req>, ctx: CallContext| -> Reply<Resp> {
        f(request.into_stream(), ctx)
    }
}

/// Wrap a handler whose result type is erased.
///
/// The result is recovered with [`Reply::downcast`]; an unsupported shape
/// fails the call.
pub fn handle_dynamic<Req, Resp, F>(f: F) -> impl MethodHandler<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Inbound<Req>, CallContext) -> Box<dyn Any + Send> + Send + Sync + 'static,
{
    move |request: Inbound<Req>, ctx: CallContext| -> Reply<Resp> {
        match Reply::downcast(f(request, ctx)) {
            Ok(reply) => reply,
            Err(err) => Reply::fail(err.into()),
        }
    }
}
