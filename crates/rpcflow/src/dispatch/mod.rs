//! Call-shape dispatch.
//!
//! Turns a [`MethodHandler`] into the transport-facing [`Adapter`] for one of
//! the four streaming kinds, and erases typed adapters into
//! [`MethodAdapter`]s over encoded protobuf payloads.

mod adapter;
mod codec;
mod context;
mod handler;
mod kind;

pub use adapter::{
    Adapter, BidiStreamFn, ClientStreamFn, ServerStreamFn, UnaryFn, dispatch, last_value,
    response_stream,
};
pub use codec::{DecodedInbound, MethodAdapter, decode, encode};
pub use context::CallContext;
pub use handler::{
    Inbound, MethodHandler, Streaming, handle_dynamic, handle_message, handle_stream,
};
pub use kind::StreamingKind;
