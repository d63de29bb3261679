use bytes::Bytes;
use futures::{FutureExt, Stream, TryFutureExt, TryStreamExt};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::Status;

use crate::dispatch::adapter::Adapter;
use crate::dispatch::context::CallContext;
use crate::dispatch::handler::Streaming;

/// An adapter over encoded protobuf payloads, as stored in handler tables.
pub type MethodAdapter = Adapter<Bytes, Bytes>;

/// A typed inbound stream that decodes protobuf messages from raw frames.
pub struct DecodedInbound<Req> {
    inner: Streaming<Bytes>,
    _marker: PhantomData<fn() -> Req>,
}

impl<Req> DecodedInbound<Req> {
    pub fn new(inner: Streaming<Bytes>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<Req> Stream for DecodedInbound<Req>
where
    Req: prost::Message + Default,
{
    type Item = Result<Req, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.as_mut().get_mut();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => Poll::Ready(Some(decode(bytes))),
            Poll::Ready(Some(Err(status))) => Poll::Ready(Some(Err(status))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Decode one protobuf payload. A malformed payload is `Status::invalid_argument`.
pub fn decode<M: prost::Message + Default>(bytes: Bytes) -> Result<M, Status> {
    M::decode(bytes)
        .map_err(|e| Status::invalid_argument(format!("failed to decode message: {e}")))
}

/// Encode one protobuf payload.
pub fn encode<M: prost::Message>(message: &M) -> Bytes {
    Bytes::from(message.encode_to_vec())
}

impl<Req, Resp> Adapter<Req, Resp>
where
    Req: prost::Message + Default + Send + 'static,
    Resp: prost::Message + Send + 'static,
{
    /// Wrap the adapter with protobuf decoding of requests and encoding of
    /// responses.
    ///
    /// A request that fails to decode fails the call with
    /// `Status::invalid_argument`.
    pub fn erase(self) -> MethodAdapter {
        match self {
            Adapter::Unary(call) => Adapter::Unary(Arc::new(move |bytes, ctx| {
                match decode::<Req>(bytes) {
                    Ok(request) => call(request, ctx).map_ok(|resp| encode(&resp)).boxed(),
                    Err(status) => futures::future::ready(Err(status)).boxed(),
                }
            })),
            Adapter::ServerStream(call) => Adapter::ServerStream(Arc::new(
                move |bytes: Bytes, ctx: CallContext| -> Streaming<Bytes> {
                    match decode::<Req>(bytes) {
                        Ok(request) => Box::pin(call(request, ctx).map_ok(|resp| encode(&resp))),
                        Err(status) => Box::pin(futures::stream::once(async move {
                            Err::<Bytes, Status>(status)
                        })),
                    }
                },
            )),
            Adapter::ClientStream(call) => Adapter::ClientStream(Arc::new(move |frames, ctx| {
                let requests: Streaming<Req> = Box::pin(DecodedInbound::<Req>::new(frames));
                call(requests, ctx).map_ok(|resp| encode(&resp)).boxed()
            })),
            Adapter::BidiStream(call) => Adapter::BidiStream(Arc::new(
                move |frames: Streaming<Bytes>, ctx: CallContext| -> Streaming<Bytes> {
                    let requests: Streaming<Req> = Box::pin(DecodedInbound::<Req>::new(frames));
                    Box::pin(call(requests, ctx).map_ok(|resp| encode(&resp)))
                },
            )),
        }
    }
}
