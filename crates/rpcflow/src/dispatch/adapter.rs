use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tonic::Status;
use tracing::debug;

use crate::dispatch::context::CallContext;
use crate::dispatch::handler::{Inbound, MethodHandler, Streaming};
use crate::dispatch::kind::StreamingKind;
use crate::error::RpcCallError;
use crate::stream::{Reply, bridge, normalize};

pub type UnaryFn<Req, Resp> =
    Arc<dyn Fn(Req, CallContext) -> BoxFuture<'static, Result<Resp, Status>> + Send + Sync>;
pub type ServerStreamFn<Req, Resp> =
    Arc<dyn Fn(Req, CallContext) -> Streaming<Resp> + Send + Sync>;
pub type ClientStreamFn<Req, Resp> = Arc<
    dyn Fn(Streaming<Req>, CallContext) -> BoxFuture<'static, Result<Resp, Status>> + Send + Sync,
>;
pub type BidiStreamFn<Req, Resp> =
    Arc<dyn Fn(Streaming<Req>, CallContext) -> Streaming<Resp> + Send + Sync>;

/// An invocation adapter: the transport-facing form of a handler for one
/// call shape.
pub enum Adapter<Req, Resp> {
    Unary(UnaryFn<Req, Resp>),
    ServerStream(ServerStreamFn<Req, Resp>),
    ClientStream(ClientStreamFn<Req, Resp>),
    BidiStream(BidiStreamFn<Req, Resp>),
}

impl<Req, Resp> Adapter<Req, Resp> {
    pub fn kind(&self) -> StreamingKind {
        match self {
            Adapter::Unary(_) => StreamingKind::Unary,
            Adapter::ServerStream(_) => StreamingKind::ServerStream,
            Adapter::ClientStream(_) => StreamingKind::ClientStream,
            Adapter::BidiStream(_) => StreamingKind::BidiStream,
        }
    }
}

impl<Req, Resp> Clone for Adapter<Req, Resp> {
    fn clone(&self) -> Self {
        match self {
            Adapter::Unary(f) => Adapter::Unary(Arc::clone(f)),
            Adapter::ServerStream(f) => Adapter::ServerStream(Arc::clone(f)),
            Adapter::ClientStream(f) => Adapter::ClientStream(Arc::clone(f)),
            Adapter::BidiStream(f) => Adapter::BidiStream(Arc::clone(f)),
        }
    }
}

impl<Req, Resp> fmt::Debug for Adapter<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Adapter").field(&self.kind()).finish()
    }
}

/// Build the invocation adapter for `handler` in the given call shape.
///
/// Single-response shapes resolve to the last value the handler emits before
/// completing. Multi-response shapes stream every emission through a bridge.
pub fn dispatch<Req, Resp>(
    kind: StreamingKind,
    handler: Arc<dyn MethodHandler<Req, Resp>>,
) -> Adapter<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    match kind {
        StreamingKind::Unary => Adapter::Unary(Arc::new(move |request, ctx| {
            last_value(handler.call(Inbound::Message(request), ctx)).boxed()
        })),
        StreamingKind::ServerStream => Adapter::ServerStream(Arc::new(move |request, ctx| {
            response_stream(handler.call(Inbound::Message(request), ctx))
        })),
        StreamingKind::ClientStream => Adapter::ClientStream(Arc::new(move |requests, ctx| {
            last_value(handler.call(Inbound::Stream(requests), ctx)).boxed()
        })),
        StreamingKind::BidiStream => Adapter::BidiStream(Arc::new(move |requests, ctx| {
            response_stream(handler.call(Inbound::Stream(requests), ctx))
        })),
    }
}

/// Resolve a reply to the last value emitted before completion.
///
/// Earlier emissions are discarded. A reply that completes without emitting
/// fails with [`RpcCallError::EmptyResult`].
pub async fn last_value<T: Send + 'static>(reply: Reply<T>) -> Result<T, Status> {
    let mut sequence = bridge(normalize(reply));
    let mut last = None;
    let mut discarded = 0usize;

    while let Some(item) = sequence.next().await {
        if last.replace(item?).is_some() {
            discarded += 1;
        }
    }

    if discarded > 0 {
        debug!(discarded, "Single-response handler emitted more than one value");
    }
    last.ok_or_else(|| RpcCallError::EmptyResult.into())
}

/// Bridge a reply into a response stream.
pub fn response_stream<T: Send + 'static>(reply: Reply<T>) -> Streaming<T> {
    Box::pin(bridge(normalize(reply)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::handle_dynamic;
    use crate::path::GrpcPath;
    use crate::stream::PushStream;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::Code;

    fn ctx() -> CallContext {
        CallContext::new(GrpcPath::parse("demo.EchoService/Echo").unwrap())
    }

    fn handler<Req, Resp, F>(f: F) -> Arc<dyn MethodHandler<Req, Resp>>
    where
        F: Fn(Inbound<Req>, CallContext) -> Reply<Resp> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn unary<Req, Resp>(adapter: Adapter<Req, Resp>) -> UnaryFn<Req, Resp> {
        match adapter {
            Adapter::Unary(f) => f,
            other => panic!("expected unary adapter, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unary_immediate_value() {
        let h = handler(|req: Inbound<String>, _ctx| Reply::value(req.into_message().unwrap()));
        let call = unary(dispatch(StreamingKind::Unary, h));
        assert_eq!(call("x".to_string(), ctx()).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_unary_deferred_rejection() {
        let h = handler(|_req: Inbound<String>, _ctx| {
            Reply::<String>::deferred(async { Err(Status::internal("fail")) })
        });
        let call = unary(dispatch(StreamingKind::Unary, h));
        let status = call("x".to_string(), ctx()).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "fail");
    }

    #[tokio::test]
    async fn test_unary_takes_last_value() {
        let h = handler(|_req: Inbound<()>, _ctx| Reply::stream(PushStream::iter(vec![1, 2])));
        let call = unary(dispatch(StreamingKind::Unary, h));
        assert_eq!(call((), ctx()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unary_empty_stream_fails() {
        let h = handler(|_req: Inbound<()>, _ctx| Reply::<u32>::stream(PushStream::empty()));
        let call = unary(dispatch(StreamingKind::Unary, h));
        let status = call((), ctx()).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "handler completed without emitting a value");
    }

    #[tokio::test]
    async fn test_unary_stream_error_fails_call() {
        let h = handler(|_req: Inbound<()>, _ctx| {
            Reply::stream(PushStream::from_stream(futures::stream::iter(vec![
                Ok(1),
                Err(Status::unavailable("down")),
            ])))
        });
        let call = unary(dispatch(StreamingKind::Unary, h));
        let status = call((), ctx()).await.unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
    }

    #[tokio::test]
    async fn test_server_stream_delivers_every_value() {
        let h = handler(|req: Inbound<u32>, _ctx| {
            let n = req.into_message().unwrap();
            Reply::stream(PushStream::iter(0..n))
        });
        let Adapter::ServerStream(call) = dispatch(StreamingKind::ServerStream, h) else {
            panic!("expected server-stream adapter");
        };
        let values: Vec<u32> = call(4, ctx()).map(|item| item.unwrap()).collect().await;
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_server_stream_drains_then_fails() {
        let h = handler(|_req: Inbound<()>, _ctx| {
            Reply::stream(PushStream::from_stream(futures::stream::iter(vec![
                Ok(1),
                Err(Status::internal("boom")),
            ])))
        });
        let Adapter::ServerStream(call) = dispatch(StreamingKind::ServerStream, h) else {
            panic!("expected server-stream adapter");
        };
        let items: Vec<_> = call((), ctx()).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert_eq!(items[1].as_ref().unwrap_err().message(), "boom");
    }

    #[tokio::test]
    async fn test_server_stream_abandon_cancels_once() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancels);
        let h = handler(move |_req: Inbound<()>, _ctx| {
            let counter = Arc::clone(&counter);
            Reply::stream(PushStream::new(move |subscriber| {
                subscriber.on_value(1);
                subscriber.on_value(2);
                crate::stream::Subscription::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }))
        });
        let Adapter::ServerStream(call) = dispatch(StreamingKind::ServerStream, h) else {
            panic!("expected server-stream adapter");
        };

        let mut responses = call((), ctx());
        assert_eq!(responses.next().await.unwrap().unwrap(), 1);
        drop(responses);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_stream_takes_last_value() {
        let h = handler(|req: Inbound<u32>, _ctx| {
            let sum = req.into_stream().fold(Ok(0), |acc: Result<u32, Status>, item| async move {
                Ok::<u32, Status>(acc? + item?)
            });
            Reply::deferred(sum)
        });
        let Adapter::ClientStream(call) = dispatch(StreamingKind::ClientStream, h) else {
            panic!("expected client-stream adapter");
        };
        let requests: Streaming<u32> =
            Box::pin(futures::stream::iter(vec![Ok(1), Ok(2), Ok(3)]));
        assert_eq!(call(requests, ctx()).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_bidi_stream_echoes_in_order() {
        let h = handler(|req: Inbound<u32>, _ctx| {
            let scaled = req.into_stream().map(|item| item.map(|n| n * 10));
            Reply::stream(PushStream::from_stream(scaled))
        });
        let Adapter::BidiStream(call) = dispatch(StreamingKind::BidiStream, h) else {
            panic!("expected bidi-stream adapter");
        };
        let requests: Streaming<u32> =
            Box::pin(futures::stream::iter(vec![Ok(1), Ok(2), Ok(3)]));
        let values: Vec<u32> = call(requests, ctx()).map(|item| item.unwrap()).collect().await;
        assert_eq!(values, vec![10, 20, 30]);
    }

    fn dynamic_answer() -> Arc<dyn MethodHandler<(), String>> {
        Arc::new(handle_dynamic::<(), String, _>(
            |_req: Inbound<()>, _ctx: CallContext| -> Box<dyn Any + Send> { Box::new(42_u64) },
        ))
    }

    #[tokio::test]
    async fn test_unary_unsupported_shape_fails_call() {
        let call = unary(dispatch(StreamingKind::Unary, dynamic_answer()));
        let status = call((), ctx()).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("unsupported handler result shape"));
    }

    #[tokio::test]
    async fn test_server_stream_unsupported_shape_fails_stream() {
        let Adapter::ServerStream(call) = dispatch(StreamingKind::ServerStream, dynamic_answer())
        else {
            panic!("expected server-stream adapter");
        };
        let items: Vec<_> = call((), ctx()).collect().await;
        assert_eq!(items.len(), 1);
        let status = items[0].as_ref().unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("unsupported handler result shape"));
    }

    #[tokio::test]
    async fn test_dynamic_value_is_recovered() {
        let h: Arc<dyn MethodHandler<(), String>> = Arc::new(handle_dynamic::<(), String, _>(
            |_req: Inbound<()>, _ctx: CallContext| -> Box<dyn Any + Send> {
                Box::new("ok".to_string())
            },
        ));
        let call = unary(dispatch(StreamingKind::Unary, h));
        assert_eq!(call((), ctx()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_client_stream_empty_result_fails() {
        let h = handler(|_req: Inbound<u32>, _ctx| Reply::<u32>::stream(PushStream::empty()));
        let Adapter::ClientStream(call) = dispatch(StreamingKind::ClientStream, h) else {
            panic!("expected client-stream adapter");
        };
        let requests: Streaming<u32> = Box::pin(futures::stream::iter(vec![Ok(1), Ok(2)]));
        let status = call(requests, ctx()).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "handler completed without emitting a value");
    }

    #[test]
    fn test_adapter_kind_matches_dispatch() {
        for kind in StreamingKind::ALL {
            let h = handler(|_req: Inbound<()>, _ctx| Reply::value(()));
            assert_eq!(dispatch(kind, h).kind(), kind);
        }
    }
}
