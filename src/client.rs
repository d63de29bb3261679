use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rpcflow::dispatch::{DecodedInbound, Streaming, decode, encode};
use rpcflow::server::Router;
use tonic::Status;
use tonic::metadata::MetadataMap;

use crate::ECHO_SERVICE_FULL_NAME;
use crate::echo_proto::{
    ChatMessage, CountdownRequest, EchoRequest, EchoResponse, SumRequest, SumResponse, Tick,
};

/// Configuration for the loopback echo client.
#[derive(Debug, Clone)]
pub struct EchoClientConfig {
    /// Package-qualified service name (e.g., "demo.EchoService").
    pub service: String,

    /// Deadline for single-response calls.
    pub timeout: Duration,
}

impl Default for EchoClientConfig {
    fn default() -> Self {
        Self {
            service: ECHO_SERVICE_FULL_NAME.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EchoClientConfig {
    /// Set the service name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the deadline for single-response calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn grpc_path(&self, method: &str) -> String {
        format!("{}/{}", self.service, method)
    }
}

/// A typed client for the echo service that calls straight into a [`Router`].
#[derive(Debug, Clone)]
pub struct EchoClient {
    router: Arc<Router>,
    config: EchoClientConfig,
}

impl EchoClient {
    pub fn new(router: Arc<Router>, config: EchoClientConfig) -> Self {
        Self { router, config }
    }

    pub async fn echo(&self, message: impl Into<String>) -> Result<EchoResponse, Status> {
        let request = encode(&EchoRequest {
            message: message.into(),
        });
        let path = self.config.grpc_path("Echo");
        let reply = self
            .deadline(self.router.call_unary(&path, request, MetadataMap::new()))
            .await?;
        decode(reply)
    }

    pub fn countdown(&self, from: u32) -> Result<DecodedInbound<Tick>, Status> {
        let request = encode(&CountdownRequest { from });
        let path = self.config.grpc_path("Countdown");
        let frames = self
            .router
            .call_server_stream(&path, request, MetadataMap::new())?;
        Ok(DecodedInbound::new(frames))
    }

    pub async fn sum<I>(&self, values: I) -> Result<SumResponse, Status>
    where
        I: IntoIterator<Item = i64>,
    {
        let frames: Vec<Result<Bytes, Status>> = values
            .into_iter()
            .map(|value| Ok(encode(&SumRequest { value })))
            .collect();
        let path = self.config.grpc_path("Sum");
        let reply = self
            .deadline(self.router.call_client_stream(
                &path,
                Box::pin(futures::stream::iter(frames)),
                MetadataMap::new(),
            ))
            .await?;
        decode(reply)
    }

    pub fn chat<S>(&self, messages: S) -> Result<DecodedInbound<ChatMessage>, Status>
    where
        S: Stream<Item = ChatMessage> + Send + 'static,
    {
        let frames: Streaming<Bytes> =
            Box::pin(messages.map(|message| Ok::<_, Status>(encode(&message))));
        let path = self.config.grpc_path("Chat");
        let replies = self
            .router
            .call_bidi_stream(&path, frames, MetadataMap::new())?;
        Ok(DecodedInbound::new(replies))
    }

    async fn deadline<F, T>(&self, call: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, Status>>,
    {
        tokio::time::timeout(self.config.timeout, call)
            .await
            .map_err(|_| Status::deadline_exceeded("echo call timed out"))?
    }
}
