use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use rpcflow::dispatch::{CallContext, StreamingKind, Streaming, handle_message, handle_stream};
use rpcflow::server::{CallDescriptor, Registration, ServiceDescriptor, ServiceRegistry};
use rpcflow::stream::{PushStream, Reply};
use thiserror::Error;
use tonic::Status;
use tracing::debug;

use crate::echo_proto::{
    ChatMessage, CountdownRequest, EchoRequest, EchoResponse, SumRequest, SumResponse, Tick,
};
use crate::{ECHO_SERVICE, ECHO_SERVICE_FULL_NAME};

#[derive(Debug, Error)]
pub enum EchoConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },
}

/// Configuration for the echo service handlers.
#[derive(Debug, Clone)]
pub struct EchoConfig {
    /// Delay between countdown ticks.
    pub tick_interval: Duration,

    /// Largest countdown accepted.
    pub max_countdown: u32,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            max_countdown: 100,
        }
    }
}

impl EchoConfig {
    /// Read overrides from `ECHO_TICK_MS` and `ECHO_MAX_COUNTDOWN`.
    pub fn from_env() -> Result<Self, EchoConfigError> {
        let mut config = Self::default();
        if let Some(ms) = env_var::<u64>("ECHO_TICK_MS")? {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(max) = env_var::<u32>("ECHO_MAX_COUNTDOWN")? {
            config.max_countdown = max;
        }
        Ok(config)
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_max_countdown(mut self, max: u32) -> Self {
        self.max_countdown = max;
        self
    }
}

fn env_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, EchoConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| EchoConfigError::InvalidVar { var, value }),
        Err(_) => Ok(None),
    }
}

/// Register the echo service descriptor.
pub fn register_services(registry: &ServiceRegistry) {
    registry.register(ServiceDescriptor::new(ECHO_SERVICE, ECHO_SERVICE_FULL_NAME));
}

/// Handler registrations for every echo method.
pub fn registrations(config: &EchoConfig) -> Vec<Registration> {
    let descriptor = |method: &str, kind| CallDescriptor::new(ECHO_SERVICE, method, kind);

    vec![
        Registration::with_descriptor(
            &descriptor("Echo", StreamingKind::Unary),
            handle_message(echo),
        ),
        Registration::with_descriptor(
            &descriptor("Countdown", StreamingKind::ServerStream),
            handle_message(countdown(config.clone())),
        ),
        Registration::with_descriptor(
            &descriptor("Sum", StreamingKind::ClientStream),
            handle_stream(sum),
        ),
        Registration::with_descriptor(
            &descriptor("Chat", StreamingKind::BidiStream),
            handle_stream(chat),
        ),
    ]
}

fn echo(request: EchoRequest, ctx: CallContext) -> Reply<EchoResponse> {
    Reply::value(EchoResponse {
        message: request.message,
        call_id: ctx.call_id().to_string(),
    })
}

/// Counts down from the requested value to zero, one tick per interval.
fn countdown(
    config: EchoConfig,
) -> impl Fn(CountdownRequest, CallContext) -> Reply<Tick> + Send + Sync + 'static {
    move |request: CountdownRequest, _ctx: CallContext| {
        if request.from > config.max_countdown {
            return Reply::fail(Status::invalid_argument(format!(
                "countdown from {} exceeds the limit of {}",
                request.from, config.max_countdown
            )));
        }

        let interval = config.tick_interval;
        let ticks = async_stream::stream! {
            for remaining in (0..=request.from).rev() {
                yield Ok(Tick { remaining });
                if remaining > 0 {
                    tokio::time::sleep(interval).await;
                }
            }
        };
        Reply::stream(PushStream::from_stream(ticks))
    }
}

fn sum(requests: Streaming<SumRequest>, _ctx: CallContext) -> Reply<SumResponse> {
    Reply::deferred(requests.try_fold(
        SumResponse::default(),
        |mut acc, request| async move {
            acc.total += request.value;
            acc.count += 1;
            Ok(acc)
        },
    ))
}

/// Answers each chat line as it arrives, so replies flow while the client is
/// still sending.
fn chat(requests: Streaming<ChatMessage>, ctx: CallContext) -> Reply<ChatMessage> {
    let call_id = ctx.call_id();
    let replies = requests.map(move |item| {
        item.map(|message| {
            debug!(%call_id, from = %message.from, "Chat message");
            ChatMessage {
                from: "echo".to_string(),
                text: format!("{}: {}", message.from, message.text),
            }
        })
    });
    Reply::stream(PushStream::from_stream(replies))
}
