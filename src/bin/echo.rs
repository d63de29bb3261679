use anyhow::Result;
use futures::StreamExt;
use rpcflow::server::{Binder, BinderConfig, Router, ServiceRegistry};
use rpcflow_prototype::client::{EchoClient, EchoClientConfig};
use rpcflow_prototype::echo::{self, EchoConfig};
use rpcflow_prototype::echo_proto::ChatMessage;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EchoConfig::from_env()?;
    let strict = std::env::var("RPCFLOW_STRICT").is_ok_and(|v| v == "1" || v == "true");

    let registry = Arc::new(ServiceRegistry::new());
    echo::register_services(&registry);

    let router = Arc::new(Router::new());
    let binder = Binder::new(registry, BinderConfig::new().with_strict(strict));
    let report = binder.bind(echo::registrations(&config), router.as_ref())?;
    info!(
        attached = ?report.attached,
        skipped = ?report.skipped,
        methods = report.table.method_count(),
        "Bound services"
    );

    let client = EchoClient::new(Arc::clone(&router), EchoClientConfig::default());

    let reply = client.echo("hello").await?;
    info!(message = %reply.message, call_id = %reply.call_id, "Echo");

    let mut ticks = client.countdown(3)?;
    while let Some(tick) = ticks.next().await {
        let tick = tick?;
        info!(remaining = tick.remaining, "Countdown");
    }

    let total = client.sum([1, 2, 3, 4]).await?;
    info!(total = total.total, count = total.count, "Sum");

    let lines = ["hi", "how are you", "bye"].map(|text| ChatMessage {
        from: "demo".to_string(),
        text: text.to_string(),
    });
    let mut replies = client.chat(futures::stream::iter(lines))?;
    while let Some(reply) = replies.next().await {
        let reply = reply?;
        info!(from = %reply.from, text = %reply.text, "Chat");
    }

    Ok(())
}
