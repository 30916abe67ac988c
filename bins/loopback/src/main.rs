mod config;
mod emitter;
mod error;

use tokio_util::sync::CancellationToken;

use kafka_runner::{
    BoxError, ConsumerGroupRunner, HandlerRegistry, ProducerRunner, ReceivedMessage,
};
use runner::Supervisor;

use crate::emitter::Emitter;

const CONSUMER_GROUP: &str = "my-consumer-group";
const TOPIC: &str = "my-topic";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let consumer_brokers = match config::brokers_from_env(config::CONSUMER_ADDRESS_VAR) {
        Ok(brokers) => brokers,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };
    let producer_brokers = match config::brokers_from_env(config::PRODUCER_ADDRESS_VAR) {
        Ok(brokers) => brokers,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let mut registry = HandlerRegistry::new();
    registry.register(TOPIC, handle_message);

    let consumer = match ConsumerGroupRunner::new(
        &consumer_brokers,
        CONSUMER_GROUP,
        config::consumer_client_config(),
        registry,
    ) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!(error = %e, "failed to build consumer runner");
            std::process::exit(1);
        }
    };

    let producer = ProducerRunner::new(&producer_brokers, config::producer_client_config());
    let produce_input = producer.input();

    let mut supervisor = Supervisor::new();
    let token = supervisor.token();

    supervisor.spawn(consumer);
    supervisor.spawn(producer);
    supervisor.spawn(Emitter::new(TOPIC, produce_input));

    tracing::info!(
        group = CONSUMER_GROUP,
        topic = TOPIC,
        "loopback started, press Ctrl+C to stop"
    );

    // Listen for SIGINT/SIGTERM (shutdown); a failed runner cancels the
    // shared token and takes the same exit path.
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                std::process::exit(1);
            }
        };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
        _ = token.cancelled() => {}
    }

    tracing::info!("shutting down...");
    supervisor.shutdown().await;
}

/// The demo's only handler: log each consumed payload.
async fn handle_message(_token: CancellationToken, msg: ReceivedMessage) -> Result<(), BoxError> {
    tracing::info!(payload = %String::from_utf8_lossy(&msg.payload), "handle message");
    Ok(())
}
