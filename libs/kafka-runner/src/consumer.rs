use std::future::Future;
use std::pin::Pin;

use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use tokio_util::sync::CancellationToken;

use runner::{Runner, RunnerError};

use crate::error::KafkaRunnerError;
use crate::message::ReceivedMessage;
use crate::registry::HandlerRegistry;

/// Offset acknowledgement seam. `store_offset` on the live consumer, a
/// recording fake in tests.
trait Ack {
    fn ack(&self, topic: &str, partition: i32, offset: i64) -> Result<(), KafkaError>;
}

impl Ack for StreamConsumer {
    fn ack(&self, topic: &str, partition: i32, offset: i64) -> Result<(), KafkaError> {
        // The stored offset is committed in the background by the
        // autocommit timer; the client stores offset + 1 itself.
        self.store_offset(topic, partition, offset)
    }
}

/// Consumer half of the loop: joins the group, subscribes to every
/// registered topic and feeds claimed messages through the registry.
pub struct ConsumerGroupRunner {
    client_config: ClientConfig,
    topics: Vec<String>,
    registry: HandlerRegistry,
}

impl ConsumerGroupRunner {
    /// The subscription list is derived from the registry, so an empty
    /// registry is rejected up front.
    pub fn new(
        brokers: &[String],
        group_id: &str,
        mut client_config: ClientConfig,
        registry: HandlerRegistry,
    ) -> Result<Self, KafkaRunnerError> {
        if registry.is_empty() {
            return Err(KafkaRunnerError::NoTopics);
        }
        client_config
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", group_id);
        Ok(ConsumerGroupRunner {
            client_config,
            topics: registry.topics(),
            registry,
        })
    }
}

impl Runner for ConsumerGroupRunner {
    fn name(&self) -> &str {
        "consumer-group"
    }

    fn run(
        &mut self,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + '_>> {
        Box::pin(async move {
            let consumer: StreamConsumer = self
                .client_config
                .create()
                .map_err(KafkaRunnerError::Kafka)?;
            let topic_refs: Vec<&str> = self.topics.iter().map(String::as_str).collect();
            consumer
                .subscribe(&topic_refs)
                .map_err(KafkaRunnerError::Kafka)?;
            tracing::info!(topics = ?self.topics, "consumer group joined");

            loop {
                match consume_claims(&consumer, &self.registry, &token).await {
                    Ok(()) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "consumer group error");
                        // Leave and rejoin so the unacknowledged message
                        // is redelivered from the last committed offset.
                        consumer.unsubscribe();
                        consumer
                            .subscribe(&topic_refs)
                            .map_err(KafkaRunnerError::Kafka)?;
                    }
                }
            }

            consumer.unsubscribe();
            tracing::info!("consumer group left");
            Ok(())
        })
    }
}

/// One claim session: runs until cancellation (`Ok`) or until a
/// dispatch error ends the session (`Err`).
async fn consume_claims(
    consumer: &StreamConsumer,
    registry: &HandlerRegistry,
    token: &CancellationToken,
) -> Result<(), KafkaRunnerError> {
    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            received = consumer.recv() => {
                // Copy out of the client buffer before dispatching.
                let msg = match received {
                    Ok(msg) => ReceivedMessage::from_borrowed(&msg),
                    Err(e) => {
                        // Transport errors; the client retries internally,
                        // so log them and keep the session alive.
                        tracing::error!(error = %e, "consumer error");
                        continue;
                    }
                };
                dispatch_message(registry, consumer, msg, token).await?;
            }
        }
    }
}

/// Registry lookup, handler call, acknowledge. A message is
/// acknowledged at most once and only after its handler returned `Ok`.
async fn dispatch_message<A: Ack>(
    registry: &HandlerRegistry,
    ack: &A,
    msg: ReceivedMessage,
    token: &CancellationToken,
) -> Result<(), KafkaRunnerError> {
    let handler = registry
        .get(&msg.topic)
        .ok_or_else(|| KafkaRunnerError::MissingHandler(msg.topic.clone()))?
        .clone();

    let topic = msg.topic.clone();
    let partition = msg.partition;
    let offset = msg.offset;

    handler(token.clone(), msg)
        .await
        .map_err(|source| KafkaRunnerError::Handler {
            topic: topic.clone(),
            partition,
            offset,
            source,
        })?;

    ack.ack(&topic, partition, offset)?;
    Ok(())
}
