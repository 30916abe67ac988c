use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::message::OwnedMessage;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use runner::{Runner, RunnerError};

use crate::error::KafkaRunnerError;
use crate::message::OutboundMessage;

/// Topic plus the outcome reported by the broker for one message.
type DeliveryReport = (String, Result<(i32, i64), KafkaError>);

/// Producer half of the loop: takes messages off an in-process channel,
/// publishes them and logs every delivery report.
pub struct ProducerRunner {
    client_config: ClientConfig,
    input_tx: mpsc::UnboundedSender<OutboundMessage>,
    input_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl ProducerRunner {
    pub fn new(brokers: &[String], mut client_config: ClientConfig) -> Self {
        client_config.set("bootstrap.servers", brokers.join(","));
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        ProducerRunner {
            client_config,
            input_tx,
            input_rx,
        }
    }

    /// Channel feeding this producer. Clone freely; senders stay valid
    /// until the runner itself stops.
    pub fn input(&self) -> mpsc::UnboundedSender<OutboundMessage> {
        self.input_tx.clone()
    }
}

impl Runner for ProducerRunner {
    fn name(&self) -> &str {
        "producer"
    }

    fn run(
        &mut self,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + '_>> {
        Box::pin(async move {
            let producer: FutureProducer = self
                .client_config
                .create()
                .map_err(KafkaRunnerError::Kafka)?;
            tracing::info!("producer started");

            let mut in_flight: JoinSet<DeliveryReport> = JoinSet::new();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    maybe = self.input_rx.recv() => {
                        match maybe {
                            Some(msg) => enqueue(&producer, &mut in_flight, msg),
                            None => break,
                        }
                    }
                    Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                        log_delivery(done);
                    }
                }
            }

            // Wait out deliveries already handed to the client, then
            // flush whatever is still queued inside it.
            while let Some(done) = in_flight.join_next().await {
                log_delivery(done);
            }
            if let Err(e) = producer.flush(Duration::from_secs(5)) {
                tracing::error!(error = %e, "producer flush error");
            }
            tracing::info!("producer stopped");
            Ok(())
        })
    }
}

fn enqueue(
    producer: &FutureProducer,
    in_flight: &mut JoinSet<DeliveryReport>,
    msg: OutboundMessage,
) {
    let mut record = FutureRecord::<Vec<u8>, Vec<u8>>::to(&msg.topic).payload(&msg.payload);
    if let Some(ref key) = msg.key {
        record = record.key(key);
    }
    match producer.send_result(record) {
        Ok(delivery) => {
            let topic = msg.topic.clone();
            in_flight.spawn(async move { delivery_report(topic, delivery.await) });
        }
        // Local queue full or invalid record; there is nothing to await.
        Err((e, _record)) => {
            tracing::error!(topic = %msg.topic, error = %e, "producer error");
        }
    }
}

/// Flattens one awaited delivery into the report the runner logs. The
/// future from `send_result` resolves to a nested result: the outer
/// error means the producer was dropped before the delivery callback
/// fired, and counts as a canceled delivery.
fn delivery_report<E>(
    topic: String,
    outcome: Result<Result<(i32, i64), (KafkaError, OwnedMessage)>, E>,
) -> DeliveryReport {
    match outcome {
        Ok(Ok((partition, offset))) => (topic, Ok((partition, offset))),
        Ok(Err((e, _message))) => (topic, Err(e)),
        Err(_canceled) => (topic, Err(KafkaError::Canceled)),
    }
}

fn log_delivery(done: Result<DeliveryReport, JoinError>) {
    match done {
        Ok((topic, Ok((partition, offset)))) => {
            tracing::info!(topic = %topic, partition, offset, "producer success");
        }
        Ok((topic, Err(e))) => {
            tracing::error!(topic = %topic, error = %e, "producer error");
        }
        Err(e) => {
            tracing::error!(error = %e, "delivery report task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rdkafka::Timestamp;
    use rdkafka::error::RDKafkaErrorCode;

    fn brokers() -> Vec<String> {
        vec!["localhost:9092".to_string()]
    }

    /// The message rdkafka hands back alongside a production error.
    fn undelivered_message() -> OwnedMessage {
        OwnedMessage::new(
            Some(b"message-0".to_vec()),
            None,
            "my-topic".to_string(),
            Timestamp::NotAvailable,
            0,
            0,
            None,
        )
    }

    #[tokio::test]
    async fn test_input_senders_feed_the_runner_channel() {
        let mut runner = ProducerRunner::new(&brokers(), ClientConfig::new());
        let tx_a = runner.input();
        let tx_b = runner.input();

        tx_a.send(OutboundMessage::new("my-topic", "message-0"))
            .unwrap();
        tx_b.send(OutboundMessage::new("my-topic", "message-1"))
            .unwrap();

        let first = runner.input_rx.recv().await.unwrap();
        assert_eq!(first.topic, "my-topic");
        assert_eq!(first.payload, b"message-0");

        let second = runner.input_rx.recv().await.unwrap();
        assert_eq!(second.payload, b"message-1");
    }

    #[test]
    fn test_delivery_report_success_keeps_partition_and_offset() {
        let (topic, outcome) = delivery_report::<()>("my-topic".to_string(), Ok(Ok((3, 42))));

        assert_eq!(topic, "my-topic");
        assert_eq!(outcome.unwrap(), (3, 42));
    }

    #[test]
    fn test_delivery_report_failure_keeps_the_broker_error() {
        let err = KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut);
        let (topic, outcome) =
            delivery_report::<()>("my-topic".to_string(), Ok(Err((err, undelivered_message()))));

        assert_eq!(topic, "my-topic");
        assert!(matches!(
            outcome,
            Err(KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut))
        ));
    }

    #[test]
    fn test_delivery_report_dropped_callback_is_canceled() {
        let (topic, outcome) = delivery_report("my-topic".to_string(), Err(()));

        assert_eq!(topic, "my-topic");
        assert!(matches!(outcome, Err(KafkaError::Canceled)));
    }
}
