use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kafka_runner::OutboundMessage;
use runner::{Runner, RunnerError};

/// Pause between batches; the first batch goes out a full interval
/// after startup.
const EMIT_INTERVAL: Duration = Duration::from_secs(20);
/// Payloads per batch, "message-0" through "message-4".
const BATCH_SIZE: usize = 5;

/// Feeds the producer a fixed batch of demo messages on a fixed
/// schedule until shutdown.
pub struct Emitter {
    topic: String,
    input: mpsc::UnboundedSender<OutboundMessage>,
}

impl Emitter {
    pub fn new(topic: impl Into<String>, input: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Emitter {
            topic: topic.into(),
            input,
        }
    }

    fn send_batch(&self) -> bool {
        for x in 0..BATCH_SIZE {
            let msg = OutboundMessage::new(self.topic.clone(), format!("message-{x}"));
            if self.input.send(msg).is_err() {
                // Producer is gone; nothing left to feed.
                return false;
            }
        }
        true
    }
}

impl Runner for Emitter {
    fn name(&self) -> &str {
        "emitter"
    }

    fn run(
        &mut self,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + '_>> {
        Box::pin(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(EMIT_INTERVAL) => {
                        if token.is_cancelled() {
                            return Ok(());
                        }
                        if !self.send_batch() {
                            return Ok(());
                        }
                        tracing::debug!(topic = %self.topic, count = BATCH_SIZE, "emitted batch");
                    }
                }
            }
        })
    }
}
