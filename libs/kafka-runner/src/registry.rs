use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::message::ReceivedMessage;

/// Error type handlers are allowed to fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-topic message handler.
///
/// An `Err` leaves the message unacknowledged, so the group redelivers
/// it after the session is re-established.
pub type ConsumerFn = Arc<
    dyn Fn(
            CancellationToken,
            ReceivedMessage,
        ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>
        + Send
        + Sync,
>;

/// Topic name to handler map. Populated once at startup, read-only
/// afterwards.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, ConsumerFn>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler for a topic. A second registration for
    /// the same topic replaces the first.
    pub fn register<F, Fut>(&mut self, topic: impl Into<String>, handler: F)
    where
        F: Fn(CancellationToken, ReceivedMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let wrapped: ConsumerFn = Arc::new(move |token, msg| Box::pin(handler(token, msg)));
        self.handlers.insert(topic.into(), wrapped);
    }

    pub fn get(&self, topic: &str) -> Option<&ConsumerFn> {
        self.handlers.get(topic)
    }

    /// Topics with a registered handler, sorted so the subscribe order
    /// is deterministic.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn received(topic: &str) -> ReceivedMessage {
        ReceivedMessage {
            topic: topic.to_string(),
            partition: 0,
            offset: 0,
            key: None,
            payload: b"payload".to_vec(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        registry.register("my-topic", |_token, _msg| async { Ok(()) });

        assert!(registry.get("my-topic").is_some());
        assert!(registry.get("other-topic").is_none());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_topics_are_sorted() {
        let mut registry = HandlerRegistry::new();
        registry.register("b-topic", |_token, _msg| async { Ok(()) });
        registry.register("a-topic", |_token, _msg| async { Ok(()) });
        registry.register("c-topic", |_token, _msg| async { Ok(()) });

        assert_eq!(registry.topics(), vec!["a-topic", "b-topic", "c-topic"]);
    }

    #[test]
    fn test_second_registration_replaces_first() {
        let mut registry = HandlerRegistry::new();
        registry.register("my-topic", |_token, _msg| async { Ok(()) });
        registry.register("my-topic", |_token, _msg| async { Ok(()) });

        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_registered_handler_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let mut registry = HandlerRegistry::new();
        registry.register("my-topic", move |_token, msg| {
            let calls = calls_in.clone();
            async move {
                assert_eq!(msg.topic, "my-topic");
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let handler = registry.get("my-topic").unwrap().clone();
        handler(CancellationToken::new(), received("my-topic"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
