use rdkafka::Message;
use rdkafka::message::BorrowedMessage;

/// Owned copy of a consumed record.
///
/// Built once per claimed message so handlers never borrow from the
/// client's internal buffers.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl ReceivedMessage {
    pub(crate) fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        ReceivedMessage {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(|k| k.to_vec()),
            payload: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
        }
    }
}

/// Message handed to the producer runner for publishing.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        OutboundMessage {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_message_builder() {
        let plain = OutboundMessage::new("my-topic", "message-0");
        assert_eq!(plain.topic, "my-topic");
        assert_eq!(plain.payload, b"message-0");
        assert!(plain.key.is_none());

        let keyed = OutboundMessage::new("my-topic", "message-1").with_key("k");
        assert_eq!(keyed.key.as_deref(), Some(b"k".as_slice()));
    }
}
