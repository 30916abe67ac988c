use crate::registry::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum KafkaRunnerError {
    #[error("missing handler for topic: {0}")]
    MissingHandler(String),

    #[error("handler failed ({topic}[{partition}] offset {offset}): {source}")]
    Handler {
        topic: String,
        partition: i32,
        offset: i64,
        #[source]
        source: BoxError,
    },

    #[error("kafka client: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("no handlers registered")]
    NoTopics,
}
