pub mod error;

mod consumer;
mod message;
mod producer;
mod registry;

pub use consumer::ConsumerGroupRunner;
pub use error::KafkaRunnerError;
pub use message::{OutboundMessage, ReceivedMessage};
pub use producer::ProducerRunner;
pub use registry::{BoxError, ConsumerFn, HandlerRegistry};
