pub mod consumer;
pub mod decode;

pub use consumer::{MessageSink, MessageUpdate, StreamConsumer, StreamOutcome};
pub use decode::Utf8Decoder;
