use bytes::Bytes;
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::decode::Utf8Decoder;
use crate::api::ByteStream;
use crate::chat::message::MessageId;
use crate::error::ApiError;

/// One published state of a streaming message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageUpdate {
    pub id: MessageId,
    /// Everything received so far.
    pub content: String,
    /// Clear the thinking flag in this same update.
    pub clear_thinking: bool,
    /// Last update for this message.
    pub finished: bool,
}

/// Receives streaming updates. Each update must be applied atomically.
pub trait MessageSink: Send + Sync {
    fn publish(&self, update: MessageUpdate);
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(String),
    /// The token fired. Nothing was cleaned up; the caller reconciles.
    Cancelled,
}

/// Reads one streamed reply into one placeholder message.
pub struct StreamConsumer {
    placeholder: MessageId,
    cancel: CancellationToken,
    idle_timeout: Option<Duration>,
}

impl StreamConsumer {
    pub fn new(placeholder: MessageId, cancel: CancellationToken) -> Self {
        Self {
            placeholder,
            cancel,
            idle_timeout: None,
        }
    }

    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }

    /// Await `request`, then publish the accumulated text after every chunk.
    ///
    /// The token is checked while the request is being set up and before
    /// every chunk read. Dropping the stream on cancel aborts the request.
    pub async fn run<F>(self, request: F, sink: &dyn MessageSink) -> Result<StreamOutcome, ApiError>
    where
        F: Future<Output = Result<ByteStream, ApiError>>,
    {
        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(placeholder = %self.placeholder, "cancelled before response");
                return Ok(StreamOutcome::Cancelled);
            }
            resp = request => resp?,
        };

        let mut decoder = Utf8Decoder::new();
        let mut content = String::new();
        let mut first = true;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(placeholder = %self.placeholder, received = content.len(), "stream cancelled");
                    return Ok(StreamOutcome::Cancelled);
                }
                next = self.next_chunk(&mut stream) => next?,
            };
            let Some(bytes) = next else { break };

            let text = decoder.decode(&bytes);
            if text.is_empty() {
                continue;
            }
            content.push_str(&text);
            debug!(placeholder = %self.placeholder, bytes = bytes.len(), "chunk");
            sink.publish(MessageUpdate {
                id: self.placeholder,
                content: content.clone(),
                clear_thinking: first,
                finished: false,
            });
            first = false;
        }

        content.push_str(&decoder.finish());
        sink.publish(MessageUpdate {
            id: self.placeholder,
            content: content.clone(),
            clear_thinking: true,
            finished: true,
        });
        Ok(StreamOutcome::Completed(content))
    }

    async fn next_chunk(&self, stream: &mut ByteStream) -> Result<Option<Bytes>, ApiError> {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| ApiError::IdleTimeout(limit.as_secs()))?,
            None => stream.next().await,
        };
        next.transpose()
    }
}
