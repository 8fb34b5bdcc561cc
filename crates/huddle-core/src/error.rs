use thiserror::Error;

/// Failures talking to the meeting backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no data received for {0}s")]
    IdleTimeout(u64),
}

/// Failures of a chat operation. Cancellation is not one of them: a stopped
/// stream is reported through `SendOutcome::Cancelled`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no responder selected")]
    NoResponder,
    #[error("staff {0} is not a participant in this meeting")]
    NotAParticipant(i64),
    #[error("meeting has no participants")]
    NoParticipants,
    #[error("a response is already streaming")]
    Busy,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ChatError {
    /// True for errors raised before any request was issued.
    pub fn is_local(&self) -> bool {
        !matches!(self, ChatError::Api(_))
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
