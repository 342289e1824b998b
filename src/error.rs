//! Error types surfaced by the conversation session core.

use std::time::Duration;
use thiserror::Error;

/// Why a call to `submit` was refused. A refused submission never mutates the session.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionError {
    /// Input was empty once surrounding whitespace was trimmed
    #[error("message is empty")]
    EmptyInput,

    /// A reply is still outstanding and the overlap policy is `reject`
    #[error("waiting for the assistant to reply")]
    ReplyPending,

    /// The session has been torn down
    #[error("session is closed")]
    Disposed,
}

/// Why an outstanding reply never produced an assistant message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("assistant did not reply within {}", humanize(*.0))]
    Timeout(Duration),

    #[error("assistant reply failed: {0}")]
    Failure(String),
}

impl ReplyError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

fn humanize(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else if duration < Duration::from_millis(1) {
        format!("{}µs", duration.as_micros())
    } else if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_uses_whole_seconds_when_possible() {
        let err = ReplyError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "assistant did not reply within 30s");

        let err = ReplyError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "assistant did not reply within 1.5s");
    }

    #[test]
    fn sub_second_timeouts_use_smaller_units() {
        let err = ReplyError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "assistant did not reply within 250ms");

        let err = ReplyError::Timeout(Duration::from_micros(500));
        assert_eq!(err.to_string(), "assistant did not reply within 500µs");

        assert_eq!(humanize(Duration::ZERO), "0s");
    }

    #[test]
    fn failure_message_carries_cause() {
        let err = ReplyError::failure("connection reset");
        assert_eq!(err.to_string(), "assistant reply failed: connection reset");
    }
}
