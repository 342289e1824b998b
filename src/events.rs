use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

use crate::error::ReplyError;

/// Identifier of a message within one session's transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Identifier of one outstanding reply request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    /// Failure notices raised by the session itself
    System,
}

/// Presentation hint carried by a message. Never affects ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Plain,
    Code,
    Suggestion,
}

/// A single immutable transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub kind: MessageKind,
}

impl Message {
    pub fn new(id: MessageId, sender: Sender, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id,
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_suggestion(&self) -> bool {
        self.kind == MessageKind::Suggestion
    }
}

/// Turn-taking state of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingReply,
}

/// How submissions made while a reply is outstanding are treated
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OverlapPolicy {
    /// Refuse a new submission until the pending reply lands
    #[default]
    Reject,
    /// Accept it, but request replies one at a time in submission order
    Queue,
    /// Dispatch every request immediately and count the outstanding ones
    Concurrent,
}

/// Notifications pushed to subscribers after each mutation
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message was appended to the transcript
    MessageAppended(Message),

    /// The session moved between idle and awaiting-reply
    StateChanged(SessionState),

    /// A reply request timed out or failed
    ReplyFailed { turn: TurnId, error: ReplyError },

    /// The session was torn down
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_defaults_to_plain_when_missing_from_json() {
        let json = r#"{"id":3,"content":"hi","sender":"assistant","timestamp":"2024-05-01T10:00:00Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.kind, MessageKind::Plain);
        assert_eq!(message.id, MessageId(3));
        assert_eq!(message.sender, Sender::Assistant);
    }

    #[test]
    fn overlap_policy_parses_from_config_strings() {
        assert_eq!(OverlapPolicy::from_str("queue").unwrap(), OverlapPolicy::Queue);
        assert_eq!(OverlapPolicy::from_str("concurrent").unwrap(), OverlapPolicy::Concurrent);
        assert!(OverlapPolicy::from_str("parallel").is_err());
    }

    #[test]
    fn state_displays_in_kebab_case() {
        assert_eq!(SessionState::AwaitingReply.to_string(), "awaiting-reply");
        assert_eq!(SessionState::Idle.to_string(), "idle");
    }
}
