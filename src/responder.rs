use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::events::{Message, MessageKind};

/// Content produced by the assistant for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
    pub kind: MessageKind,
}

impl AssistantReply {
    pub fn new(content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }
}

impl From<String> for AssistantReply {
    fn from(content: String) -> Self {
        Self::new(content, MessageKind::Plain)
    }
}

impl From<&str> for AssistantReply {
    fn from(content: &str) -> Self {
        Self::new(content, MessageKind::Plain)
    }
}

/// Opaque source of assistant replies.
///
/// Receives the transcript as it stood when the request was dispatched. The
/// session enforces its own timeout around the call, so implementations do
/// not need one.
#[async_trait]
pub trait AssistantResponder: Send + Sync {
    async fn request_reply(&self, transcript: Vec<Message>) -> Result<AssistantReply>;
}

/// Stub responder that waits a fixed delay and answers with a canned reply
#[derive(Debug, Clone)]
pub struct CannedResponder {
    reply: String,
    kind: MessageKind,
    delay: Duration,
}

impl CannedResponder {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            kind: MessageKind::Plain,
            delay: Self::DEFAULT_DELAY,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.assistant.canned_reply.clone())
            .with_kind(config.assistant.reply_kind)
            .with_delay(config.reply_delay())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl AssistantResponder for CannedResponder {
    async fn request_reply(&self, transcript: Vec<Message>) -> Result<AssistantReply> {
        tracing::trace!(messages = transcript.len(), delay_ms = self.delay.as_millis() as u64, "canned reply scheduled");
        tokio::time::sleep(self.delay).await;
        Ok(AssistantReply::new(self.reply.clone(), self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn canned_reply_arrives_after_delay() {
        let responder = CannedResponder::new("hi there");
        let started = Instant::now();
        let reply = responder.request_reply(Vec::new()).await.unwrap();
        assert_eq!(reply, AssistantReply::from("hi there"));
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[test]
    fn from_config_uses_configured_kind_and_delay() {
        let mut config = Config::default();
        config.assistant.canned_reply = "try `cargo doc`".to_string();
        config.assistant.reply_kind = MessageKind::Suggestion;
        config.assistant.reply_delay_ms = 20;

        let responder = CannedResponder::from_config(&config);
        assert_eq!(responder.delay(), Duration::from_millis(20));
        assert_eq!(responder.kind, MessageKind::Suggestion);
        assert_eq!(responder.reply, "try `cargo doc`");
    }
}
