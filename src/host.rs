use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::responder::{AssistantResponder, CannedResponder};
use crate::session::{ConversationSession, Delivery, ReplyEnvelope, SessionHandle, SessionOptions};

/// Panel-side owner of the live conversation session.
///
/// Reply tasks from every session the host ever opened post to one channel.
/// Envelopes are routed only while their handle matches the live session, so
/// a reply for a closed panel is dropped rather than applied.
pub struct SessionHost {
    options: SessionOptions,
    responder: Arc<dyn AssistantResponder>,
    replies_tx: mpsc::UnboundedSender<ReplyEnvelope>,
    replies_rx: mpsc::UnboundedReceiver<ReplyEnvelope>,
    generation: u64,
    session: Option<ConversationSession>,
}

impl SessionHost {
    pub fn new(options: SessionOptions, responder: Arc<dyn AssistantResponder>) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            options,
            responder,
            replies_tx,
            replies_rx,
            generation: 0,
            session: None,
        }
    }

    /// Host backed by the canned responder described in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SessionOptions::from_config(config),
            Arc::new(CannedResponder::from_config(config)),
        )
    }

    /// Open a fresh session, disposing the current one if any
    pub fn open(&mut self) -> SessionHandle {
        self.close();
        self.generation += 1;
        let handle = SessionHandle::new(self.generation);
        self.session = Some(ConversationSession::new(
            handle,
            self.options.clone(),
            Arc::clone(&self.responder),
            self.replies_tx.clone(),
        ));
        info!(session = %handle.id, generation = handle.generation, policy = %self.options.overlap_policy, "session opened");
        handle
    }

    /// Dispose the live session. Returns false if none was open.
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => {
                session.dispose();
                info!(session = %session.handle().id, "session closed");
                true
            }
            None => false,
        }
    }

    pub fn session(&self) -> Option<&ConversationSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ConversationSession> {
        self.session.as_mut()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand an envelope to the live session if it is addressed to it
    pub fn route(&mut self, envelope: ReplyEnvelope) -> Delivery {
        match self.session.as_mut() {
            Some(session) if session.handle() == envelope.handle => session.deliver(envelope),
            _ => {
                debug!(
                    generation = envelope.handle.generation,
                    turn = %envelope.turn,
                    "dropping reply for a closed session"
                );
                Delivery::Disposed
            }
        }
    }

    /// Route every envelope that is already waiting. Never blocks.
    /// Returns how many turns were resolved.
    pub fn pump(&mut self) -> usize {
        let mut resolved = 0;
        while let Ok(envelope) = self.replies_rx.try_recv() {
            if matches!(self.route(envelope), Delivery::Appended(_) | Delivery::Failed(_)) {
                resolved += 1;
            }
        }
        resolved
    }

    /// Wait for the next envelope. The host keeps a sender alive, so this
    /// only completes when a reply task reports back.
    pub async fn recv_reply(&mut self) -> Option<ReplyEnvelope> {
        self.replies_rx.recv().await
    }

    /// Wait until the live session has no outstanding replies
    pub async fn settle(&mut self) {
        while self.outstanding_replies() > 0 {
            match self.replies_rx.recv().await {
                Some(envelope) => {
                    self.route(envelope);
                }
                None => break,
            }
        }
    }

    fn outstanding_replies(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, ConversationSession::outstanding_replies)
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SessionState, TurnId};
    use std::time::Duration;

    fn host() -> SessionHost {
        SessionHost::new(
            SessionOptions::default(),
            Arc::new(CannedResponder::new("hi there")),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_canned_reply() {
        let mut host = host();
        host.open();
        host.session_mut().unwrap().submit("hello").unwrap();

        host.settle().await;

        let session = host.session().unwrap();
        assert_eq!(session.current_state(), SessionState::Idle);
        assert_eq!(session.current_transcript()[1].content, "hi there");
    }

    #[tokio::test(start_paused = true)]
    async fn pump_is_a_no_op_before_the_delay_elapses() {
        let mut host = host();
        host.open();
        host.session_mut().unwrap().submit("hello").unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(host.pump(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(host.pump(), 1);
        assert_eq!(host.session().unwrap().current_transcript().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_bumps_generation_and_starts_empty() {
        let mut host = host();
        let first = host.open();
        host.session_mut().unwrap().submit("hello").unwrap();

        let second = host.open();
        assert_eq!(second.generation, first.generation + 1);
        assert_ne!(second.id, first.id);
        assert!(host.session().unwrap().current_transcript().is_empty());

        // a reply addressed to the first session is dropped
        let delivery = host.route(ReplyEnvelope {
            handle: first,
            turn: TurnId(1),
            outcome: Ok("late".into()),
        });
        assert_eq!(delivery, Delivery::Disposed);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(host.pump(), 0);
        assert!(host.session().unwrap().current_transcript().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_with_reply_outstanding_is_quiet() {
        let mut host = host();
        host.open();
        host.session_mut().unwrap().submit("hello").unwrap();

        assert!(host.close());
        assert!(!host.close());
        assert!(host.session().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(host.pump(), 0);
    }
}
