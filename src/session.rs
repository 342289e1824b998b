//! Conversation session: the transcript, the turn-taking state, and the
//! reply requests that are still outstanding.
//!
//! A session is mutated only through [`ConversationSession::submit`],
//! [`ConversationSession::on_reply_received`] and envelope delivery from its
//! reply tasks. Every mutation happens synchronously on the caller's task;
//! the only suspension point is the spawned reply request, whose result comes
//! back as a [`ReplyEnvelope`] over the host's channel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ReplyError, SubmissionError};
use crate::events::{Message, MessageId, OverlapPolicy, SessionEvent, SessionState, TurnId};
use crate::responder::{AssistantReply, AssistantResponder};
use crate::transcript::Transcript;

/// Identity of one session instance. The generation changes every time the
/// panel reopens, so replies addressed to an earlier session can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub id: Uuid,
    pub generation: u64,
}

impl SessionHandle {
    pub fn new(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
        }
    }
}

/// Result of one reply request, addressed to the session and turn that issued it
#[derive(Debug)]
pub struct ReplyEnvelope {
    pub handle: SessionHandle,
    pub turn: TurnId,
    pub outcome: Result<AssistantReply, ReplyError>,
}

/// What happened to a delivered reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// An assistant message was appended
    Appended(MessageId),
    /// The turn was resolved as failed
    Failed(TurnId),
    /// Not for this session, or the turn was already resolved
    Stale,
    /// The session had already been torn down
    Disposed,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub overlap_policy: OverlapPolicy,
    pub reply_timeout: Duration,
    pub announce_failures: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::Reject,
            reply_timeout: Duration::from_secs(30),
            announce_failures: true,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            overlap_policy: config.session.overlap_policy,
            reply_timeout: config.reply_timeout(),
            announce_failures: config.session.announce_failures,
        }
    }

    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

struct PendingTurn {
    turn: TurnId,
    /// None while the turn waits in the queue
    task: Option<JoinHandle<()>>,
}

impl PendingTurn {
    fn cancel(self) {
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

/// Owns one conversation's transcript and turn-taking state
pub struct ConversationSession {
    handle: SessionHandle,
    options: SessionOptions,
    transcript: Transcript,
    state: SessionState,
    responder: Arc<dyn AssistantResponder>,
    replies: mpsc::UnboundedSender<ReplyEnvelope>,
    pending: VecDeque<PendingTurn>,
    next_turn: u64,
    subscribers: Vec<mpsc::UnboundedSender<SessionEvent>>,
    disposed: bool,
}

impl ConversationSession {
    pub fn new(
        handle: SessionHandle,
        options: SessionOptions,
        responder: Arc<dyn AssistantResponder>,
        replies: mpsc::UnboundedSender<ReplyEnvelope>,
    ) -> Self {
        Self {
            handle,
            options,
            transcript: Transcript::new(),
            state: SessionState::Idle,
            responder,
            replies,
            pending: VecDeque::new(),
            next_turn: 1,
            subscribers: Vec::new(),
            disposed: false,
        }
    }

    /// Submit a user utterance.
    ///
    /// Must be called from within a tokio runtime: on success a reply request
    /// is spawned (or queued, under [`OverlapPolicy::Queue`]).
    pub fn submit(&mut self, text: &str) -> Result<MessageId, SubmissionError> {
        if self.disposed {
            return Err(SubmissionError::Disposed);
        }

        let content = text.trim();
        if content.is_empty() {
            return Err(SubmissionError::EmptyInput);
        }

        if self.options.overlap_policy == OverlapPolicy::Reject && !self.pending.is_empty() {
            debug!(session = %self.handle.id, "submission rejected, reply pending");
            return Err(SubmissionError::ReplyPending);
        }

        let message = self.transcript.append_user(content).clone();
        let id = message.id;
        debug!(session = %self.handle.id, message = %id, "user message appended");
        self.emit(SessionEvent::MessageAppended(message));

        let turn = TurnId(self.next_turn);
        self.next_turn += 1;
        self.pending.push_back(PendingTurn { turn, task: None });
        self.set_state(SessionState::AwaitingReply);

        match self.options.overlap_policy {
            OverlapPolicy::Queue => self.dispatch_queued(),
            OverlapPolicy::Reject | OverlapPolicy::Concurrent => self.dispatch(turn),
        }

        Ok(id)
    }

    /// Reply callback: resolves the oldest outstanding turn with `content`.
    ///
    /// With nothing outstanding the message is still appended and the state
    /// stays idle. After disposal the reply is dropped.
    pub fn on_reply_received(&mut self, content: impl Into<String>) {
        if self.disposed {
            debug!(session = %self.handle.id, "discarding reply for disposed session");
            return;
        }

        match self.pending.pop_front() {
            Some(pending) => {
                debug!(session = %self.handle.id, turn = %pending.turn, "turn resolved externally");
                pending.cancel();
            }
            None => debug!(session = %self.handle.id, "unsolicited assistant message"),
        }

        self.append_reply(AssistantReply::from(content.into()));
        self.after_turn_resolved();
    }

    /// Apply the outcome of a spawned reply request
    pub fn deliver(&mut self, envelope: ReplyEnvelope) -> Delivery {
        if self.disposed {
            debug!(session = %envelope.handle.id, turn = %envelope.turn, "discarding reply for disposed session");
            return Delivery::Disposed;
        }

        if envelope.handle != self.handle {
            debug!(turn = %envelope.turn, generation = envelope.handle.generation, "discarding reply for another session");
            return Delivery::Stale;
        }

        let Some(index) = self.pending.iter().position(|p| p.turn == envelope.turn) else {
            debug!(session = %self.handle.id, turn = %envelope.turn, "discarding reply for resolved turn");
            return Delivery::Stale;
        };
        // The task has finished; dropping its handle just detaches it.
        self.pending.remove(index);

        let delivery = match envelope.outcome {
            Ok(reply) => Delivery::Appended(self.append_reply(reply)),
            Err(error) => {
                self.fail_turn(envelope.turn, error);
                Delivery::Failed(envelope.turn)
            }
        };

        self.after_turn_resolved();
        delivery
    }

    /// Tear the session down. Outstanding requests are aborted and any reply
    /// that still arrives is ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.cancel_pending();
        self.disposed = true;
        self.set_state(SessionState::Idle);
        self.emit(SessionEvent::Disposed);
        self.subscribers.clear();
        debug!(session = %self.handle.id, "session disposed");
    }

    /// Receive a [`SessionEvent`] for every subsequent mutation
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.disposed {
            self.subscribers.push(tx);
        }
        rx
    }

    pub fn current_transcript(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn current_state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Number of replies still expected, queued ones included
    pub fn outstanding_replies(&self) -> usize {
        self.pending.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn dispatch(&mut self, turn: TurnId) {
        let transcript = self.transcript.snapshot();
        let responder = Arc::clone(&self.responder);
        let replies = self.replies.clone();
        let handle = self.handle;
        let timeout = self.options.reply_timeout;

        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, responder.request_reply(transcript)).await {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(err)) => Err(ReplyError::Failure(format!("{err:#}"))),
                Err(_) => Err(ReplyError::Timeout(timeout)),
            };
            // A closed channel means the host is gone and nobody is listening.
            let _ = replies.send(ReplyEnvelope {
                handle,
                turn,
                outcome,
            });
        });

        debug!(session = %self.handle.id, turn = %turn, "reply requested");
        if let Some(pending) = self.pending.iter_mut().find(|p| p.turn == turn) {
            pending.task = Some(task);
        }
    }

    /// Dispatch the head of the queue if it is still waiting
    fn dispatch_queued(&mut self) {
        let next = match self.pending.front() {
            Some(front) if front.task.is_none() => front.turn,
            _ => return,
        };
        self.dispatch(next);
    }

    fn append_reply(&mut self, reply: AssistantReply) -> MessageId {
        let message = self
            .transcript
            .append_assistant(reply.content, reply.kind)
            .clone();
        let id = message.id;
        debug!(session = %self.handle.id, message = %id, "assistant message appended");
        self.emit(SessionEvent::MessageAppended(message));
        id
    }

    fn fail_turn(&mut self, turn: TurnId, error: ReplyError) {
        warn!(session = %self.handle.id, turn = %turn, %error, "reply failed");
        if self.options.announce_failures {
            let notice = self.transcript.append_system(error.to_string()).clone();
            self.emit(SessionEvent::MessageAppended(notice));
        }
        self.emit(SessionEvent::ReplyFailed { turn, error });
    }

    fn after_turn_resolved(&mut self) {
        if self.pending.is_empty() {
            self.set_state(SessionState::Idle);
        } else {
            self.dispatch_queued();
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        debug!(session = %self.handle.id, from = %self.state, to = %state, "state changed");
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn cancel_pending(&mut self) {
        for pending in self.pending.drain(..) {
            pending.cancel();
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MessageKind, Sender};
    use crate::responder::CannedResponder;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl AssistantResponder for Silent {
        async fn request_reply(&self, _transcript: Vec<Message>) -> anyhow::Result<AssistantReply> {
            std::future::pending().await
        }
    }

    struct Broken;

    #[async_trait]
    impl AssistantResponder for Broken {
        async fn request_reply(&self, _transcript: Vec<Message>) -> anyhow::Result<AssistantReply> {
            Err(anyhow!("upstream unavailable"))
        }
    }

    fn session_with(
        responder: Arc<dyn AssistantResponder>,
        options: SessionOptions,
    ) -> (ConversationSession, mpsc::UnboundedReceiver<ReplyEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConversationSession::new(SessionHandle::new(1), options, responder, tx), rx)
    }

    #[tokio::test]
    async fn whitespace_only_input_is_rejected_without_effect() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        let mut events = session.subscribe();

        for input in ["", "   ", "\n\t "] {
            assert_eq!(session.submit(input), Err(SubmissionError::EmptyInput));
        }

        assert!(session.current_transcript().is_empty());
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn submitted_text_is_trimmed_but_keeps_inner_newlines() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        session.submit("  first line\nsecond line \n").unwrap();
        assert_eq!(session.current_transcript()[0].content, "first line\nsecond line");
    }

    #[tokio::test(start_paused = true)]
    async fn envelope_completes_the_turn() {
        let (mut session, mut rx) =
            session_with(Arc::new(CannedResponder::new("hi there")), SessionOptions::default());

        let id = session.submit("hello").unwrap();
        assert_eq!(session.current_state(), SessionState::AwaitingReply);

        let envelope = rx.recv().await.unwrap();
        let delivery = session.deliver(envelope);

        let reply = session.current_transcript().last().unwrap();
        assert_eq!(delivery, Delivery::Appended(reply.id));
        assert_ne!(reply.id, id);
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.kind, MessageKind::Plain);
        assert_eq!(session.current_state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reopens_the_session() {
        let options = SessionOptions::default().with_timeout(Duration::from_secs(5));
        let (mut session, mut rx) = session_with(Arc::new(Silent), options);
        let mut events = session.subscribe();

        session.submit("anyone there?").unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.outcome, Err(ReplyError::Timeout(Duration::from_secs(5))));

        assert_eq!(session.deliver(envelope), Delivery::Failed(TurnId(1)));
        assert_eq!(session.current_state(), SessionState::Idle);

        let notice = session.current_transcript().last().unwrap();
        assert_eq!(notice.sender, Sender::System);
        assert_eq!(notice.content, "assistant did not reply within 5s");

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::ReplyFailed { turn, .. } = event {
                assert_eq!(turn, TurnId(1));
                saw_failure = true;
            }
        }
        assert!(saw_failure);

        // and the user can try again
        assert!(session.submit("retry").is_ok());
    }

    #[tokio::test]
    async fn failure_without_announcement_leaves_no_trace_in_transcript() {
        let mut options = SessionOptions::default();
        options.announce_failures = false;
        let (mut session, mut rx) = session_with(Arc::new(Broken), options);

        session.submit("hello").unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(
            envelope.outcome,
            Err(ReplyError::failure("upstream unavailable"))
        );
        session.deliver(envelope);

        assert_eq!(session.current_transcript().len(), 1);
        assert_eq!(session.current_state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn late_reply_after_dispose_is_ignored() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        session.submit("hello").unwrap();
        let handle = session.handle();

        session.dispose();
        assert_eq!(session.current_state(), SessionState::Idle);
        assert_eq!(session.outstanding_replies(), 0);

        let delivery = session.deliver(ReplyEnvelope {
            handle,
            turn: TurnId(1),
            outcome: Ok("too late".into()),
        });
        assert_eq!(delivery, Delivery::Disposed);

        session.on_reply_received("also too late");
        assert_eq!(session.current_transcript().len(), 1);
        assert_eq!(session.submit("again"), Err(SubmissionError::Disposed));
    }

    #[tokio::test]
    async fn envelope_from_other_generation_is_stale() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        session.submit("hello").unwrap();

        let delivery = session.deliver(ReplyEnvelope {
            handle: SessionHandle::new(7),
            turn: TurnId(1),
            outcome: Ok("wrong session".into()),
        });

        assert_eq!(delivery, Delivery::Stale);
        assert_eq!(session.current_state(), SessionState::AwaitingReply);
        assert_eq!(session.current_transcript().len(), 1);
    }

    #[tokio::test]
    async fn external_reply_resolves_turn_and_drops_duplicate_envelope() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        session.submit("hello").unwrap();
        let handle = session.handle();

        session.on_reply_received("hi there");
        assert_eq!(session.current_state(), SessionState::Idle);

        let delivery = session.deliver(ReplyEnvelope {
            handle,
            turn: TurnId(1),
            outcome: Ok("duplicate".into()),
        });
        assert_eq!(delivery, Delivery::Stale);
        assert_eq!(session.current_transcript().len(), 2);
    }

    #[tokio::test]
    async fn unsolicited_reply_is_appended_and_state_stays_idle() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        let mut events = session.subscribe();

        session.on_reply_received("Welcome!");

        assert_eq!(session.current_transcript().len(), 1);
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(matches!(events.try_recv(), Ok(SessionEvent::MessageAppended(_))));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_are_observable_before_submit_returns() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        let mut events = session.subscribe();

        let id = session.submit("hello").unwrap();

        match events.try_recv() {
            Ok(SessionEvent::MessageAppended(message)) => assert_eq!(message.id, id),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(
            events.try_recv(),
            Ok(SessionEvent::StateChanged(SessionState::AwaitingReply))
        );
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let (mut session, _rx) = session_with(Arc::new(Silent), SessionOptions::default());
        drop(session.subscribe());
        let mut live = session.subscribe();

        session.on_reply_received("hi");
        assert_eq!(session.subscribers.len(), 1);
        assert!(live.try_recv().is_ok());
    }
}
