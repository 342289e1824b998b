//! Side-panel conversational assistant.
//!
//! The core is [`session::ConversationSession`]: an append-only transcript
//! plus idle / awaiting-reply turn-taking, fed by an
//! [`responder::AssistantResponder`]. [`host::SessionHost`] owns the live
//! session for a panel and routes reply envelopes to it. `ui` renders it all
//! in a terminal.

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod responder;
pub mod session;
pub mod transcript;
pub mod ui;

pub use config::Config;
pub use error::{ReplyError, SubmissionError};
pub use events::{Message, MessageId, MessageKind, OverlapPolicy, Sender, SessionEvent, SessionState, TurnId};
pub use host::SessionHost;
pub use responder::{AssistantReply, AssistantResponder, CannedResponder};
pub use session::{ConversationSession, Delivery, ReplyEnvelope, SessionHandle, SessionOptions};
pub use transcript::Transcript;
