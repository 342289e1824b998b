//! Append-only message log for one conversation

use crate::events::{Message, MessageId, MessageKind, Sender};

/// Ordered log of messages. Insertion order is chronological order and
/// entries are never edited, removed or reordered.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a new message and return a reference to it
    pub fn append(&mut self, sender: Sender, content: impl Into<String>, kind: MessageKind) -> &Message {
        let id = self.issue_id();
        self.messages.push(Message::new(id, sender, content, kind));
        &self.messages[self.messages.len() - 1]
    }

    /// Add a user message
    pub fn append_user(&mut self, content: impl Into<String>) -> &Message {
        self.append(Sender::User, content, MessageKind::Plain)
    }

    /// Add an assistant message
    pub fn append_assistant(&mut self, content: impl Into<String>, kind: MessageKind) -> &Message {
        self.append(Sender::Assistant, content, kind)
    }

    /// Add a system notice
    pub fn append_system(&mut self, content: impl Into<String>) -> &Message {
        self.append(Sender::System, content, MessageKind::Plain)
    }

    fn issue_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Owned copy of the current log
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // ids are issued in insertion order, so the log is sorted by id
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|index| &self.messages[index])
    }

    pub fn count_by(&self, sender: Sender) -> usize {
        self.messages.iter().filter(|m| m.sender == sender).count()
    }
}
