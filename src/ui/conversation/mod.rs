//! Conversation UI components for the assistant side panel

pub mod commands;
pub mod composer;
pub mod format;
pub mod history;
pub mod manager;
pub mod streaming;

pub use commands::{get_help_text, parse_slash_command, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use format::FormatOptions;
pub use history::TranscriptView;
pub use manager::{ChatPanel, PanelAction};
pub use streaming::TypingIndicator;
