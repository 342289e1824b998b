use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a fresh conversation
    New,
    /// Show help
    Help,
    /// Close the panel
    Bye,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "discard this conversation and start a new one",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "close the assistant panel",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input.
///
/// Only a bare command word counts; anything typed after it makes the input
/// an ordinary message.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let head = input.trim().strip_prefix('/')?;
    if head.is_empty() || head.contains(char::is_whitespace) {
        return None;
    }

    SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" | "close" => Some(SlashCommand::Bye),
        "h" | "?" => Some(SlashCommand::Help),
        "reset" | "clear" => Some(SlashCommand::New),
        _ => None,
    })
}

/// One-line help for the status bar
pub fn get_help_text() -> String {
    SlashCommand::iter()
        .map(|c| format!("/{} {}", c.command(), c.description()))
        .collect::<Vec<_>>()
        .join(" · ")
}
