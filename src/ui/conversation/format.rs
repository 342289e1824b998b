//! Presentation-only derivations from message fields.
//!
//! Nothing here is stored back into the session: time labels, avatars,
//! styles and latency are recomputed from `timestamp`, `sender` and `kind`
//! on every render.

use chrono::{DateTime, Local, TimeZone};
use ratatui::style::{Color, Modifier, Style};
use std::time::Duration;

use crate::config::UiConfig;
use crate::events::{Message, MessageKind, Sender};

/// Rendering switches taken from `[ui]`
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub time_format: String,
    pub show_avatars: bool,
    pub show_latency: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from(&UiConfig::default())
    }
}

impl From<&UiConfig> for FormatOptions {
    fn from(ui: &UiConfig) -> Self {
        Self {
            time_format: ui.time_format.clone(),
            show_avatars: ui.show_avatars,
            show_latency: ui.show_latency,
        }
    }
}

/// Local-time label for a message
pub fn time_label(message: &Message, format: &str) -> String {
    time_label_in(&Local, message, format)
}

/// Time label in an explicit zone
pub fn time_label_in<Tz: TimeZone>(zone: &Tz, message: &Message, format: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local: DateTime<Tz> = message.timestamp.with_timezone(zone);
    local.format(format).to_string()
}

pub fn avatar(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "👤",
        Sender::Assistant => "🤖",
        Sender::System => "⚠️",
    }
}

pub fn display_name(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Assistant => "Assistant",
        Sender::System => "System",
    }
}

/// Content style by sender, with suggestion and code kinds standing out
pub fn content_style(message: &Message) -> Style {
    if message.sender == Sender::System {
        return Style::default().fg(Color::Red);
    }

    match message.kind {
        MessageKind::Suggestion => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
        MessageKind::Code => Style::default().fg(Color::Yellow),
        MessageKind::Plain => match message.sender {
            Sender::User => Style::default().fg(Color::Blue),
            _ => Style::default().fg(Color::Green),
        },
    }
}

/// Gap between an assistant message and the user message it answers.
///
/// Only an assistant message directly following a user message has one;
/// anything else in between means the pairing is ambiguous.
pub fn reply_latency(transcript: &[Message], index: usize) -> Option<Duration> {
    let reply = transcript.get(index)?;
    if reply.sender != Sender::Assistant || index == 0 {
        return None;
    }

    let prompt = &transcript[index - 1];
    if prompt.sender != Sender::User {
        return None;
    }

    (reply.timestamp - prompt.timestamp).to_std().ok()
}

pub fn latency_label(latency: Duration) -> String {
    if latency < Duration::from_secs(1) {
        format!("{}ms", latency.as_millis())
    } else {
        format!("{:.1}s", latency.as_secs_f64())
    }
}

/// Header line text: avatar, name, time and optional latency
pub fn header_text(transcript: &[Message], index: usize, options: &FormatOptions) -> String {
    let message = &transcript[index];
    let mut header = String::new();
    if options.show_avatars {
        header.push_str(avatar(message.sender));
        header.push(' ');
    }
    header.push_str(display_name(message.sender));
    header.push_str(" · ");
    header.push_str(&time_label(message, &options.time_format));

    if options.show_latency {
        if let Some(latency) = reply_latency(transcript, index) {
            header.push_str(" · ");
            header.push_str(&latency_label(latency));
        }
    }

    if message.kind == MessageKind::Suggestion {
        header.push_str(" · suggestion");
    }

    header
}

/// Plain-text rendering used by the headless CLI
pub fn plain_lines(transcript: &[Message], index: usize, options: &FormatOptions) -> Vec<String> {
    let mut lines = vec![header_text(transcript, index, options)];
    lines.extend(
        transcript[index]
            .content
            .lines()
            .map(|line| format!("  {line}")),
    );
    lines
}

/// Wrap prose to fit within the given width, keeping explicit newlines.
///
/// Each paragraph keeps its leading indentation on every wrapped line, and
/// words longer than the remaining width are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return text.lines().map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let body = paragraph.trim_start();
        let mut indent = &paragraph[..paragraph.len() - body.len()];
        if indent.chars().count() >= width {
            indent = "";
        }
        let available = width - indent.chars().count();

        let mut current_line = String::new();
        for word in body.split_whitespace() {
            for piece in chunk_chars(word, available) {
                let needed = current_line.chars().count() + piece.chars().count() + 1;
                if current_line.is_empty() {
                    current_line = piece;
                } else if needed <= available {
                    current_line.push(' ');
                    current_line.push_str(&piece);
                } else {
                    lines.push(format!("{indent}{}", std::mem::take(&mut current_line)));
                    current_line = piece;
                }
            }
        }
        lines.push(format!("{indent}{current_line}"));
    }

    lines
}

/// Hard-wrap code: whitespace is kept as typed and overlong lines are cut
/// into width-sized pieces
pub fn wrap_code(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return text.lines().map(str::to_string).collect();
    }

    text.split('\n')
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                chunk_chars(line, width)
            }
        })
        .collect()
}

/// Wrap a message body the way its kind calls for
pub fn wrap_content(message: &Message, width: usize) -> Vec<String> {
    match message.kind {
        MessageKind::Code => wrap_code(&message.content, width),
        MessageKind::Plain | MessageKind::Suggestion => wrap_text(&message.content, width),
    }
}

fn chunk_chars(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
