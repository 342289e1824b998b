//! Transcript display component

use crate::events::Message;
use crate::ui::conversation::format::{self, FormatOptions};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Read-only view over a transcript snapshot, anchored to the newest message
pub struct TranscriptView<'a> {
    messages: &'a [Message],
    options: &'a FormatOptions,
}

impl<'a> TranscriptView<'a> {
    pub fn new(messages: &'a [Message], options: &'a FormatOptions) -> Self {
        Self { messages, options }
    }

    /// Lay out every message into display lines
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for index in 0..self.messages.len() {
            all_lines.extend(self.render_message(index, width));
            // spacing between messages
            all_lines.push(Line::from(""));
        }
        all_lines
    }

    fn render_message(&self, index: usize, width: u16) -> Vec<Line<'static>> {
        let message = &self.messages[index];
        let mut lines = Vec::new();

        let header = format::header_text(self.messages, index, self.options);
        lines.push(Line::from(vec![Span::styled(
            header,
            Style::default().fg(Color::DarkGray),
        )]));

        let style = format::content_style(message);
        for content_line in format::wrap_content(message, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, style),
            ]));
        }

        lines
    }
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Assistant");

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let welcome_lines = [
                Line::from(vec![Span::styled("How can I help?", Style::default().fg(Color::Green))]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Enter to send, Alt+Enter for a new line, /help for commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let all_lines = self.lines(inner_area.width);

        // Show the bottom of the log
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
