use crate::events::SessionState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// "Assistant is typing" line shown while a reply is outstanding
#[derive(Debug, Clone, Copy)]
pub struct TypingIndicator {
    state: SessionState,
    outstanding: usize,
    frame: u64,
}

impl TypingIndicator {
    pub fn new(state: SessionState, outstanding: usize, frame: u64) -> Self {
        Self {
            state,
            outstanding,
            frame,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state == SessionState::AwaitingReply
    }

    fn dots(&self) -> &'static str {
        match self.frame % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }

    pub fn line(&self) -> Line<'static> {
        let label = if self.outstanding > 1 {
            format!("Assistant is typing ({} replies pending)", self.outstanding)
        } else {
            "Assistant is typing".to_string()
        };

        Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled(label, Style::default().fg(Color::Green)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ])
    }
}

impl Widget for TypingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_visible() || area.height == 0 {
            return;
        }
        buf.set_line(area.x, area.y, &self.line(), area.width);
    }
}
