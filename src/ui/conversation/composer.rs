use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, SlashCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter pressed on a draft; the draft is left in place until the
    /// session accepts it
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// Text input at the bottom of the panel
pub struct ConversationComposer {
    content: String,
    /// Cursor position in chars, not bytes
    cursor: usize,
    placeholder: String,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                } else if let Some(command) = parse_slash_command(&self.content) {
                    self.clear();
                    return ComposerResult::Command(command);
                } else if self.show_command_palette && self.apply_selected_command() {
                    return ComposerResult::None;
                } else {
                    return ComposerResult::Submitted(self.content.clone());
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(offset, _)| offset)
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor);
        self.content.insert(offset, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let offset = self.byte_offset(self.cursor);
        self.content.remove(offset);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let offset = self.byte_offset(self.cursor);
        self.content.remove(offset);
        true
    }

    /// Open, refresh or close the palette depending on the draft
    fn sync_command_palette(&mut self) {
        let is_command_word = self.content.starts_with('/') && !self.content.contains(char::is_whitespace);
        if is_command_word {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return false;
        };

        self.content = format!("/{}", entry.keyword);
        self.cursor = self.char_len();
        self.close_command_palette();
        true
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.close_command_palette();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .style(Style::default().fg(Color::Green));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.content.clone();
            content.insert(self.byte_offset(self.cursor), '▌');

            // Keep the cursor's end of a multi-line draft visible
            let lines: Vec<&str> = content.split('\n').collect();
            let start = lines.len().saturating_sub(inner_area.height as usize);
            for (i, line_text) in lines[start..].iter().enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(composer: &mut ConversationComposer, code: KeyCode) -> ComposerResult {
        composer.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            press(composer, KeyCode::Char(c));
        }
    }

    #[test]
    fn enter_submits_draft_without_clearing_it() {
        let mut composer = ConversationComposer::new("Ask anything");
        type_text(&mut composer, "hello");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Submitted("hello".into()));
        assert_eq!(composer.content(), "hello");
    }

    #[test]
    fn alt_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "héllo");
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Backspace);
        assert_eq!(composer.content(), "hllo");
        press(&mut composer, KeyCode::Home);
        press(&mut composer, KeyCode::Delete);
        assert_eq!(composer.content(), "llo");
    }

    #[test]
    fn slash_opens_palette_and_tab_completes() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "/he");
        assert!(composer.is_palette_open());

        press(&mut composer, KeyCode::Tab);
        assert_eq!(composer.content(), "/help");
        assert!(!composer.is_palette_open());

        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Command(SlashCommand::Help));
        assert!(composer.content().is_empty());
    }

    #[test]
    fn enter_on_partial_command_completes_it() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "/b");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::None);
        assert_eq!(composer.content(), "/bye");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Command(SlashCommand::Bye));
    }

    #[test]
    fn palette_closes_once_an_argument_starts() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "/new ");
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn command_word_followed_by_text_is_sent_as_a_message() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "/new topic please");
        assert_eq!(
            press(&mut composer, KeyCode::Enter),
            ComposerResult::Submitted("/new topic please".into())
        );
        assert_eq!(composer.content(), "/new topic please");
    }

    #[test]
    fn blank_draft_is_still_forwarded() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "   ");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::Submitted("   ".into()));
    }
}
