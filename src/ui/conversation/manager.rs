use crate::config::Config;
use crate::error::SubmissionError;
use crate::events::SessionState;
use crate::host::SessionHost;
use crate::ui::conversation::format::FormatOptions;
use crate::ui::conversation::{
    get_help_text, ComposerResult, ConversationComposer, SlashCommand, TranscriptView, TypingIndicator,
};
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    Frame, Terminal,
};
use tracing::{debug, info};

/// Actions the panel asks its caller to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Exit,
}

/// Side panel: transcript, typing indicator, status line and composer
/// wired to a [`SessionHost`]
pub struct ChatPanel {
    host: SessionHost,
    composer: ConversationComposer,
    format: FormatOptions,
    status: Option<String>,
    frame: u64,
}

impl ChatPanel {
    pub fn new(config: &Config) -> Self {
        let mut host = SessionHost::from_config(config);
        host.open();

        Self {
            host,
            composer: ConversationComposer::new("Ask the assistant anything..."),
            format: FormatOptions::from(&config.ui),
            status: None,
            frame: 0,
        }
    }

    pub fn host(&self) -> &SessionHost {
        &self.host
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Forward a draft to the session; the composer is cleared only on success
    pub fn submit(&mut self, text: &str) {
        let Some(session) = self.host.session_mut() else {
            return;
        };

        match session.submit(text) {
            Ok(id) => {
                debug!(message = %id, "draft submitted");
                self.composer.clear();
                self.status = None;
            }
            Err(SubmissionError::EmptyInput) => {
                self.status = Some("Type a message first".to_string());
            }
            Err(err) => {
                self.status = Some(capitalize(&err.to_string()));
            }
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> PanelAction {
        if key.kind == KeyEventKind::Press
            && key.code == KeyCode::Char('c')
            && key.modifiers.contains(KeyModifiers::CONTROL)
        {
            return PanelAction::Exit;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(&text);
                PanelAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => PanelAction::None,
        }
    }

    /// Handle slash commands. None of them touch the transcript.
    fn handle_slash_command(&mut self, command: SlashCommand) -> PanelAction {
        match command {
            SlashCommand::New => {
                self.host.open();
                self.status = Some("Started a new conversation".to_string());
                PanelAction::None
            }
            SlashCommand::Help => {
                self.status = Some(get_help_text());
                PanelAction::None
            }
            SlashCommand::Bye => PanelAction::Exit,
        }
    }

    /// Advance animation and route any replies that already arrived
    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        self.host.pump();
    }

    pub fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Transcript
                Constraint::Length(1), // Typing indicator / status
                Constraint::Length(4), // Composer
            ])
            .split(frame.size());

        let Some(session) = self.host.session() else {
            return;
        };

        frame.render_widget(
            TranscriptView::new(session.current_transcript(), &self.format),
            chunks[0],
        );

        let indicator = TypingIndicator::new(session.current_state(), session.outstanding_replies(), self.frame);
        if indicator.is_visible() {
            frame.render_widget(indicator, chunks[1]);
        } else if let Some(status) = &self.status {
            frame.render_widget(status_line(status), chunks[1]);
        }

        frame.render_widget(&self.composer, chunks[2]);
    }

    /// Run until the user exits
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>, config: &Config) -> Result<()> {
        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(config.tick_rate());
        info!("chat panel running");

        loop {
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if self.handle_key(key) == PanelAction::Exit {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                        None => break,
                    }
                }
                envelope = self.host.recv_reply() => {
                    if let Some(envelope) = envelope {
                        self.host.route(envelope);
                    }
                }
                _ = tick.tick() => self.tick(),
            }
        }

        self.host.close();
        info!("chat panel closed");
        Ok(())
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.host.session().map(|s| s.current_state())
    }
}

struct StatusLine<'a>(&'a str);

fn status_line(text: &str) -> StatusLine<'_> {
    StatusLine(text)
}

impl ratatui::widgets::Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let line = Line::from(vec![
            Span::styled("ℹ️ ", Style::default().fg(Color::Blue)),
            Span::styled(self.0, Style::default().fg(Color::Gray)),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
