//! Terminal presentation layer

pub mod conversation;

use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::Config;
use conversation::ChatPanel;

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to restore cursor")?;
    Ok(())
}

/// Open the chat panel and run it until the user closes it
pub async fn run(config: &Config) -> Result<()> {
    let mut terminal = enter_terminal()?;
    let mut panel = ChatPanel::new(config);

    let result = panel.run(&mut terminal, config).await;

    // Restore the terminal even when the loop failed
    leave_terminal(&mut terminal)?;
    result
}
