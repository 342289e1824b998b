use anyhow::{Context, Result};

use sidechat::config::Config;
use sidechat::error::SubmissionError;
use sidechat::events::Message;
use sidechat::host::SessionHost;
use sidechat::ui::conversation::format::{self, FormatOptions};

/// Submit each prompt in turn, wait for its reply, then print the transcript
pub async fn ask(config: &Config, prompts: &[String], json: bool) -> Result<()> {
    let transcript = run_turns(config, prompts).await?;
    print!("{}", render_transcript(&transcript, &FormatOptions::from(&config.ui), json)?);
    Ok(())
}

async fn run_turns(config: &Config, prompts: &[String]) -> Result<Vec<Message>> {
    let mut host = SessionHost::from_config(config);
    host.open();

    for prompt in prompts {
        let session = host.session_mut().context("No open session")?;
        match session.submit(prompt) {
            Ok(_) => host.settle().await,
            Err(SubmissionError::EmptyInput) => {
                eprintln!("Skipping empty message");
            }
            Err(err) => return Err(anyhow::Error::new(err).context("Failed to submit message")),
        }
    }

    let transcript = host
        .session()
        .context("No open session")?
        .transcript()
        .snapshot();
    host.close();
    Ok(transcript)
}

fn render_transcript(transcript: &[Message], options: &FormatOptions, json: bool) -> Result<String> {
    if json {
        let mut content = serde_json::to_string_pretty(transcript)
            .context("Failed to serialize transcript")?;
        content.push('\n');
        return Ok(content);
    }

    let mut out = String::new();
    for index in 0..transcript.len() {
        for line in format::plain_lines(transcript, index, options) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

/// Print the effective configuration, optionally writing it out first
pub fn show_config(config: &Config, init: bool) -> Result<()> {
    if init {
        config.save()?;
        eprintln!("Wrote {}", config.config_path().display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
