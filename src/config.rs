use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::events::{MessageKind, OverlapPolicy};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,

    /// Stubbed assistant behaviour
    pub assistant: AssistantConfig,

    /// Turn-taking rules
    pub session: SessionConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Sidechat home directory
    #[serde(skip)]
    pub home: PathBuf,

    /// Config file this was loaded from, if not the default one in `home`
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

/// Assistant responder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub canned_reply: String,
    pub reply_kind: MessageKind,
    pub reply_delay_ms: u64,
    pub reply_timeout_ms: u64,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub overlap_policy: OverlapPolicy,
    /// Append a system notice when a reply times out or fails
    pub announce_failures: bool,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// chrono format string for message time labels
    pub time_format: String,
    pub show_avatars: bool,
    pub show_latency: bool,
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            assistant: AssistantConfig::default(),
            session: SessionConfig::default(),
            ui: UiConfig::default(),
            home: default_home(),
            path: None,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            canned_reply: "Thanks for your message! I'm a demo assistant, so this is a canned reply.".to_string(),
            reply_kind: MessageKind::Plain,
            reply_delay_ms: 1500,
            reply_timeout_ms: 30_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::Reject,
            announce_failures: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            time_format: "%H:%M".to_string(),
            show_avatars: true,
            show_latency: true,
            tick_rate_ms: 120,
        }
    }
}

fn default_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".sidechat")
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let sidechat_home = home.join(".sidechat");
        let mut config = Self::load_from(&sidechat_home.join("config.toml"))?;
        config.home = sidechat_home;
        Ok(config)
    }

    /// Load configuration from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        // A bare file name has an empty parent; keep the default home then
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.home = parent.to_path_buf();
        }
        config.path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Path of the config file: the one loaded from, or `config.toml` in home
    pub fn config_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| self.home.join("config.toml"))
    }

    /// Path of the log file used while the TUI owns the terminal
    pub fn log_path(&self) -> PathBuf {
        self.home.join("sidechat.log")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = self.config_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let content = self.to_toml()?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.assistant.reply_delay_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.assistant.reply_timeout_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms.max(16))
    }
}
