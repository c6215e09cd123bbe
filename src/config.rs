use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

pub const APP_TITLE: &str = "WhatsApp";
pub const APP_DIR_NAME: &str = "chatwrap";
pub const CONTENT_URL: &str = "https://web.whatsapp.com/";
pub const HIDDEN_FLAG: &str = "--hidden";

const SETTINGS_FILE_NAME: &str = "settings.json";
const WEBVIEW_DIR_NAME: &str = "webview";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub devtools: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SystemConfig {
    #[serde(default = "default_launch_at_login")]
    pub launch_at_login: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotificationsConfig {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_launch_at_login() -> bool {
    true
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_window_width() -> u32 {
    1100
}

fn default_window_height() -> u32 {
    800
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            launch_at_login: default_launch_at_login(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Options derived from the process command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub start_hidden: bool,
}

impl LaunchOptions {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start_hidden = args.into_iter().any(|arg| arg.as_ref() == HIDDEN_FLAG);
        Self { start_hidden }
    }
}

/// Per-user application data directory. Falls back to the working directory
/// when the platform reports none.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE_NAME)
}

pub fn webview_data_dir() -> PathBuf {
    data_dir().join(WEBVIEW_DIR_NAME)
}

/// Loads settings, writing defaults on first run. A broken file never blocks
/// startup: it is reported and defaults are used for this run.
pub fn load_or_default() -> Settings {
    let path = settings_path();
    match load_or_create_settings_at(&path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("Using default settings ({}): {:#}", path.display(), err);
            Settings::default()
        }
    }
}

pub fn load_or_create_settings_at(path: &Path) -> Result<Settings> {
    if path.exists() {
        let content = fs::read_to_string(path).context("failed to read settings file")?;
        serde_json::from_str::<Settings>(&content).context("failed to parse settings file")
    } else {
        let settings = Settings::default();
        save_settings_at(path, &settings)?;
        Ok(settings)
    }
}

pub fn save_settings_at(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create settings directory")?;
    }
    let content =
        serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    fs::write(path, content).context("failed to write settings file")?;
    Ok(())
}
