//! Shell half of the bridge: turns page messages into native effects.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use url::Url;

use super::message::NotificationEvent;
use crate::config::APP_TITLE;
use crate::model::TrayState;

const FALLBACK_BODY: &str = "You have a new message.";

/// Remembers the last applied count so repeated reports (a page reload
/// re-baselines its own tracker) do not re-trigger attention requests.
#[derive(Debug, Default)]
pub struct BadgeLatch {
    last: Option<u32>,
}

impl BadgeLatch {
    /// Returns true when `count` differs from the last accepted value.
    pub fn observe(&mut self, count: u32) -> bool {
        if self.last == Some(count) {
            return false;
        }
        self.last = Some(count);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BadgeEffects {
    pub count: u32,
    /// Numeric OS badge; `None` clears it.
    pub badge: Option<u32>,
    pub tray_state: TrayState,
    pub window_title: String,
    pub tooltip: String,
    pub request_attention: bool,
}

pub fn plan_badge(count: u32, window_focused: bool) -> BadgeEffects {
    let (tray_state, window_title, tooltip) = if count > 0 {
        (
            TrayState::Alert,
            format!("({count}) {APP_TITLE}"),
            format!("{APP_TITLE} - {count} unread"),
        )
    } else {
        (TrayState::Idle, APP_TITLE.to_string(), APP_TITLE.to_string())
    };
    BadgeEffects {
        count,
        badge: (count > 0).then_some(count),
        tray_state,
        window_title,
        tooltip,
        request_attention: count > 0 && !window_focused,
    }
}

/// Bounds the wait between asking the page to clean up and tearing the
/// window down.
#[derive(Debug, Default)]
pub struct ShutdownGate {
    deadline: Option<Instant>,
}

impl ShutdownGate {
    /// Opens the grace period. Returns false if one is already running.
    pub fn begin(&mut self, now: Instant, grace: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + grace);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub icon: PathBuf,
}

impl NotificationRequest {
    /// Fills empty fields with generic text and the bundled icon. Only
    /// `file://` icons inside `icon_root` are passed to native notifiers.
    pub fn from_event(event: &NotificationEvent, default_icon: &Path, icon_root: &Path) -> Self {
        let title = if event.title.trim().is_empty() {
            format!("{APP_TITLE} Notification")
        } else {
            event.title.clone()
        };
        let body = if event.body.trim().is_empty() {
            FALLBACK_BODY.to_string()
        } else {
            event.body.clone()
        };
        let icon = local_icon(&event.icon, icon_root).unwrap_or_else(|| default_icon.to_path_buf());
        Self { title, body, icon }
    }
}

fn local_icon(reference: &str, icon_root: &Path) -> Option<PathBuf> {
    if reference.is_empty() {
        return None;
    }
    let url = Url::parse(reference).ok()?;
    if url.scheme() != "file" {
        debug!("Using bundled icon instead of page-supplied reference");
        return None;
    }
    let path = url.to_file_path().ok()?.canonicalize().ok()?;
    let root = icon_root.canonicalize().ok()?;
    if !path.starts_with(&root) {
        debug!("Ignoring notification icon outside {}", root.display());
        return None;
    }
    path.is_file().then_some(path)
}
