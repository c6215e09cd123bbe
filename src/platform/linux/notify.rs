//! Linux notifications through notify-send

use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{debug, warn};

use crate::bridge::NotificationRequest;
use crate::config::APP_TITLE;

const CLICK_ACTION: &str = "default";
/// Popups that still wait for a click after this long are abandoned.
const EXPIRE_MS: u32 = 60_000;
const MAX_WATCHERS: usize = 4;

static WATCHERS: WatcherSlots = WatcherSlots::new(MAX_WATCHERS);

/// Caps the number of notify-send processes kept alive waiting for a click.
struct WatcherSlots {
    active: AtomicUsize,
    limit: usize,
}

impl WatcherSlots {
    const fn new(limit: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            limit,
        }
    }

    fn try_acquire(&self) -> Option<WatcherSlot<'_>> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| WatcherSlot { slots: self })
    }
}

struct WatcherSlot<'a> {
    slots: &'a WatcherSlots,
}

impl Drop for WatcherSlot<'_> {
    fn drop(&mut self) {
        self.slots.active.fetch_sub(1, Ordering::AcqRel);
    }
}

pub fn is_supported() -> bool {
    which::which("notify-send").is_ok()
}

/// Shows a notification and calls `on_click` if the user activates it.
/// notify-send older than 0.7.9 has no `--wait`; those get a plain popup.
pub fn show<F>(request: &NotificationRequest, on_click: F)
where
    F: FnOnce() + Send + 'static,
{
    let title = request.title.clone();
    let body = request.body.clone();
    let icon = request.icon.to_string_lossy().to_string();

    let Some(slot) = WATCHERS.try_acquire() else {
        debug!("Too many pending notifications; showing without click tracking");
        show_plain(&title, &body, &icon);
        return;
    };

    thread::spawn(move || {
        let _slot = slot;
        let interactive = Command::new("notify-send")
            .arg(format!("--app-name={APP_TITLE}"))
            .arg(format!("--icon={icon}"))
            .arg(format!("--expire-time={EXPIRE_MS}"))
            .arg(format!("--action={CLICK_ACTION}=Open"))
            .arg("--wait")
            .arg("--")
            .args([&title, &body])
            .output();

        match interactive {
            Ok(out) if out.status.success() => {
                if String::from_utf8_lossy(&out.stdout).trim() == CLICK_ACTION {
                    on_click();
                }
            }
            Ok(out) => {
                debug!(
                    "notify-send without action support: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                show_plain(&title, &body, &icon);
            }
            Err(err) => warn!("Failed to run notify-send: {}", err),
        }
    });
}

fn show_plain(title: &str, body: &str, icon: &str) {
    let plain = Command::new("notify-send")
        .arg(format!("--app-name={APP_TITLE}"))
        .arg(format!("--icon={icon}"))
        .arg("--")
        .args([title, body])
        .spawn();
    match plain {
        // Reap off the caller's thread
        Ok(mut child) => {
            thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(err) => warn!("Failed to show notification: {}", err),
    }
}
