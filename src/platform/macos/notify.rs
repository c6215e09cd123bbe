//! macOS notifications using terminal-notifier

use std::path::Path;
use std::process::Command;
use std::thread;

use log::warn;

use crate::bridge::NotificationRequest;
use crate::utils::find_command;

const CONTENT_CLICKED: &str = "@CONTENTCLICKED";
const OPEN_ACTION: &str = "Open";

pub fn is_supported() -> bool {
    let cmd = find_command("terminal-notifier");
    Path::new(cmd).exists() || which::which(cmd).is_ok()
}

/// terminal-notifier blocks while actions are offered and prints what the
/// user did, which is how clicks reach the shell.
pub fn show<F>(request: &NotificationRequest, on_click: F)
where
    F: FnOnce() + Send + 'static,
{
    let cmd = find_command("terminal-notifier");
    let title = request.title.clone();
    let body = request.body.clone();
    let icon = request.icon.to_string_lossy().to_string();

    thread::spawn(move || {
        let output = Command::new(cmd)
            .args([
                "-title",
                title.as_str(),
                "-message",
                body.as_str(),
                "-appIcon",
                icon.as_str(),
                "-sound",
                "default",
                "-actions", OPEN_ACTION,
            ])
            .output();
        match output {
            Ok(out) => {
                let reply = String::from_utf8_lossy(&out.stdout);
                let reply = reply.trim();
                if reply == CONTENT_CLICKED || reply == OPEN_ACTION {
                    on_click();
                }
            }
            Err(err) => warn!("Failed to run terminal-notifier: {}", err),
        }
    });
}
