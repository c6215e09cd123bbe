use std::process::Command;
use std::thread;

use anyhow::{Context, Result};

/// Hands a URL to the desktop's default handler.
pub fn open_external(url: &str) -> Result<()> {
    let mut child = Command::new("xdg-open")
        .arg(url)
        .spawn()
        .context("failed to spawn xdg-open")?;
    thread::spawn(move || child.wait());
    Ok(())
}
