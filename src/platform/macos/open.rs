use std::process::Command;
use std::thread;

use anyhow::{Context, Result};

pub fn open_external(url: &str) -> Result<()> {
    let mut child = Command::new("open")
        .arg(url)
        .spawn()
        .context("failed to spawn open")?;
    thread::spawn(move || child.wait());
    Ok(())
}
