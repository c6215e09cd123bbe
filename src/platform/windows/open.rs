use anyhow::{Context, Result};

use crate::utils::hidden_command;

pub fn open_external(url: &str) -> Result<()> {
    hidden_command("rundll32")
        .args(["url.dll,FileProtocolHandler", url])
        .spawn()
        .context("failed to hand link to the shell")?;
    Ok(())
}
