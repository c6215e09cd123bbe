//! Windows launch-at-login using Registry

use anyhow::Result;
use winreg::RegKey;
use winreg::enums::*;

use crate::config::{APP_TITLE, HIDDEN_FLAG};

const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

fn launch_command() -> Result<String> {
    let exe_path = std::env::current_exe()?;
    Ok(format!("\"{}\" {}", exe_path.to_string_lossy(), HIDDEN_FLAG))
}

/// Enables launch-at-login by adding to registry Run key
pub fn enable_launch_at_login() -> Result<()> {
    let command = launch_command()?;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey(RUN_KEY)?;
    key.set_value(APP_TITLE, &command)?;

    log::info!("Enabled launch-at-login via registry: {}", command);
    Ok(())
}

/// Checks if launch-at-login is currently enabled
pub fn is_launch_at_login_enabled() -> Result<bool> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);

    let key = match hkcu.open_subkey(RUN_KEY) {
        Ok(k) => k,
        Err(_) => return Ok(false),
    };

    match key.get_value::<String, _>(APP_TITLE) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}
