//! Linux launch-at-login using an XDG autostart entry

use anyhow::Result;
use auto_launch::{AutoLaunch, AutoLaunchBuilder};
use log::info;

use crate::config::{APP_DIR_NAME, HIDDEN_FLAG};

fn get_auto_launch() -> Result<AutoLaunch> {
    let exe_path = std::env::current_exe()?;
    let app_path = exe_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid executable path"))?;

    AutoLaunchBuilder::new()
        .set_app_name(APP_DIR_NAME)
        .set_app_path(app_path)
        .set_args(&[HIDDEN_FLAG])
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create auto-launch config: {}", e))
}

/// Writes the autostart desktop entry
pub fn enable_launch_at_login() -> Result<()> {
    let auto = get_auto_launch()?;
    auto.enable()
        .map_err(|e| anyhow::anyhow!("Failed to enable autostart entry: {}", e))?;
    info!("Enabled launch-at-login via XDG autostart");
    Ok(())
}

pub fn is_launch_at_login_enabled() -> Result<bool> {
    let auto = get_auto_launch()?;
    auto.is_enabled()
        .map_err(|e| anyhow::anyhow!("Failed to check autostart entry: {}", e))
}
