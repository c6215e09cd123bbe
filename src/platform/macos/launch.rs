//! macOS launch-at-login using SMAppService (macOS 13+) or LaunchAgent fallback

use anyhow::Result;
use log::{debug, warn};

/// Determines the macOS version to decide which launch-at-login implementation to use
fn get_macos_version() -> Result<(u32, u32)> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()?;

    let version_string = String::from_utf8(output.stdout)?;
    let parts: Vec<&str> = version_string.trim().split('.').collect();

    if parts.len() >= 2 {
        let major = parts[0].parse::<u32>()?;
        let minor = parts[1].parse::<u32>()?;
        Ok((major, minor))
    } else {
        Err(anyhow::anyhow!("Unable to parse macOS version"))
    }
}

fn should_use_smappservice() -> bool {
    match get_macos_version() {
        Ok((major, _minor)) => {
            debug!("Detected macOS version: {}.x", major);
            major >= 13
        }
        Err(e) => {
            warn!(
                "Failed to detect macOS version: {}, falling back to LaunchAgent",
                e
            );
            false
        }
    }
}

// ============================================================================
// SMAppService Implementation (macOS 13.0+)
// ============================================================================

mod smapp {
    use anyhow::Result;
    use log::{debug, info, warn};
    use smappservice_rs::{AppService, ServiceStatus, ServiceType};

    pub fn enable() -> Result<()> {
        debug!("Registering main app with SMAppService");
        let app_service = AppService::new(ServiceType::MainApp);
        app_service
            .register()
            .map_err(|e| anyhow::anyhow!("Failed to register with SMAppService: {}", e))?;

        if app_service.status() == ServiceStatus::RequiresApproval {
            // Registration sticks; the user still has to flip the switch
            warn!("Launch-at-login awaits approval in System Settings > Login Items");
        } else {
            info!("Registered with SMAppService");
        }
        Ok(())
    }

    pub fn is_enabled() -> Result<bool> {
        let status = AppService::new(ServiceType::MainApp).status();
        Ok(status == ServiceStatus::Enabled || status == ServiceStatus::RequiresApproval)
    }
}

// ============================================================================
// LaunchAgent Implementation (Fallback for macOS < 13.0)
// ============================================================================

mod launchagent {
    use anyhow::Result;
    use auto_launch::AutoLaunchBuilder;
    use log::info;

    use crate::config::{APP_TITLE, HIDDEN_FLAG};

    fn get_auto_launch() -> Result<auto_launch::AutoLaunch> {
        let exe_path = std::env::current_exe()?;
        let app_path = exe_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid executable path"))?;

        AutoLaunchBuilder::new()
            .set_app_name(APP_TITLE)
            .set_app_path(app_path)
            .set_args(&[HIDDEN_FLAG])
            .set_use_launch_agent(true)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create auto-launch config: {}", e))
    }

    pub fn enable() -> Result<()> {
        let auto = get_auto_launch()?;
        auto.enable()
            .map_err(|e| anyhow::anyhow!("Failed to enable LaunchAgent: {}", e))?;
        info!("Enabled launch-at-login via LaunchAgent");
        Ok(())
    }

    pub fn is_enabled() -> Result<bool> {
        let auto = get_auto_launch()?;
        auto.is_enabled()
            .map_err(|e| anyhow::anyhow!("Failed to check LaunchAgent status: {}", e))
    }
}

// ============================================================================
// Public API
// ============================================================================

pub fn enable_launch_at_login() -> Result<()> {
    if should_use_smappservice() {
        smapp::enable()
    } else {
        launchagent::enable()
    }
}

pub fn is_launch_at_login_enabled() -> Result<bool> {
    if should_use_smappservice() {
        smapp::is_enabled()
    } else {
        launchagent::is_enabled()
    }
}
