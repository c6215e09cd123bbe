use anyhow::{Context, Result};
use log::{debug, error};
use tray_icon::{TrayIcon, TrayIconBuilder};

use crate::config::APP_TITLE;
use crate::model::TrayState;
use crate::ui::icon::IconSet;
use crate::ui::menu::{MenuEntry, build_menu};

/// The single tray entry. Dropping the icon removes it from the OS tray.
pub struct TrayController {
    icon: Option<TrayIcon>,
    state: TrayState,
}

impl Default for TrayController {
    /// A controller with no icon; every operation is a no-op.
    fn default() -> Self {
        Self {
            icon: None,
            state: TrayState::Loading,
        }
    }
}

impl TrayController {
    /// Creates the tray icon in the loading state with the given menu.
    pub fn create(spec: &[MenuEntry]) -> Result<Self> {
        let menu = build_menu(spec).context("failed to build tray menu")?;
        let icon = IconSet::tray_icon(TrayState::Loading)
            .context("failed to create tray icon image")?;
        let tray = TrayIconBuilder::new()
            .with_icon(icon)
            .with_menu(Box::new(menu))
            .with_menu_on_left_click(false)
            .with_tooltip(APP_TITLE)
            .build()
            .context("failed to create tray icon")?;
        Ok(Self {
            icon: Some(tray),
            state: TrayState::Loading,
        })
    }

    pub fn state(&self) -> TrayState {
        self.state
    }

    pub fn set_state(&mut self, state: TrayState) {
        let Some(tray) = self.icon.as_ref() else {
            return;
        };
        if self.state == state {
            return;
        }
        match IconSet::tray_icon(state) {
            Ok(image) => match tray.set_icon(Some(image)) {
                Ok(()) => {
                    debug!("Tray state {:?}", state);
                    self.state = state;
                }
                Err(err) => error!("Failed to update tray icon: {}", err),
            },
            Err(err) => error!("Failed to load tray icon: {:#}", err),
        }
    }

    pub fn set_tooltip(&self, tooltip: &str) {
        if let Some(tray) = self.icon.as_ref()
            && let Err(err) = tray.set_tooltip(Some(tooltip))
        {
            error!("Failed to update tooltip: {}", err);
        }
    }

    /// Releases the icon. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.icon.take().is_some() {
            debug!("Tray icon removed");
        }
    }
}
