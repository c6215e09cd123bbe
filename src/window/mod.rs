//! Lifecycle of the single content window.

pub mod content;
pub mod links;

pub use content::ContentWindow;

use log::{debug, info};

use crate::bridge::BadgeEffects;

/// Operations the controller needs from a live window.
pub trait WindowSurface {
    fn is_visible(&self) -> bool;
    fn is_minimized(&self) -> bool;
    fn is_focused(&self) -> bool;
    fn set_visible(&self, visible: bool);
    fn set_minimized(&self, minimized: bool);
    fn set_focus(&self);
    fn request_attention(&self);
    fn set_title(&self, title: &str);
    /// Sets the numeric dock/taskbar badge; `None` clears it.
    fn set_badge(&self, count: Option<u32>);
}

/// Owns the optional window handle. Absence is always a valid state: every
/// operation on a missing window is a logged no-op.
pub struct WindowController<W> {
    window: Option<W>,
}

impl<W> Default for WindowController<W> {
    fn default() -> Self {
        Self { window: None }
    }
}

impl<W: WindowSurface> WindowController<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, window: W) {
        self.window = Some(window);
    }

    pub fn exists(&self) -> bool {
        self.window.is_some()
    }

    pub fn get(&self) -> Option<&W> {
        self.window.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.window.as_mut()
    }

    pub fn is_focused(&self) -> bool {
        self.window.as_ref().is_some_and(W::is_focused)
    }

    /// Restores, shows and focuses the window. Returns false when absent.
    pub fn show(&self) -> bool {
        let Some(window) = self.window.as_ref() else {
            debug!("show requested without a window");
            return false;
        };
        if window.is_minimized() {
            window.set_minimized(false);
        }
        window.set_visible(true);
        window.set_focus();
        true
    }

    /// Mirrors the unread count onto the window: title, OS badge and, when
    /// planned, one attention request.
    pub fn apply_badge(&self, effects: &BadgeEffects) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        window.set_title(&effects.window_title);
        window.set_badge(effects.badge);
        if effects.request_attention {
            window.request_attention();
        }
    }

    pub fn toggle_visibility(&self) {
        match self.window.as_ref() {
            Some(window) if window.is_visible() => window.set_visible(false),
            Some(_) => {
                self.show();
            }
            None => debug!("toggle requested without a window"),
        }
    }

    pub fn hide(&self) {
        if let Some(window) = self.window.as_ref() {
            window.set_visible(false);
            info!("Window hidden");
        }
    }

    /// User-initiated close: the window is hidden and kept alive.
    pub fn close_requested(&self) {
        self.hide();
    }

    /// The OS finished destroying the window; drop the stale handle.
    pub fn destroyed(&mut self) {
        if self.window.take().is_some() {
            info!("Window destroyed");
        }
    }

    /// Destroys the window unconditionally, bypassing hide-on-close.
    pub fn destroy(&mut self) -> Option<W> {
        self.window.take()
    }
}
