use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tao::dpi::LogicalSize;
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{UserAttentionType, Window, WindowBuilder, WindowId};
use wry::{PageLoadEvent, WebContext, WebView, WebViewBuilder};

use crate::bridge::message::BridgeMessage;
use crate::bridge::page;
use crate::config::{APP_TITLE, CONTENT_URL, Settings, webview_data_dir};
use crate::model::UserEvent;
use crate::ui::icon::IconSet;
use crate::window::WindowSurface;
use crate::window::links::{self, LinkDecision};

/// Native window plus the webview hosting the remote client. The webview is
/// attached once the identity string is known.
pub struct ContentWindow {
    webview: Option<WebView>,
    web_context: Option<WebContext>,
    links_armed: Arc<AtomicBool>,
    window: Window,
}

impl ContentWindow {
    pub fn create(
        target: &EventLoopWindowTarget<UserEvent>,
        settings: &Settings,
        visible: bool,
    ) -> Result<Self> {
        let icon = match IconSet::window_icon() {
            Ok(icon) => Some(icon),
            Err(err) => {
                warn!("Failed to load window icon: {:#}", err);
                None
            }
        };
        let window = WindowBuilder::new()
            .with_title(APP_TITLE)
            .with_inner_size(LogicalSize::new(
                f64::from(settings.window.width),
                f64::from(settings.window.height),
            ))
            .with_visible(visible)
            .with_window_icon(icon)
            .build(target)
            .context("failed to create content window")?;

        Ok(Self {
            webview: None,
            web_context: None,
            links_armed: Arc::new(AtomicBool::new(false)),
            window,
        })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn has_content(&self) -> bool {
        self.webview.is_some()
    }

    /// Builds the sandboxed webview and starts loading the remote client.
    pub fn load(
        &mut self,
        user_agent: &str,
        proxy: EventLoopProxy<UserEvent>,
        devtools: bool,
    ) -> Result<()> {
        let mut web_context = WebContext::new(Some(webview_data_dir()));

        let ipc_proxy = proxy.clone();
        let ready_proxy = proxy.clone();
        let nav_armed = self.links_armed.clone();
        let popup_armed = self.links_armed.clone();
        let popup_proxy = proxy;

        let builder = WebViewBuilder::with_web_context(&mut web_context)
            .with_url(CONTENT_URL)
            .with_user_agent(user_agent)
            .with_devtools(devtools)
            .with_initialization_script(&page::init_script())
            .with_ipc_handler(move |request: wry::http::Request<String>| {
                match BridgeMessage::decode(request.body()) {
                    Ok(message) => {
                        let _ = ipc_proxy.send_event(UserEvent::Bridge(message));
                    }
                    Err(err) => debug!("Ignoring bridge message: {}", err),
                }
            })
            .with_on_page_load_handler(move |event, url| {
                if let PageLoadEvent::Finished = event {
                    debug!("Content finished loading: {}", url);
                    let _ = ready_proxy.send_event(UserEvent::ContentReady);
                }
            })
            .with_navigation_handler(move |url: String| {
                if !nav_armed.load(Ordering::Relaxed) {
                    return true;
                }
                match links::decide(&url) {
                    LinkDecision::InWindow => true,
                    LinkDecision::External => {
                        open_externally(&url);
                        false
                    }
                }
            })
            .with_new_window_req_handler(move |url: String| {
                if !popup_armed.load(Ordering::Relaxed) {
                    return true;
                }
                match links::decide(&url) {
                    LinkDecision::InWindow => {
                        let _ = popup_proxy.send_event(UserEvent::OpenInWindow(url));
                    }
                    LinkDecision::External => open_externally(&url),
                }
                false
            });

        #[cfg(any(target_os = "windows", target_os = "macos"))]
        let webview = builder
            .build(&self.window)
            .context("failed to create webview")?;

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let webview = {
            use tao::platform::unix::WindowExtUnix;
            use wry::WebViewBuilderExtUnix;
            let vbox = self
                .window
                .default_vbox()
                .context("content window has no GTK container")?;
            builder.build_gtk(vbox).context("failed to create webview")?
        };

        info!("Loading {}", CONTENT_URL);
        self.webview = Some(webview);
        self.web_context = Some(web_context);
        Ok(())
    }

    /// Enables external-link redirection. Navigations before the first
    /// content-ready signal (login redirects) are never intercepted.
    pub fn arm_link_policy(&self) {
        if !self.links_armed.swap(true, Ordering::Relaxed) {
            debug!("External link policy armed");
        }
    }

    /// Runs a script in the page. Failures are logged and absorbed.
    pub fn run_script(&self, script: &str, purpose: &str) {
        let Some(webview) = self.webview.as_ref() else {
            debug!("Skipping {}: no content loaded", purpose);
            return;
        };
        if let Err(err) = webview.evaluate_script(script) {
            warn!("Script for {} failed: {}", purpose, err);
        }
    }

    pub fn navigate(&self, url: &str) {
        if let Some(webview) = self.webview.as_ref()
            && let Err(err) = webview.load_url(url)
        {
            warn!("Failed to open {} in window: {}", url, err);
        }
    }
}

fn open_externally(url: &str) {
    info!("Opening external link in default handler");
    if let Err(err) = crate::open::open_external(url) {
        warn!("Failed to open external link: {:#}", err);
    }
}

impl WindowSurface for ContentWindow {
    fn is_visible(&self) -> bool {
        self.window.is_visible()
    }

    fn is_minimized(&self) -> bool {
        self.window.is_minimized()
    }

    fn is_focused(&self) -> bool {
        self.window.is_focused()
    }

    fn set_visible(&self, visible: bool) {
        self.window.set_visible(visible);
    }

    fn set_minimized(&self, minimized: bool) {
        self.window.set_minimized(minimized);
    }

    fn set_focus(&self) {
        self.window.set_focus();
    }

    fn request_attention(&self) {
        self.window
            .request_user_attention(Some(UserAttentionType::Informational));
    }

    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    #[cfg(target_os = "linux")]
    fn set_badge(&self, count: Option<u32>) {
        use tao::platform::unix::WindowExtUnix;
        // Launcher badges are keyed by the desktop entry name
        let desktop_entry = format!("{}.desktop", crate::config::APP_DIR_NAME);
        self.window
            .set_badge_count(count.map(i64::from), Some(desktop_entry));
    }

    #[cfg(target_os = "macos")]
    fn set_badge(&self, count: Option<u32>) {
        use tao::platform::macos::WindowExtMacOS;
        self.window.set_badge_label(count.map(|n| n.to_string()));
    }

    // The taskbar has no numeric badge; an overlay icon marks unread state
    #[cfg(target_os = "windows")]
    fn set_badge(&self, count: Option<u32>) {
        use tao::platform::windows::WindowExtWindows;
        let overlay = match count {
            Some(_) => match IconSet::badge_overlay() {
                Ok(icon) => Some(icon),
                Err(err) => {
                    warn!("Failed to load badge overlay: {:#}", err);
                    None
                }
            },
            None => None,
        };
        self.window.set_overlay_icon(overlay.as_ref());
    }
}
