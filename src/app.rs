use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use tao::window::WindowId;
use tray_icon::menu::MenuEvent;
use tray_icon::{MouseButton, MouseButtonState, TrayIconEvent};

use crate::bridge::{
    BadgeLatch, BridgeMessage, NotificationEvent, NotificationRequest, ShutdownGate, page,
    plan_badge,
};
use crate::config::{self, LaunchOptions, Settings};
use crate::instance::{self, Startup};
use crate::model::{MenuAction, TrayState, UserEvent};
use crate::ui::icon::IconSet;
use crate::ui::menu::{MenuEntry, main_menu_spec, parse_menu_action};
use crate::ui::tray::TrayController;
use crate::user_agent::UserAgentProvider;
use crate::window::{ContentWindow, WindowController, WindowSurface};

const MENU_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on waiting for the page to finish quit-time cleanup.
const QUIT_GRACE: Duration = Duration::from_millis(1500);

pub fn run() -> Result<()> {
    let options = LaunchOptions::from_args(std::env::args());

    // Nothing is constructed before the lock is settled
    let lock = match instance::claim(instance::default_addr())
        .context("failed to acquire single-instance lock")?
    {
        Startup::Primary(lock) => lock,
        Startup::Secondary => {
            info!("Another instance is running; asked it to come forward, exiting.");
            return Ok(());
        }
    };

    let settings = config::load_or_default();
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let instance_proxy = proxy.clone();
    lock.serve(move || {
        let _ = instance_proxy.send_event(UserEvent::SecondInstance);
    })
    .context("failed to start instance listener")?;

    let menu_receiver = MenuEvent::receiver().clone();
    let tray_receiver = TrayIconEvent::receiver().clone();
    let mut shell = Shell::new(settings, options, proxy);

    event_loop.run(move |event, target, control_flow| {
        // The lock lives as long as the loop
        let _ = &lock;
        match event {
            Event::NewEvents(StartCause::Init) => {
                shell.start(target, control_flow);
                schedule_poll(control_flow);
            }
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                shell.tick(&menu_receiver, &tray_receiver, control_flow);
                schedule_poll(control_flow);
            }
            Event::WindowEvent {
                window_id, event, ..
            } => shell.window_event(window_id, event, control_flow),
            Event::Reopen { .. } => shell.activate(target, control_flow),
            Event::UserEvent(user_event) => shell.user_event(user_event, control_flow),
            _ => {}
        }
    })
}

fn schedule_poll(control_flow: &mut ControlFlow) {
    if *control_flow != ControlFlow::Exit {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + MENU_POLL_INTERVAL);
    }
}

/// Owns the window and tray handles and sequences their lifecycle.
struct Shell {
    settings: Settings,
    options: LaunchOptions,
    proxy: EventLoopProxy<UserEvent>,
    window: WindowController<ContentWindow>,
    tray: TrayController,
    menu: Vec<MenuEntry>,
    badge: BadgeLatch,
    notifications_supported: bool,
    notification_icon: Option<PathBuf>,
    shutdown: ShutdownGate,
}

impl Shell {
    fn new(settings: Settings, options: LaunchOptions, proxy: EventLoopProxy<UserEvent>) -> Self {
        Self {
            settings,
            options,
            proxy,
            window: WindowController::new(),
            tray: TrayController::default(),
            menu: main_menu_spec(),
            badge: BadgeLatch::default(),
            notifications_supported: crate::notify::is_supported(),
            notification_icon: None,
            shutdown: ShutdownGate::default(),
        }
    }

    fn start(&mut self, target: &EventLoopWindowTarget<UserEvent>, control_flow: &mut ControlFlow) {
        if let Err(err) = self.open_window(target, !self.options.start_hidden) {
            error!("{:#}", err);
            *control_flow = ControlFlow::Exit;
            return;
        }

        match TrayController::create(&self.menu) {
            Ok(tray) => self.tray = tray,
            Err(err) => error!("Continuing without tray icon: {:#}", err),
        }

        if self.settings.system.launch_at_login {
            spawn_launch_at_login_check();
        }
    }

    /// Creates the window now; its content follows once the identity string
    /// is resolved off the loop.
    fn open_window(&mut self, target: &EventLoopWindowTarget<UserEvent>, visible: bool) -> Result<()> {
        let window = ContentWindow::create(target, &self.settings, visible)?;
        self.window.attach(window);
        self.badge.reset();
        self.tray.set_state(TrayState::Loading);
        spawn_user_agent_resolution(self.proxy.clone());
        Ok(())
    }

    fn activate(&mut self, target: &EventLoopWindowTarget<UserEvent>, control_flow: &mut ControlFlow) {
        if self.shutdown.is_pending() {
            return;
        }
        if self.window.exists() {
            self.window.show();
        } else if let Err(err) = self.open_window(target, true) {
            error!("{:#}", err);
            self.quit(control_flow);
        }
    }

    fn tick(
        &mut self,
        menu_receiver: &Receiver<MenuEvent>,
        tray_receiver: &Receiver<TrayIconEvent>,
        control_flow: &mut ControlFlow,
    ) {
        if self.shutdown.is_pending() {
            if self.shutdown.expired(Instant::now()) {
                warn!("Page cleanup did not finish in time");
                self.finish_quit(control_flow);
            }
            return;
        }
        self.drain_tray_events(menu_receiver, tray_receiver, control_flow);
    }

    fn drain_tray_events(
        &mut self,
        menu_receiver: &Receiver<MenuEvent>,
        tray_receiver: &Receiver<TrayIconEvent>,
        control_flow: &mut ControlFlow,
    ) {
        while let Ok(event) = menu_receiver.try_recv() {
            match parse_menu_action(&self.menu, event.id()) {
                Some(MenuAction::Show) => {
                    self.window.show();
                }
                Some(MenuAction::Hide) => self.window.hide(),
                Some(MenuAction::Quit) => self.quit(control_flow),
                None => debug!("Unknown menu id {:?}", event.id()),
            }
        }
        while let Ok(event) = tray_receiver.try_recv() {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                self.window.toggle_visibility();
            }
        }
    }

    fn window_event(&mut self, window_id: WindowId, event: WindowEvent, control_flow: &mut ControlFlow) {
        if self.window.get().map(ContentWindow::id) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => self.window.close_requested(),
            WindowEvent::Destroyed => {
                self.window.destroyed();
                if self.shutdown.is_pending() {
                    self.finish_quit(control_flow);
                } else if !cfg!(target_os = "macos") {
                    // macOS apps stay alive in the dock without windows
                    self.quit(control_flow);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event: UserEvent, control_flow: &mut ControlFlow) {
        if self.shutdown.is_pending() {
            if let UserEvent::Bridge(BridgeMessage::CleanupDone) = event {
                debug!("Page cleanup finished");
                self.finish_quit(control_flow);
            }
            return;
        }
        match event {
            UserEvent::UserAgentResolved(user_agent) => self.load_content(&user_agent, control_flow),
            UserEvent::ContentReady => self.content_ready(),
            UserEvent::Bridge(BridgeMessage::UpdateBadge { count }) => self.update_badge(count),
            UserEvent::Bridge(BridgeMessage::Notify(notification)) => self.notify(notification),
            UserEvent::Bridge(BridgeMessage::CleanupDone) => {
                debug!("Ignoring cleanup acknowledgement outside quit");
            }
            UserEvent::OpenInWindow(url) => {
                if let Some(window) = self.window.get() {
                    window.navigate(&url);
                }
            }
            UserEvent::NotificationClicked => {
                if !self.window.show() {
                    info!("Notification clicked, but the window is gone.");
                }
            }
            UserEvent::SecondInstance => {
                self.window.show();
            }
        }
    }

    fn load_content(&mut self, user_agent: &str, control_flow: &mut ControlFlow) {
        let devtools = self.settings.devtools;
        let proxy = self.proxy.clone();
        let Some(window) = self.window.get_mut() else {
            debug!("Identity resolved after the window was closed");
            return;
        };
        if window.has_content() {
            return;
        }
        if let Err(err) = window.load(user_agent, proxy, devtools) {
            error!("{:#}", err);
            self.quit(control_flow);
        }
    }

    fn content_ready(&mut self) {
        let Some(window) = self.window.get() else {
            return;
        };
        if self.notifications_supported {
            info!("Native notifications are supported.");
        } else {
            info!("Native notifications are not supported on this system.");
        }
        window.arm_link_policy();
        window.run_script(&page::trigger_initial_badge_update(), "initial badge update");
    }

    fn update_badge(&mut self, count: u32) {
        if !self.badge.observe(count) {
            return;
        }
        let effects = plan_badge(count, self.window.is_focused());
        self.tray.set_state(effects.tray_state);
        self.tray.set_tooltip(&effects.tooltip);
        self.window.apply_badge(&effects);
    }

    fn notify(&mut self, notification: NotificationEvent) {
        if !self.settings.notifications.enabled {
            debug!("Notifications disabled in settings");
            return;
        }
        if !self.notifications_supported {
            debug!("Dropping notification: no native notifier");
            return;
        }
        let icon = self.notification_icon();
        let request = NotificationRequest::from_event(&notification, &icon, &config::data_dir());
        let proxy = self.proxy.clone();
        crate::notify::show(&request, move || {
            let _ = proxy.send_event(UserEvent::NotificationClicked);
        });
    }

    fn notification_icon(&mut self) -> PathBuf {
        if let Some(path) = self.notification_icon.as_ref() {
            return path.clone();
        }
        match IconSet::notification_icon_path() {
            Ok(path) => {
                self.notification_icon = Some(path.clone());
                path
            }
            Err(err) => {
                warn!("No notification icon: {:#}", err);
                PathBuf::new()
            }
        }
    }

    /// Asks the page to release its observers and service workers, then
    /// tears down once it acknowledges or the grace period runs out.
    fn quit(&mut self, control_flow: &mut ControlFlow) {
        if self.shutdown.is_pending() {
            return;
        }
        let Some(window) = self.window.get().filter(|window| window.has_content()) else {
            self.finish_quit(control_flow);
            return;
        };
        window.run_script(&page::cleanup(), "bridge cleanup");
        window.run_script(&page::clear_service_workers(), "service worker cleanup");
        window.set_visible(false);
        self.tray.destroy();
        self.shutdown.begin(Instant::now(), QUIT_GRACE);
        debug!("Waiting up to {:?} for page cleanup", QUIT_GRACE);
    }

    fn finish_quit(&mut self, control_flow: &mut ControlFlow) {
        self.tray.destroy();
        drop(self.window.destroy());
        info!("Quitting");
        *control_flow = ControlFlow::Exit;
    }
}

fn spawn_user_agent_resolution(proxy: EventLoopProxy<UserEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let provider = UserAgentProvider::with_http_feed(&config::data_dir());
        let user_agent = provider.resolve();
        let _ = proxy.send_event(UserEvent::UserAgentResolved(user_agent));
    })
}

fn spawn_launch_at_login_check() -> thread::JoinHandle<()> {
    use crate::launch::{enable_launch_at_login, is_launch_at_login_enabled};

    thread::spawn(|| match is_launch_at_login_enabled() {
        Ok(true) => debug!("Launch-at-login already enabled"),
        Ok(false) => match enable_launch_at_login() {
            Ok(()) => info!("Auto-launch enabled successfully."),
            Err(err) => warn!("Failed to enable auto-launch: {:#}", err),
        },
        Err(err) => warn!("Failed to check launch-at-login state: {:#}", err),
    })
}
