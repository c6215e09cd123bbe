//! Notification and badge bridge across the page/shell privilege boundary.
//!
//! The page posts `notify` and `updateBadge` messages through the webview IPC
//! channel; nothing is acknowledged and nothing is retried. The one exception
//! is `cleanupDone`, which the quit sequence waits on for a bounded time.

pub mod message;
pub mod page;
pub mod shell;

pub use message::{BridgeMessage, NotificationEvent};
pub use shell::{BadgeEffects, BadgeLatch, NotificationRequest, ShutdownGate, plan_badge};
