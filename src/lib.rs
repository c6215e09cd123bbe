pub mod app;
pub use app::run;

pub mod bridge;
pub mod config;
pub mod instance;
pub mod model;
pub mod user_agent;
pub mod utils;
pub mod window;

// Platform abstraction layer
pub mod platform;

// UI modules (cross-platform)
pub mod ui {
    pub mod icon;
    pub mod menu;
    pub mod tray;
}

// Re-export platform-specific implementations through unified interface
pub mod notify {
    pub use crate::platform::current::notify::*;
}

pub mod launch {
    pub use crate::platform::current::launch::*;
}

pub mod open {
    pub use crate::platform::current::open::*;
}
