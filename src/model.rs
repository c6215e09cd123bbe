use crate::bridge::BridgeMessage;

#[derive(Clone, Debug)]
pub enum UserEvent {
    UserAgentResolved(String),
    ContentReady,
    Bridge(BridgeMessage),
    OpenInWindow(String),
    NotificationClicked,
    SecondInstance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Show,
    Hide,
    Quit,
}

/// Visual indicator shown by the tray icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrayState {
    Loading,
    Idle,
    Alert,
}
