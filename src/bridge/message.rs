use serde::Deserialize;
use thiserror::Error;

/// Wire version spoken by the in-page script.
pub const PROTOCOL_VERSION: u32 = 1;

/// Payload of a notification raised by the page.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NotificationEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub icon: String,
}

/// Messages crossing from the page into the shell.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BridgeMessage {
    Notify(NotificationEvent),
    UpdateBadge { count: u32 },
    /// Page acknowledgement that quit-time storage cleanup has settled.
    CleanupDone,
}

#[derive(Deserialize)]
struct Envelope {
    v: u32,
    #[serde(flatten)]
    message: BridgeMessage,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported protocol version {0}")]
    Version(u32),
}

impl BridgeMessage {
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        if envelope.v != PROTOCOL_VERSION {
            return Err(DecodeError::Version(envelope.v));
        }
        Ok(envelope.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_notify() {
        let message = BridgeMessage::decode(
            r#"{"v":1,"kind":"notify","title":"Ana","body":"hi","icon":"blob:x"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            BridgeMessage::Notify(NotificationEvent {
                title: "Ana".into(),
                body: "hi".into(),
                icon: "blob:x".into(),
            })
        );
    }

    #[test]
    fn notify_fields_are_optional() {
        let message = BridgeMessage::decode(r#"{"v":1,"kind":"notify"}"#).unwrap();
        assert_eq!(message, BridgeMessage::Notify(NotificationEvent::default()));
    }

    #[test]
    fn decodes_badge_update() {
        let message = BridgeMessage::decode(r#"{"v":1,"kind":"updateBadge","count":7}"#).unwrap();
        assert_eq!(message, BridgeMessage::UpdateBadge { count: 7 });
    }

    #[test]
    fn decodes_cleanup_acknowledgement() {
        let message = BridgeMessage::decode(r#"{"v":1,"kind":"cleanupDone"}"#).unwrap();
        assert_eq!(message, BridgeMessage::CleanupDone);
    }

    #[test]
    fn rejects_unknown_shapes() {
        for raw in [
            r#"{"v":1,"kind":"openDevtools"}"#,
            r#"{"v":1,"kind":"updateBadge","count":-2}"#,
            r#"{"v":1,"kind":"updateBadge","count":"3"}"#,
            r#"{"v":1,"kind":"updateBadge"}"#,
            r#"{"kind":"updateBadge","count":1}"#,
            r#"["notify"]"#,
            "not json",
        ] {
            assert!(BridgeMessage::decode(raw).is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn rejects_other_versions() {
        assert!(matches!(
            BridgeMessage::decode(r#"{"v":2,"kind":"updateBadge","count":1}"#),
            Err(DecodeError::Version(2))
        ));
    }
}
