//! Messages exchanged between paired booths.
//!
//! Wire form is one JSON object per message, tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::settings::SettingKey;

/// The closed set of messages a booth sends to its peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerMessage {
    /// Ask the peer to run its next shot in lockstep.
    #[serde(rename = "SNAP_NEXT")]
    ShotTrigger,

    /// One setting changed on the sender.
    #[serde(rename = "SETTINGS")]
    SettingsUpdate { key: SettingKey, value: String },
}

impl PeerMessage {
    pub fn settings(key: SettingKey, value: impl Into<String>) -> Self {
        Self::SettingsUpdate {
            key,
            value: value.into(),
        }
    }

    /// Encode as a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_trigger_wire_format() {
        let json = PeerMessage::ShotTrigger.to_json().unwrap();
        assert_eq!(json, r#"{"type":"SNAP_NEXT"}"#);
    }

    #[test]
    fn settings_update_wire_format() {
        let msg = PeerMessage::settings(SettingKey::Filter, "sepia");
        let json = msg.to_json().unwrap();
        assert_eq!(json, r#"{"type":"SETTINGS","key":"filter","value":"sepia"}"#);
        assert_eq!(PeerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn unknown_message_types_are_rejected() {
        assert!(PeerMessage::from_json(r#"{"type":"DANCE"}"#).is_err());
        assert!(PeerMessage::from_json(r#"{"type":"SETTINGS","key":"volume","value":"11"}"#).is_err());
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let msg = PeerMessage::from_json(r#"{"type":"SNAP_NEXT","sent_at":123}"#).unwrap();
        assert_eq!(msg, PeerMessage::ShotTrigger);
    }
}
