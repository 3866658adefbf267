//! Notifications relayed to the host application

use serde::{Deserialize, Serialize};

/// One-way lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum BridgeEvent {
    #[serde(rename = "onCaptureStarted")]
    CaptureStarted,
    #[serde(rename = "onCaptureStopped")]
    CaptureStopped,
    #[serde(rename = "onCaptureError")]
    CaptureError { error: String },
}

impl BridgeEvent {
    pub fn error(message: impl Into<String>) -> Self {
        BridgeEvent::CaptureError {
            error: message.into(),
        }
    }

    /// Event name as seen by the host event emitter
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::CaptureStarted => "onCaptureStarted",
            BridgeEvent::CaptureStopped => "onCaptureStopped",
            BridgeEvent::CaptureError { .. } => "onCaptureError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_shape() {
        let event = BridgeEvent::error("User denied screen capture permission");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "onCaptureError");
        assert_eq!(
            json["payload"]["error"],
            "User denied screen capture permission"
        );
    }

    #[test]
    fn test_unit_events_have_no_payload() {
        let json = serde_json::to_value(BridgeEvent::CaptureStarted).unwrap();
        assert_eq!(json["event"], "onCaptureStarted");
        assert!(json.get("payload").is_none());
    }
}
