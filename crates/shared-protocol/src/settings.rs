//! User-facing persisted settings

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

pub const MIN_TIMER_SECONDS: u32 = 2;
pub const MAX_TIMER_SECONDS: u32 = 20;

/// Preferred trigger for new captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    Timer,
    Onscreen,
}

impl Default for CaptureMethod {
    fn default() -> Self {
        Self::Timer
    }
}

/// Settings read at session start and on live toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Write into the shared gallery collection instead of app storage
    pub save_to_gallery: bool,
    /// Countdown length in seconds (2-20)
    pub timer_duration: u32,
    /// Play the shutter sound on every pass
    pub sound_enabled: bool,
    pub capture_method: CaptureMethod,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            save_to_gallery: true,
            timer_duration: 3,
            sound_enabled: true,
            capture_method: CaptureMethod::Timer,
        }
    }
}

impl AppSettings {
    /// Clamp out-of-range values into their valid ranges
    pub fn normalized(mut self) -> Self {
        self.timer_duration = self
            .timer_duration
            .clamp(MIN_TIMER_SECONDS, MAX_TIMER_SECONDS);
        self
    }

    /// Parse settings JSON, keeping defaults for missing keys
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let settings: AppSettings = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validate a countdown length requested by the host
pub fn validate_timer_seconds(seconds: u32) -> ProtocolResult<u32> {
    if (MIN_TIMER_SECONDS..=MAX_TIMER_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(ProtocolError::TimerOutOfRange(seconds))
    }
}
