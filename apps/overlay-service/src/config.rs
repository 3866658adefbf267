//! Service tuning

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Delays and thresholds used by the coordinator. All durations in ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Wait after hiding the control before grabbing a frame
    pub hide_settle_ms: u64,
    /// Upper bound for bind → frame → persist
    pub watchdog_ms: u64,
    pub panel_auto_hide_ms: u64,
    /// Added to the panel window before a timer session tears down
    pub timer_teardown_buffer_ms: u64,
    pub countdown_tick_ms: u64,
    /// Wait between the countdown vanishing and the pass starting
    pub countdown_settle_ms: u64,
    pub drag_threshold_px: f32,
    pub surface_buffers: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hide_settle_ms: 250,
            watchdog_ms: 3000,
            panel_auto_hide_ms: 6000,
            timer_teardown_buffer_ms: 1000,
            countdown_tick_ms: 1000,
            countdown_settle_ms: 400,
            drag_threshold_px: overlay::DEFAULT_DRAG_THRESHOLD_PX,
            surface_buffers: 2,
        }
    }
}

impl ServiceConfig {
    /// Read a JSON file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn hide_settle(&self) -> Duration {
        Duration::from_millis(self.hide_settle_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn panel_auto_hide(&self) -> Duration {
        Duration::from_millis(self.panel_auto_hide_ms)
    }

    /// Delay from a timer-mode pass completing to the session stopping
    pub fn timer_teardown(&self) -> Duration {
        Duration::from_millis(self.panel_auto_hide_ms + self.timer_teardown_buffer_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn countdown_settle(&self) -> Duration {
        Duration::from_millis(self.countdown_settle_ms)
    }
}
