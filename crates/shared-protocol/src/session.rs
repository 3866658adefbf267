//! Session lifecycle types

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

/// Capture session state
///
/// `Idle -> Active -> Capturing -> Active -> ... -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No grant has been redeemed yet
    Idle,
    /// Grant held, waiting for a tap or a timer
    Active,
    /// A capture pass is in flight
    Capturing,
    /// All resources released; terminal
    Stopped,
}

impl SessionState {
    /// True while the session holds a grant
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Capturing)
    }

    /// Validate a transition, returning the new state
    pub fn transition(self, to: SessionState) -> ProtocolResult<SessionState> {
        let allowed = matches!(
            (self, to),
            (SessionState::Idle, SessionState::Active)
                | (SessionState::Active, SessionState::Capturing)
                | (SessionState::Capturing, SessionState::Active)
                | (SessionState::Idle, SessionState::Stopped)
                | (SessionState::Active, SessionState::Stopped)
                | (SessionState::Capturing, SessionState::Stopped)
        );

        if allowed {
            Ok(to)
        } else {
            Err(ProtocolError::InvalidStateTransition { from: self, to })
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// How the session was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Floating button stays on screen until dismissed
    OnScreen,
    /// One countdown, one pass, then self-teardown
    Timer { seconds: u32 },
}

impl SessionMode {
    pub fn is_timer(&self) -> bool {
        matches!(self, SessionMode::Timer { .. })
    }
}

/// What triggered a capture pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOrigin {
    /// Tap on the primary control
    Control,
    /// Countdown expiry
    Timer,
}
