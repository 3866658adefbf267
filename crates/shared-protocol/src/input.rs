//! Input delivered by the overlay window layer

use serde::{Deserialize, Serialize};

/// Touch phase on the primary control, in raw screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TouchEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// Gesture stolen by the system
    Cancel,
}

/// Button pressed on the result panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelAction {
    Share,
    Edit,
    Dismiss,
}
