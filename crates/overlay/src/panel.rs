//! Transient result panel

use shared_protocol::{CaptureRecord, PanelAction};

pub const PANEL_LABEL: &str = "✓ Saved";

/// Panel shown after a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPanel {
    record: CaptureRecord,
    /// Bumped every time a panel replaces another
    generation: u64,
}

impl ResultPanel {
    pub fn new(record: CaptureRecord, generation: u64) -> Self {
        Self { record, generation }
    }

    pub fn record(&self) -> &CaptureRecord {
        &self.record
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Actions in display order
    pub fn actions(&self) -> [PanelAction; 3] {
        [PanelAction::Share, PanelAction::Edit, PanelAction::Dismiss]
    }
}
