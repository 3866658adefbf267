//! Platform window layer abstraction

use crate::{DetachMode, OverlayResult, WidgetKind, WidgetState};

/// System-level floating window layer.
///
/// Called only from the UI-affinity context.
pub trait WindowLayer: Send {
    /// Can the app draw over other apps?
    fn can_draw_overlays(&self) -> bool;

    /// Add a widget to the layer
    fn attach(&mut self, widget: &WidgetState) -> OverlayResult<()>;

    /// Apply new state to an attached widget
    fn update(&mut self, widget: &WidgetState) -> OverlayResult<()>;

    /// Remove a widget from the layer
    fn detach(&mut self, kind: WidgetKind, mode: DetachMode) -> OverlayResult<()>;
}
