//! Overlay Control Surface
//!
//! Owns the desired widget state and reconciles it onto the window layer.
//! Every mutation ends in a reconcile, so the layer only sees real
//! changes: a widget whose state did not change is never re-sent.

use shared_protocol::{CaptureRecord, TouchEvent};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    Color, Countdown, CountdownStep, DetachMode, DragTracker, OverlayLayout, OverlayResult,
    PANEL_LABEL, Release, ResultPanel, Transition, WidgetKind, WidgetState, WindowLayer,
};

const OVER_ZONE_SCALE: f32 = 0.6;
const OVER_ZONE_ALPHA: f32 = 0.4;
const ZONE_ARMED_SCALE: f32 = 1.4;

/// What a touch on the primary control amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// No control, control hidden, or no gesture in progress
    Ignored,
    /// Gesture continues (or ended as a plain drag)
    Tracking,
    /// Released without dragging: run a capture
    Tap,
    /// Released over the dismiss zone: end the session
    Dismiss,
}

pub struct OverlaySurface {
    layout: OverlayLayout,
    layer: Box<dyn WindowLayer>,
    drag: DragTracker,
    desired: BTreeMap<WidgetKind, WidgetState>,
    rendered: BTreeMap<WidgetKind, WidgetState>,
    detach_modes: BTreeMap<WidgetKind, DetachMode>,
    countdown: Option<Countdown>,
    panel: Option<ResultPanel>,
    panel_generation: u64,
}

impl OverlaySurface {
    pub fn new(layout: OverlayLayout, drag_threshold: f32, layer: Box<dyn WindowLayer>) -> Self {
        Self {
            layout,
            layer,
            drag: DragTracker::new(drag_threshold),
            desired: BTreeMap::new(),
            rendered: BTreeMap::new(),
            detach_modes: BTreeMap::new(),
            countdown: None,
            panel: None,
            panel_generation: 0,
        }
    }

    pub fn can_draw_overlays(&self) -> bool {
        self.layer.can_draw_overlays()
    }

    /// Widgets currently on the window layer
    pub fn attached(&self) -> Vec<WidgetKind> {
        self.rendered.keys().copied().collect()
    }

    // ---- primary control ------------------------------------------------

    /// Attach the floating control. Fails when the layer refuses it.
    pub fn show_control(&mut self) -> OverlayResult<()> {
        if self.desired.contains_key(&WidgetKind::PrimaryControl) {
            return Ok(());
        }
        let control =
            WidgetState::new(WidgetKind::PrimaryControl, self.layout.control, Color::CONTROL_BLUE)
                .touchable();
        self.desired.insert(WidgetKind::PrimaryControl, control);
        self.reconcile()
    }

    pub fn has_control(&self) -> bool {
        self.rendered.contains_key(&WidgetKind::PrimaryControl)
    }

    /// `None` when no control exists
    pub fn control_visible(&self) -> Option<bool> {
        self.rendered
            .get(&WidgetKind::PrimaryControl)
            .map(|control| control.visible)
    }

    /// Hide or show the control without detaching it; drag state survives
    pub fn set_control_visible(&mut self, visible: bool) {
        if let Some(control) = self.desired.get_mut(&WidgetKind::PrimaryControl) {
            control.visible = visible;
            self.commit();
        }
    }

    pub fn on_touch(&mut self, event: TouchEvent) -> TouchOutcome {
        let Some(control) = self.desired.get(&WidgetKind::PrimaryControl) else {
            return TouchOutcome::Ignored;
        };
        if !control.visible {
            self.drag.cancel();
            return TouchOutcome::Ignored;
        }

        match event {
            TouchEvent::Down { x, y } => {
                self.drag.press(control.position, x, y);
                TouchOutcome::Tracking
            }
            TouchEvent::Move { x, y } => {
                let layout = self.layout;
                let Some(step) = self
                    .drag
                    .movement(x, y, |position| layout.control_over_dismiss(position))
                else {
                    return TouchOutcome::Ignored;
                };

                if step.drag_started {
                    debug!("Drag started, showing dismiss zone");
                    self.show_dismiss_zone();
                }
                if let Some(control) = self.desired.get_mut(&WidgetKind::PrimaryControl) {
                    control.position = step.position;
                }
                if let Some(entered) = step.zone_crossing {
                    self.set_zone_armed(entered);
                }
                self.commit();
                TouchOutcome::Tracking
            }
            TouchEvent::Up { .. } => {
                let Some(release) = self.drag.release() else {
                    return TouchOutcome::Ignored;
                };
                self.end_gesture();
                match release {
                    Release::Dismiss => TouchOutcome::Dismiss,
                    Release::Tap => TouchOutcome::Tap,
                    Release::Dropped => TouchOutcome::Tracking,
                }
            }
            TouchEvent::Cancel => {
                self.drag.cancel();
                self.end_gesture();
                TouchOutcome::Ignored
            }
        }
    }

    fn show_dismiss_zone(&mut self) {
        self.desired.entry(WidgetKind::DismissZone).or_insert_with(|| {
            WidgetState::new(
                WidgetKind::DismissZone,
                self.layout.dismiss_widget,
                Color::ZONE_IDLE,
            )
        });
    }

    fn set_zone_armed(&mut self, armed: bool) {
        if let Some(zone) = self.desired.get_mut(&WidgetKind::DismissZone) {
            zone.color = if armed {
                Color::ZONE_ARMED
            } else {
                Color::ZONE_IDLE
            };
            zone.scale = if armed { ZONE_ARMED_SCALE } else { 1.0 };
        }
        if let Some(control) = self.desired.get_mut(&WidgetKind::PrimaryControl) {
            control.scale = if armed { OVER_ZONE_SCALE } else { 1.0 };
            control.alpha = if armed { OVER_ZONE_ALPHA } else { 1.0 };
        }
    }

    /// Drop the zone and restore the control's normal look
    fn end_gesture(&mut self) {
        self.remove(WidgetKind::DismissZone, DetachMode::Immediate);
        if let Some(control) = self.desired.get_mut(&WidgetKind::PrimaryControl) {
            control.scale = 1.0;
            control.alpha = 1.0;
        }
        self.commit();
    }

    // ---- result panel ---------------------------------------------------

    /// Show the panel for `record`, replacing any panel already showing.
    /// Returns the panel generation used to match its auto-hide timer.
    pub fn show_panel(&mut self, record: CaptureRecord) -> u64 {
        if self.panel.is_some() {
            self.hide_panel(DetachMode::Immediate);
        }

        self.panel_generation += 1;
        let mut widget = WidgetState::new(WidgetKind::ResultPanel, self.layout.panel, Color::PANEL)
            .with_label(PANEL_LABEL)
            .touchable();
        widget.transition = Transition::SlideIn;

        self.desired.insert(WidgetKind::ResultPanel, widget);
        self.panel = Some(ResultPanel::new(record, self.panel_generation));
        self.commit();
        self.panel_generation
    }

    pub fn hide_panel(&mut self, mode: DetachMode) -> Option<ResultPanel> {
        let panel = self.panel.take()?;
        self.remove(WidgetKind::ResultPanel, mode);
        self.commit();
        Some(panel)
    }

    pub fn panel(&self) -> Option<&ResultPanel> {
        self.panel.as_ref()
    }

    // ---- countdown ------------------------------------------------------

    /// Show the first numeral. Returns false for a zero-length countdown.
    pub fn start_countdown(&mut self, seconds: u32) -> bool {
        let Some(countdown) = Countdown::new(seconds) else {
            return false;
        };

        let mut widget =
            WidgetState::new(WidgetKind::Countdown, self.layout.countdown, Color::COUNTDOWN)
                .with_label(countdown.remaining().to_string());
        widget.transition = Transition::ScaleFade;

        self.desired.insert(WidgetKind::Countdown, widget);
        self.countdown = Some(countdown);
        self.commit();
        true
    }

    /// Advance one second. On `Finished` the numeral is already gone.
    pub fn tick_countdown(&mut self) -> Option<CountdownStep> {
        let step = self.countdown.as_mut()?.tick();
        match step {
            CountdownStep::Show(n) => {
                if let Some(widget) = self.desired.get_mut(&WidgetKind::Countdown) {
                    widget.label = Some(n.to_string());
                }
            }
            CountdownStep::Finished => {
                self.countdown = None;
                self.remove(WidgetKind::Countdown, DetachMode::Immediate);
            }
        }
        self.commit();
        Some(step)
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    // ---- teardown -------------------------------------------------------

    /// Detach every widget in one pass
    pub fn detach_all(&mut self) {
        self.drag.cancel();
        self.countdown = None;
        self.panel = None;
        let kinds: Vec<WidgetKind> = self.desired.keys().copied().collect();
        for kind in kinds {
            self.remove(kind, DetachMode::Immediate);
        }
        self.commit();
    }

    // ---- reconciliation -------------------------------------------------

    fn remove(&mut self, kind: WidgetKind, mode: DetachMode) {
        if self.desired.remove(&kind).is_some() {
            self.detach_modes.insert(kind, mode);
        }
    }

    fn commit(&mut self) {
        if let Err(e) = self.reconcile() {
            warn!("Overlay reconcile failed: {}", e);
        }
    }

    /// Push the difference between desired and rendered state to the layer.
    /// Detaches go first. A widget the layer refuses is dropped from the
    /// desired state; the first such error is returned.
    fn reconcile(&mut self) -> OverlayResult<()> {
        let stale: Vec<WidgetKind> = self
            .rendered
            .keys()
            .filter(|kind| !self.desired.contains_key(kind))
            .copied()
            .collect();
        for kind in stale {
            let mode = self
                .detach_modes
                .remove(&kind)
                .unwrap_or(DetachMode::Immediate);
            if let Err(e) = self.layer.detach(kind, mode) {
                warn!("Failed to detach {:?}: {}", kind, e);
            }
            self.rendered.remove(&kind);
        }
        self.detach_modes.clear();

        let mut first_error = None;
        let mut refused = Vec::new();
        for (kind, widget) in &self.desired {
            match self.rendered.get(kind) {
                None => match self.layer.attach(widget) {
                    Ok(()) => {
                        self.rendered.insert(*kind, widget.clone());
                    }
                    Err(e) => {
                        warn!("Failed to attach {:?}: {}", kind, e);
                        refused.push(*kind);
                        first_error.get_or_insert(e);
                    }
                },
                Some(current) if current != widget => {
                    if let Err(e) = self.layer.update(widget) {
                        warn!("Failed to update {:?}: {}", kind, e);
                    }
                    self.rendered.insert(*kind, widget.clone());
                }
                Some(_) => {}
            }
        }
        for kind in refused {
            self.desired.remove(&kind);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
