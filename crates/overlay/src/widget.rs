//! Declarative widget state

use shared_protocol::{Point, Rect, Size};

/// The widgets the overlay can show. At most one of each exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WidgetKind {
    /// Floating capture button
    PrimaryControl,
    /// Drop target that ends the session
    DismissZone,
    /// "Saved" panel with share/edit/dismiss
    ResultPanel,
    /// Centered numeral shown in timer mode
    Countdown,
}

/// ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub const CONTROL_BLUE: Color = Color(0xFF33_66CC);
    pub const ZONE_IDLE: Color = Color(0x40FF_0000);
    pub const ZONE_ARMED: Color = Color(0xCCFF_0000);
    pub const PANEL: Color = Color(0xE8FF_FFFF);
    pub const COUNTDOWN: Color = Color(0xCC00_0000);

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// Animation hint for the renderer when a widget changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Old content scales down and fades, new content scales in
    ScaleFade,
    /// Slides in from above
    SlideIn,
}

/// How a widget leaves the window layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachMode {
    /// Removed in the same frame, no animation
    Immediate,
    /// Renderer may animate it out
    Animated,
}

/// Everything a renderer needs to draw one widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub kind: WidgetKind,
    pub position: Point,
    pub size: Size,
    pub visible: bool,
    pub scale: f32,
    pub alpha: f32,
    pub color: Color,
    pub label: Option<String>,
    /// Receives touches; otherwise input passes through
    pub touchable: bool,
    pub transition: Transition,
}

impl WidgetState {
    pub fn new(kind: WidgetKind, rect: Rect, color: Color) -> Self {
        Self {
            kind,
            position: rect.origin,
            size: rect.size,
            visible: true,
            scale: 1.0,
            alpha: 1.0,
            color,
            label: None,
            touchable: false,
            transition: Transition::None,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn touchable(mut self) -> Self {
        self.touchable = true;
        self
    }
}
