//! Display geometry in physical pixels

use serde::{Deserialize, Serialize};

/// Baseline density that maps one density-independent unit to one pixel
pub const BASELINE_DENSITY_DPI: u32 = 160;

/// Physical display metrics, measured once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Density in dots per inch
    pub density_dpi: u32,
}

impl DisplayMetrics {
    pub fn new(width: u32, height: u32, density_dpi: u32) -> Self {
        Self {
            width,
            height,
            density_dpi,
        }
    }

    /// Convert density-independent units to pixels (truncating)
    pub fn dp(&self, dp: u32) -> i32 {
        (dp as f64 * self.density_dpi as f64 / BASELINE_DENSITY_DPI as f64) as i32
    }

    pub fn width_px(&self) -> i32 {
        self.width as i32
    }

    pub fn height_px(&self) -> i32 {
        self.height as i32
    }
}

/// Position in screen pixels (top-left origin)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Size in screen pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn square(side: i32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.origin.x + self.size.width / 2,
            y: self.origin.y + self.size.height / 2,
        }
    }

    pub fn right(&self) -> i32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.height
    }
}
