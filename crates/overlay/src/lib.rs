//! Overlay Control Surface - floating widgets for Snapfloat
//!
//! Widgets are plain declarative state. [`OverlaySurface`] owns that state,
//! runs the drag and countdown logic on it, and reconciles the result onto
//! a platform [`WindowLayer`].

mod countdown;
mod drag;
mod error;
mod layer;
mod layout;
mod panel;
mod recording;
mod surface;
mod widget;

pub use countdown::*;
pub use drag::*;
pub use error::*;
pub use layer::*;
pub use layout::*;
pub use panel::*;
pub use recording::*;
pub use surface::*;
pub use widget::*;
