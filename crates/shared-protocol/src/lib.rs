//! Shared Protocol Definitions for Snapfloat
//!
//! This crate contains the plain data exchanged between the capture
//! pipeline, the overlay surface and the host application layer.

mod error;
mod events;
mod geometry;
mod input;
mod record;
mod session;
mod settings;

pub use error::*;
pub use events::*;
pub use geometry::*;
pub use input::*;
pub use record::*;
pub use session::*;
pub use settings::*;

/// MIME type of every image this application produces
pub const OUTPUT_MIME_TYPE: &str = "image/png";

/// Relative collection path used for gallery output
pub const GALLERY_RELATIVE_PATH: &str = "Pictures/Screenshots";
