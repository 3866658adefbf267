//! Screen Capture - grant, surface and mirror primitives for Snapfloat
//!
//! The platform side (consent token redemption, display mirroring) sits
//! behind [`ScreenProjector`]. Everything else here is plain Rust:
//! - [`CaptureSurface`]: double-buffered frame sink, most recent frame wins
//! - [`RawFrame`]: stride-padded pixel buffer and its crop to a bitmap

mod error;
mod frame;
mod grant;
mod headless;
mod surface;
mod traits;

pub use error::*;
pub use frame::*;
pub use grant::*;
pub use headless::*;
pub use surface::*;
pub use traits::*;
