//! Snapfloat overlay service
//!
//! Coordinates one screen-capture session: the grant and per-pass capture
//! resources, the floating control, the capture sequencer and the bridge to
//! the host application.

pub mod bridge;
pub mod config;
pub mod headless;
pub mod platform;
pub mod sequencer;
pub mod service;
pub mod session;
pub mod settings;
pub mod state;
pub mod storage;
pub mod timers;

pub use bridge::{Bridge, BridgeError, BridgeResult};
pub use config::ServiceConfig;
pub use service::{ServiceHandle, ServiceStatus};
pub use state::AppState;
