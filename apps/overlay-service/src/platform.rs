//! Device capabilities the coordinator depends on
//!
//! Everything that needs a real device sits behind one of these traits so
//! the session and sequencer logic can run headless.

use capture::ScreenProjector;
use overlay::WindowLayer;
use shared_protocol::StorageLocation;
use std::sync::Arc;
use thiserror::Error;

use crate::storage::StorageWriter;

pub const INDICATOR_TITLE: &str = "Screenshot Ready";
pub const INDICATOR_TEXT: &str = "Tap floating button to capture • Drag to 🗑 to dismiss";
pub const INDICATOR_STOP_ACTION: &str = "Stop";

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("No activity available to handle {0}")]
    NoHandler(&'static str),

    #[error("Platform call failed: {0}")]
    Failed(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Presents the system screen-capture consent dialog. The outcome comes
/// back through `Bridge::handle_consent_result`.
pub trait ConsentProvider: Send + Sync {
    /// Is there a foreground activity able to present the dialog?
    fn has_activity(&self) -> bool;

    fn launch_consent(&self) -> PlatformResult<()>;
}

/// Draw-over-other-apps capability
pub trait OverlayHost: Send + Sync {
    fn can_draw_overlays(&self) -> bool;

    /// Open the system page where the user grants the permission
    fn open_overlay_settings(&self) -> PlatformResult<()>;

    /// Fresh window layer for one session
    fn create_layer(&self) -> Box<dyn WindowLayer>;
}

pub trait ShutterSound: Send + Sync {
    fn play(&self);
}

/// Ongoing notification required while a capture grant is held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundNotice {
    pub title: &'static str,
    pub text: &'static str,
    /// Label of the action that stops the session
    pub stop_action: &'static str,
}

impl Default for ForegroundNotice {
    fn default() -> Self {
        Self {
            title: INDICATOR_TITLE,
            text: INDICATOR_TEXT,
            stop_action: INDICATOR_STOP_ACTION,
        }
    }
}

pub trait ForegroundIndicator: Send + Sync {
    fn show(&self, notice: &ForegroundNotice);
    fn remove(&self);
}

/// Outbound intents for the result panel
pub trait IntentLauncher: Send + Sync {
    fn share(&self, location: &StorageLocation, mime_type: &str) -> PlatformResult<()>;
    fn edit(&self, location: &StorageLocation, mime_type: &str) -> PlatformResult<()>;
    fn view(&self, location: &StorageLocation, mime_type: &str) -> PlatformResult<()>;
    fn toast(&self, message: &str);
}

/// Every capability, bundled for injection
#[derive(Clone)]
pub struct Platform {
    pub projector: Arc<dyn ScreenProjector>,
    pub consent: Arc<dyn ConsentProvider>,
    pub overlay: Arc<dyn OverlayHost>,
    pub shutter: Arc<dyn ShutterSound>,
    pub indicator: Arc<dyn ForegroundIndicator>,
    pub launcher: Arc<dyn IntentLauncher>,
    pub storage: Arc<dyn StorageWriter>,
}
