//! Headless host platform
//!
//! Software stand-ins for every device capability. The demo binary runs on
//! them and the tests inspect them.

use capture::{HeadlessConfig, HeadlessProjector};
use overlay::{RecordingLayer, WindowLayer};
use parking_lot::Mutex;
use shared_protocol::StorageLocation;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::platform::{
    ConsentProvider, ForegroundIndicator, ForegroundNotice, IntentLauncher, OverlayHost, Platform,
    PlatformError, PlatformResult, ShutterSound,
};
use crate::storage::{MemoryStorage, StorageWriter};

/// Counts consent launches. The test or demo answers them.
#[derive(Debug)]
pub struct RecordingConsent {
    has_activity: AtomicBool,
    launches: AtomicUsize,
}

impl Default for RecordingConsent {
    fn default() -> Self {
        Self {
            has_activity: AtomicBool::new(true),
            launches: AtomicUsize::new(0),
        }
    }
}

impl RecordingConsent {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn set_has_activity(&self, has_activity: bool) {
        self.has_activity.store(has_activity, Ordering::SeqCst);
    }
}

impl ConsentProvider for RecordingConsent {
    fn has_activity(&self) -> bool {
        self.has_activity.load(Ordering::SeqCst)
    }

    fn launch_consent(&self) -> PlatformResult<()> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        debug!("Consent dialog requested");
        Ok(())
    }
}

/// Hands out clones of one [`RecordingLayer`]
#[derive(Debug, Default)]
pub struct HeadlessOverlayHost {
    layer: RecordingLayer,
    settings_opened: AtomicUsize,
}

impl HeadlessOverlayHost {
    pub fn layer(&self) -> RecordingLayer {
        self.layer.clone()
    }

    pub fn settings_opened(&self) -> usize {
        self.settings_opened.load(Ordering::SeqCst)
    }
}

impl OverlayHost for HeadlessOverlayHost {
    fn can_draw_overlays(&self) -> bool {
        self.layer.can_draw_overlays()
    }

    fn open_overlay_settings(&self) -> PlatformResult<()> {
        self.settings_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create_layer(&self) -> Box<dyn WindowLayer> {
        Box::new(self.layer.clone())
    }
}

#[derive(Debug, Default)]
pub struct CountingShutter {
    plays: AtomicUsize,
}

impl CountingShutter {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl ShutterSound for CountingShutter {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct RecordingIndicator {
    showing: Mutex<Option<ForegroundNotice>>,
}

impl RecordingIndicator {
    pub fn is_showing(&self) -> bool {
        self.showing.lock().is_some()
    }

    pub fn notice(&self) -> Option<ForegroundNotice> {
        self.showing.lock().clone()
    }
}

impl ForegroundIndicator for RecordingIndicator {
    fn show(&self, notice: &ForegroundNotice) {
        info!("{}: {}", notice.title, notice.text);
        *self.showing.lock() = Some(notice.clone());
    }

    fn remove(&self) {
        self.showing.lock().take();
    }
}

/// An intent handed to the launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Share(StorageLocation),
    Edit(StorageLocation),
    View(StorageLocation),
}

#[derive(Debug)]
pub struct RecordingLauncher {
    has_editor: AtomicBool,
    intents: Mutex<Vec<Intent>>,
    toasts: Mutex<Vec<String>>,
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self {
            has_editor: AtomicBool::new(true),
            intents: Mutex::new(Vec::new()),
            toasts: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingLauncher {
    pub fn set_has_editor(&self, has_editor: bool) {
        self.has_editor.store(has_editor, Ordering::SeqCst);
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.intents.lock().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().clone()
    }
}

impl IntentLauncher for RecordingLauncher {
    fn share(&self, location: &StorageLocation, _mime_type: &str) -> PlatformResult<()> {
        self.intents.lock().push(Intent::Share(location.clone()));
        Ok(())
    }

    fn edit(&self, location: &StorageLocation, _mime_type: &str) -> PlatformResult<()> {
        if !self.has_editor.load(Ordering::SeqCst) {
            return Err(PlatformError::NoHandler("edit"));
        }
        self.intents.lock().push(Intent::Edit(location.clone()));
        Ok(())
    }

    fn view(&self, location: &StorageLocation, _mime_type: &str) -> PlatformResult<()> {
        self.intents.lock().push(Intent::View(location.clone()));
        Ok(())
    }

    fn toast(&self, message: &str) {
        info!("Toast: {}", message);
        self.toasts.lock().push(message.to_string());
    }
}

/// Every headless double, kept around for inspection
#[derive(Clone)]
pub struct HeadlessPlatform {
    pub projector: HeadlessProjector,
    pub consent: Arc<RecordingConsent>,
    pub overlay: Arc<HeadlessOverlayHost>,
    pub shutter: Arc<CountingShutter>,
    pub indicator: Arc<RecordingIndicator>,
    pub launcher: Arc<RecordingLauncher>,
    pub storage: Arc<MemoryStorage>,
}

impl HeadlessPlatform {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            projector: HeadlessProjector::new(config),
            consent: Arc::default(),
            overlay: Arc::default(),
            shutter: Arc::default(),
            indicator: Arc::default(),
            launcher: Arc::default(),
            storage: Arc::default(),
        }
    }

    pub fn layer(&self) -> RecordingLayer {
        self.overlay.layer()
    }

    /// Capability bundle writing to the in-memory storage
    pub fn platform(&self) -> Platform {
        self.platform_with_storage(self.storage.clone())
    }

    pub fn platform_with_storage(&self, storage: Arc<dyn StorageWriter>) -> Platform {
        Platform {
            projector: Arc::new(self.projector.clone()),
            consent: self.consent.clone(),
            overlay: self.overlay.clone(),
            shutter: self.shutter.clone(),
            indicator: self.indicator.clone(),
            launcher: self.launcher.clone(),
            storage,
        }
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}
