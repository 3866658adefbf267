//! Bridge to the host application
//!
//! Host-facing operations plus the lifecycle event stream. Starting a
//! session is two-step: `start`/`start_timer` open the consent dialog and
//! remember the request, `handle_consent_result` redeems the answer.

use capture::CaptureGrant;
use shared_protocol::{BridgeEvent, SessionMode, validate_timer_seconds};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::platform::Platform;
use crate::service::{Service, ServiceHandle};
use crate::session::SessionRequest;
use crate::settings::SettingsStore;
use crate::state::{AppState, PendingStart};

pub const CONSENT_DENIED: &str = "User denied screen capture permission";

const EVENT_CAPACITY: usize = 32;

/// Error type for bridge calls
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Overlay permission not granted")]
    NoOverlayPermission,
    #[error("No activity available to request capture consent")]
    NoActivity,
    #[error("Capture session already running")]
    AlreadyRunning,
    #[error("Timer must be between 2 and 20 seconds, got {0}")]
    InvalidTimer(u32),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl serde::Serialize for BridgeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

pub struct Bridge {
    state: Arc<AppState>,
    platform: Platform,
    config: ServiceConfig,
    settings: Arc<SettingsStore>,
    events: broadcast::Sender<BridgeEvent>,
}

impl Bridge {
    pub fn new(
        state: Arc<AppState>,
        platform: Platform,
        config: ServiceConfig,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state,
            platform,
            config,
            settings,
            events,
        }
    }

    /// Lifecycle events: started, stopped, error
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Running session, for touch and panel input
    pub fn service(&self) -> Option<ServiceHandle> {
        self.state.service()
    }

    /// Ask for consent to start an on-screen session. `true` means the
    /// dialog is up and the answer will arrive via `handle_consent_result`.
    pub fn start(&self, sound_enabled: bool) -> BridgeResult<bool> {
        info!("Start requested (sound={})", sound_enabled);
        if self.state.is_running() {
            return Err(BridgeError::AlreadyRunning);
        }
        self.request_consent(PendingStart {
            sound_enabled,
            timer_seconds: 0,
        })
    }

    /// Countdown capture. Inside a running session this reuses its grant.
    pub fn start_timer(&self, seconds: u32, sound_enabled: bool) -> BridgeResult<bool> {
        let seconds = validate_timer_seconds(seconds).map_err(|_| BridgeError::InvalidTimer(seconds))?;
        info!("Timer start requested ({}s)", seconds);

        if let Some(service) = self.state.service() {
            debug!("Session running, countdown reuses its grant");
            service.update_sound(sound_enabled);
            service.start_timer(seconds);
            return Ok(false);
        }

        self.request_consent(PendingStart {
            sound_enabled,
            timer_seconds: seconds,
        })
    }

    fn request_consent(&self, pending: PendingStart) -> BridgeResult<bool> {
        if !self.platform.overlay.can_draw_overlays() {
            return Err(BridgeError::NoOverlayPermission);
        }
        if !self.platform.consent.has_activity() {
            return Err(BridgeError::NoActivity);
        }

        if self.state.has_pending_start() {
            debug!("Replacing pending start request");
        }
        self.state.set_pending_start(pending);
        if let Err(e) = self.platform.consent.launch_consent() {
            self.state.take_pending_start();
            return Err(BridgeError::Internal(e.to_string()));
        }
        Ok(true)
    }

    /// Answer from the consent dialog
    pub fn handle_consent_result(&self, grant: CaptureGrant) {
        let Some(pending) = self.state.take_pending_start() else {
            warn!("Consent result without a pending start, ignoring");
            return;
        };

        if !grant.is_approved() {
            info!("Screen capture consent denied");
            self.emit(BridgeEvent::error(CONSENT_DENIED));
            return;
        }

        let settings = self.settings.get();
        let mode = match pending.timer_seconds {
            0 => SessionMode::OnScreen,
            seconds => SessionMode::Timer { seconds },
        };
        let request = SessionRequest {
            grant,
            sound_enabled: pending.sound_enabled,
            mode,
            save_to_gallery: settings.save_to_gallery,
        };

        match Service::spawn(
            &self.state.runtime,
            self.config.clone(),
            self.platform.clone(),
            self.events.clone(),
            request,
        ) {
            Ok(handle) => {
                self.state.set_service(handle);
                self.emit(BridgeEvent::CaptureStarted);
            }
            Err(e) => {
                error!("Failed to start capture session: {}", e);
                self.emit(BridgeEvent::error(e.to_string()));
            }
        }
    }

    /// Stop the running session. No-op when nothing runs.
    pub async fn stop(&self) {
        let handle = self.state.take_service();
        match handle {
            Some(handle) => handle.stop().await,
            None => debug!("Stop requested with no session"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Draw-over-other-apps permission
    pub fn check_capture_permission(&self) -> bool {
        self.platform.overlay.can_draw_overlays()
    }

    pub fn request_capture_permission(&self) -> BridgeResult<()> {
        self.platform
            .overlay
            .open_overlay_settings()
            .map_err(|e| BridgeError::Internal(e.to_string()))
    }

    /// Persist the toggle and apply it to a running session
    pub fn update_sound_setting(&self, enabled: bool) -> BridgeResult<()> {
        self.settings
            .update(|s| s.sound_enabled = enabled)
            .map_err(|e| BridgeError::Internal(e.to_string()))?;
        if let Some(service) = self.state.service() {
            service.update_sound(enabled);
        }
        Ok(())
    }

    fn emit(&self, event: BridgeEvent) {
        debug!("Emitting {}", event.name());
        let _ = self.events.send(event);
    }
}
