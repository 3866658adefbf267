//! Capture Session Manager
//!
//! Owns the redeemed grant for the whole session and the per-pass surface
//! and mirror. At most one surface and one mirror exist at a time: both are
//! released before a new pair is created.

use capture::{
    CaptureError, CaptureGrant, CaptureSurface, MirrorLink, PixelFormat, Projection,
    ScreenProjector, SurfaceConfig,
};
use overlay::OverlayError;
use parking_lot::RwLock;
use shared_protocol::{DisplayMetrics, SessionMode, SessionState};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::platform::{ForegroundIndicator, ForegroundNotice};

/// Session error
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Capture grant invalid: {0}")]
    GrantInvalid(String),
    #[error("Mirror bind failed: {0}")]
    MirrorBindFailed(String),
    #[error("Surface allocation failed: {0}")]
    SurfaceAllocation(String),
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),
    #[error("Capture error: {0}")]
    Capture(CaptureError),
    #[error("Session not active")]
    NotActive,
}

impl From<CaptureError> for SessionError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::GrantInvalid(reason) => SessionError::GrantInvalid(reason),
            CaptureError::MirrorBindFailed(reason) => SessionError::MirrorBindFailed(reason),
            CaptureError::SurfaceAllocation(reason) => SessionError::SurfaceAllocation(reason),
            other => SessionError::Capture(other),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a session is started with
#[derive(Debug)]
pub struct SessionRequest {
    pub grant: CaptureGrant,
    pub sound_enabled: bool,
    pub mode: SessionMode,
    pub save_to_gallery: bool,
}

pub struct SessionManager {
    projection: Option<Box<dyn Projection>>,
    metrics: DisplayMetrics,
    surface: Option<Arc<CaptureSurface>>,
    mirror: Option<Box<dyn MirrorLink>>,
    surface_buffers: usize,
    sound_enabled: bool,
    save_to_gallery: bool,
    mode: SessionMode,
    state: Arc<RwLock<SessionState>>,
    indicator: Arc<dyn ForegroundIndicator>,
}

impl SessionManager {
    /// Redeem the grant, read the display geometry once and post the
    /// foreground indicator
    pub fn start(
        projector: &dyn ScreenProjector,
        indicator: Arc<dyn ForegroundIndicator>,
        request: SessionRequest,
        surface_buffers: usize,
    ) -> SessionResult<Self> {
        info!(
            "Starting capture session: mode={:?}, sound={}",
            request.mode, request.sound_enabled
        );

        let metrics = projector.display_metrics()?;
        let projection = projector.open_projection(request.grant)?;

        indicator.show(&ForegroundNotice::default());

        let state = SessionState::Idle
            .transition(SessionState::Active)
            .unwrap_or(SessionState::Active);

        debug!(
            "Display: {}x{} @ {}dpi",
            metrics.width, metrics.height, metrics.density_dpi
        );

        Ok(Self {
            projection: Some(projection),
            metrics,
            surface: None,
            mirror: None,
            surface_buffers,
            sound_enabled: request.sound_enabled,
            save_to_gallery: request.save_to_gallery,
            mode: request.mode,
            state: Arc::new(RwLock::new(state)),
            indicator,
        })
    }

    pub fn metrics(&self) -> DisplayMetrics {
        self.metrics
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Shared read-only view of the state for status queries
    pub fn state_handle(&self) -> Arc<RwLock<SessionState>> {
        self.state.clone()
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn save_to_gallery(&self) -> bool {
        self.save_to_gallery
    }

    /// Takes effect from the next pass
    pub fn update_sound(&mut self, enabled: bool) {
        debug!("Shutter sound {}", if enabled { "on" } else { "off" });
        self.sound_enabled = enabled;
    }

    pub fn set_state(&self, to: SessionState) {
        let mut state = self.state.write();
        match state.transition(to) {
            Ok(next) => *state = next,
            Err(e) => warn!("{}", e),
        }
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Drop any previous surface and mirror, then allocate a fresh surface
    /// sized to the display
    pub fn recreate_surface(&mut self) -> SessionResult<Arc<CaptureSurface>> {
        if self.projection.is_none() {
            return Err(SessionError::NotActive);
        }
        self.release_pass_resources();

        let config = SurfaceConfig {
            width: self.metrics.width,
            height: self.metrics.height,
            format: PixelFormat::Rgba8,
            max_images: self.surface_buffers,
        };
        let surface = Arc::new(CaptureSurface::new(config)?);

        self.surface = Some(surface.clone());
        Ok(surface)
    }

    /// Mirror the display into the current surface. The frame listener must
    /// already be registered.
    pub fn bind_mirror(&mut self) -> SessionResult<()> {
        let surface = self.surface.clone().ok_or(SessionError::NotActive)?;
        let projection = self.projection.as_mut().ok_or(SessionError::NotActive)?;

        let mirror = projection.create_mirror(surface, self.metrics)?;
        self.mirror = Some(mirror);
        debug!("Mirror bound");
        Ok(())
    }

    /// Release the mirror and surface of the current pass. The grant stays.
    pub fn release_pass_resources(&mut self) {
        if let Some(mut mirror) = self.mirror.take() {
            mirror.release();
            debug!("Mirror released");
        }
        if let Some(surface) = self.surface.take() {
            surface.clear_frame_listener();
            surface.close();
        }
    }

    /// Release mirror, surface and grant, in that order. Returns false when
    /// the session was already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state() == SessionState::Stopped {
            return false;
        }

        self.release_pass_resources();
        if let Some(mut projection) = self.projection.take() {
            projection.stop();
        }
        self.indicator.remove();
        self.set_state(SessionState::Stopped);

        info!("Capture session stopped");
        true
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingIndicator;
    use capture::{HeadlessProjector, RESULT_CANCELED};
    use uuid::Uuid;

    fn request(grant: CaptureGrant) -> SessionRequest {
        SessionRequest {
            grant,
            sound_enabled: true,
            mode: SessionMode::OnScreen,
            save_to_gallery: true,
        }
    }

    #[test]
    fn test_start_with_denied_grant() {
        let projector = HeadlessProjector::default();
        let indicator = Arc::new(RecordingIndicator::default());
        let denied = CaptureGrant::new(RESULT_CANCELED, Uuid::new_v4());

        let result = SessionManager::start(&projector, indicator.clone(), request(denied), 2);
        assert!(matches!(result, Err(SessionError::GrantInvalid(_))));
        assert!(!indicator.is_showing());
    }

    #[test]
    fn test_surface_recreated_per_pass() {
        let projector = HeadlessProjector::default();
        let probe = projector.probe();
        let indicator = Arc::new(RecordingIndicator::default());
        let mut session =
            SessionManager::start(&projector, indicator.clone(), request(CaptureGrant::approved()), 2)
                .unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(indicator.is_showing());

        let first = session.recreate_surface().unwrap();
        session.bind_mirror().unwrap();
        let second = session.recreate_surface().unwrap();
        session.bind_mirror().unwrap();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(probe.mirrors_created(), 2);
        assert_eq!(probe.max_live_mirrors(), 1);

        session.release_pass_resources();
        assert!(!session.has_surface());
        assert!(!session.has_mirror());
        assert_eq!(probe.live_mirrors(), 0);
        // grant outlives the pass
        assert_eq!(probe.projections_open(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let projector = HeadlessProjector::default();
        let probe = projector.probe();
        let indicator = Arc::new(RecordingIndicator::default());
        let mut session =
            SessionManager::start(&projector, indicator.clone(), request(CaptureGrant::approved()), 2)
                .unwrap();
        session.recreate_surface().unwrap();
        session.bind_mirror().unwrap();

        assert!(session.stop());
        assert!(!session.stop());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(probe.live_mirrors(), 0);
        assert_eq!(probe.projections_open(), 0);
        assert!(!indicator.is_showing());
        assert!(matches!(session.recreate_surface(), Err(SessionError::NotActive)));
    }

    #[test]
    fn test_mirror_failure_is_typed() {
        let projector = HeadlessProjector::default();
        projector.set_fail_mirror(true);
        let indicator = Arc::new(RecordingIndicator::default());
        let mut session =
            SessionManager::start(&projector, indicator, request(CaptureGrant::approved()), 2)
                .unwrap();
        session.recreate_surface().unwrap();
        assert!(matches!(
            session.bind_mirror(),
            Err(SessionError::MirrorBindFailed(_))
        ));
        assert!(!session.has_mirror());
    }
}
