//! Application state management

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;

use crate::service::ServiceHandle;

/// Start request waiting on the consent dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStart {
    pub sound_enabled: bool,
    /// 0 for an on-screen session
    pub timer_seconds: u32,
}

/// Application-wide state
pub struct AppState {
    /// Runtime the service loops run on
    pub runtime: Handle,
    /// The one session, if any was started
    service: RwLock<Option<ServiceHandle>>,
    pending_start: Mutex<Option<PendingStart>>,
}

impl AppState {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            service: RwLock::new(None),
            pending_start: Mutex::new(None),
        }
    }

    /// Handle of the running session; `None` once it has stopped
    pub fn service(&self) -> Option<ServiceHandle> {
        self.service
            .read()
            .as_ref()
            .filter(|handle| handle.is_running())
            .cloned()
    }

    pub fn is_running(&self) -> bool {
        self.service().is_some()
    }

    pub fn set_service(&self, handle: ServiceHandle) {
        *self.service.write() = Some(handle);
    }

    pub fn take_service(&self) -> Option<ServiceHandle> {
        self.service.write().take()
    }

    pub fn has_pending_start(&self) -> bool {
        self.pending_start.lock().is_some()
    }

    pub fn set_pending_start(&self, pending: PendingStart) {
        *self.pending_start.lock() = Some(pending);
    }

    pub fn take_pending_start(&self) -> Option<PendingStart> {
        self.pending_start.lock().take()
    }

    /// App-level teardown
    pub async fn shutdown(&self) {
        self.pending_start.lock().take();
        let handle = self.take_service();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}
