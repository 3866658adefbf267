//! Platform capture abstraction

use shared_protocol::DisplayMetrics;
use std::sync::Arc;

use crate::{CaptureGrant, CaptureResult, CaptureSurface};

/// Name given to the mirror by every backend
pub const MIRROR_NAME: &str = "ScreenCapture";

/// Entry point into the platform's screen capture service
pub trait ScreenProjector: Send + Sync {
    /// Physical metrics of the default display
    fn display_metrics(&self) -> CaptureResult<DisplayMetrics>;

    /// Redeem a grant. Fails with `GrantInvalid` when the grant was denied
    /// or has already been redeemed.
    fn open_projection(&self, grant: CaptureGrant) -> CaptureResult<Box<dyn Projection>>;
}

/// A redeemed grant. Lives for the whole session, across passes.
pub trait Projection: Send {
    /// Start mirroring the physical display into `surface`
    fn create_mirror(
        &mut self,
        surface: Arc<CaptureSurface>,
        metrics: DisplayMetrics,
    ) -> CaptureResult<Box<dyn MirrorLink>>;

    /// Revoke the grant
    fn stop(&mut self);
}

/// Live display-to-surface link, held for a single pass
pub trait MirrorLink: Send {
    fn release(&mut self);
}
