//! Capture error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture grant invalid: {0}")]
    GrantInvalid(String),

    #[error("Failed to bind display mirror: {0}")]
    MirrorBindFailed(String),

    #[error("Surface allocation failed: {0}")]
    SurfaceAllocation(String),

    #[error("No frame available")]
    FrameAcquisitionFailed,

    #[error("Surface already closed")]
    SurfaceClosed,

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Frame buffer too small: {actual} bytes, need {expected}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Projection already stopped")]
    ProjectionStopped,

    #[error("Platform error: {0}")]
    Platform(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
