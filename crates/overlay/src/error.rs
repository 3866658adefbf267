//! Overlay error types

use thiserror::Error;

use crate::WidgetKind;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Window layer rejected {kind:?}: {reason}")]
    Rejected { kind: WidgetKind, reason: String },

    #[error("Widget not attached: {0:?}")]
    NotAttached(WidgetKind),

    #[error("Overlay permission not granted")]
    PermissionDenied,
}

pub type OverlayResult<T> = Result<T, OverlayError>;
