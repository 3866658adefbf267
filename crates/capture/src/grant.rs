//! Platform-issued capture grant

use std::fmt;
use uuid::Uuid;

/// Result code reported by the consent dialog when the user approved
pub const RESULT_OK: i32 = -1;
/// Result code reported when the dialog was dismissed or denied
pub const RESULT_CANCELED: i32 = 0;

/// Opaque (result code, token) pair returned by the consent flow.
///
/// Moved into the projector on redemption, so a grant value can only be
/// used once.
pub struct CaptureGrant {
    result_code: i32,
    token: Uuid,
}

impl CaptureGrant {
    pub fn new(result_code: i32, token: Uuid) -> Self {
        Self { result_code, token }
    }

    /// A grant approved by the user
    pub fn approved() -> Self {
        Self::new(RESULT_OK, Uuid::new_v4())
    }

    pub fn result_code(&self) -> i32 {
        self.result_code
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn is_approved(&self) -> bool {
        self.result_code == RESULT_OK
    }
}

impl fmt::Debug for CaptureGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // token stays out of logs
        f.debug_struct("CaptureGrant")
            .field("result_code", &self.result_code)
            .finish_non_exhaustive()
    }
}
