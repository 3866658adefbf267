//! Capture results and output naming

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{ProtocolError, ProtocolResult};

const FILE_PREFIX: &str = "Screenshot_";
const FILE_SUFFIX: &str = ".png";

/// Where a capture was persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StorageLocation {
    /// Content URI inside a media collection
    Uri(String),
    /// Plain file on disk
    Path(PathBuf),
}

impl StorageLocation {
    /// True when the location names a PNG file
    pub fn is_png(&self) -> bool {
        match self {
            StorageLocation::Uri(uri) => uri.ends_with(FILE_SUFFIX),
            StorageLocation::Path(path) => path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png")),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Uri(uri) => write!(f, "{}", uri),
            StorageLocation::Path(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Result of one successful capture pass. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    id: Uuid,
    location: StorageLocation,
    timestamp_millis: u64,
}

impl CaptureRecord {
    pub fn new(location: StorageLocation, timestamp_millis: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            location,
            timestamp_millis,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp_millis
    }
}

/// Output file name for a capture taken at `unix_millis`
pub fn capture_file_name(unix_millis: u64) -> String {
    format!("{}{}{}", FILE_PREFIX, unix_millis, FILE_SUFFIX)
}

/// Parse the timestamp back out of a capture file name
pub fn parse_capture_file_name(name: &str) -> ProtocolResult<u64> {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ProtocolError::InvalidFileName(name.to_string()))
}

/// True when `name` follows the capture naming convention
pub fn is_capture_file_name(name: &str) -> bool {
    parse_capture_file_name(name).is_ok()
}
