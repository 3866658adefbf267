//! Where encoded captures end up

use encoder::EncodedImage;
use parking_lot::Mutex;
use shared_protocol::{
    CaptureRecord, GALLERY_RELATIVE_PATH, StorageLocation, capture_file_name,
    parse_capture_file_name,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Persist failed: {0}")]
    PersistFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage collaborator. The record carries a URI for gallery writes and a
/// plain path for app-private writes, stamped with the millisecond the file
/// was actually named after.
pub trait StorageWriter: Send + Sync {
    fn persist(
        &self,
        image: &EncodedImage,
        timestamp_millis: u64,
        save_to_gallery: bool,
    ) -> StorageResult<CaptureRecord>;
}

/// Writes PNG files under a gallery directory and a private directory
pub struct FsStorage {
    gallery_dir: PathBuf,
    private_dir: PathBuf,
}

impl FsStorage {
    pub fn new(gallery_dir: impl Into<PathBuf>, private_dir: impl Into<PathBuf>) -> Self {
        Self {
            gallery_dir: gallery_dir.into(),
            private_dir: private_dir.into(),
        }
    }

    /// Gallery under the user's home, private files under local app data
    pub fn from_system_dirs() -> Option<Self> {
        let home = dirs::home_dir()?;
        let data = dirs::data_local_dir()?;
        Some(Self::new(
            home.join(GALLERY_RELATIVE_PATH),
            data.join("snapfloat").join("captures"),
        ))
    }

    pub fn gallery_dir(&self) -> &Path {
        &self.gallery_dir
    }

    pub fn private_dir(&self) -> &Path {
        &self.private_dir
    }

    /// The app's own captures in the gallery, newest first
    pub fn list_captures(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.gallery_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut captures = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(millis) = name.to_str().and_then(|n| parse_capture_file_name(n).ok()) {
                captures.push((millis, entry.path()));
            }
        }
        captures.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(captures.into_iter().map(|(_, path)| path).collect())
    }

    /// First free `Screenshot_<ms>.png` at or after `timestamp_millis`
    fn free_path(dir: &Path, timestamp_millis: u64) -> (PathBuf, u64) {
        let mut millis = timestamp_millis;
        loop {
            let path = dir.join(capture_file_name(millis));
            if !path.exists() {
                return (path, millis);
            }
            millis += 1;
        }
    }
}

impl StorageWriter for FsStorage {
    fn persist(
        &self,
        image: &EncodedImage,
        timestamp_millis: u64,
        save_to_gallery: bool,
    ) -> StorageResult<CaptureRecord> {
        let dir = if save_to_gallery {
            &self.gallery_dir
        } else {
            &self.private_dir
        };
        std::fs::create_dir_all(dir)?;

        let (path, millis) = Self::free_path(dir, timestamp_millis);
        std::fs::write(&path, &image.data)
            .map_err(|e| StorageError::PersistFailed(format!("{}: {}", path.display(), e)))?;
        info!("Saved {} bytes to {}", image.data.len(), path.display());

        let location = if save_to_gallery {
            StorageLocation::Uri(format!("file://{}", path.display()))
        } else {
            StorageLocation::Path(path)
        };
        Ok(CaptureRecord::new(location, millis))
    }
}

/// One write seen by [`MemoryStorage`]
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub location: StorageLocation,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// In-memory storage for headless runs
#[derive(Default)]
pub struct MemoryStorage {
    written: Mutex<Vec<StoredImage>>,
    fail: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<StoredImage> {
        self.written.lock().clone()
    }

    /// Make every following write fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail.lock() = Some(reason.into());
    }
}

impl StorageWriter for MemoryStorage {
    fn persist(
        &self,
        image: &EncodedImage,
        timestamp_millis: u64,
        save_to_gallery: bool,
    ) -> StorageResult<CaptureRecord> {
        if let Some(reason) = self.fail.lock().clone() {
            return Err(StorageError::PersistFailed(reason));
        }

        let name = capture_file_name(timestamp_millis);
        let location = if save_to_gallery {
            StorageLocation::Uri(format!("content://media/{}/{}", GALLERY_RELATIVE_PATH, name))
        } else {
            StorageLocation::Path(PathBuf::from("captures").join(name))
        };
        debug!("Stored capture in memory at {}", location);

        self.written.lock().push(StoredImage {
            location: location.clone(),
            width: image.width,
            height: image.height,
            bytes: image.data.len(),
        });
        Ok(CaptureRecord::new(location, timestamp_millis))
    }
}

/// Storage that parks every write until released
#[cfg(test)]
pub(crate) struct GatedStorage {
    inner: MemoryStorage,
    entered: tokio::sync::Notify,
    open: Mutex<bool>,
    opened: parking_lot::Condvar,
}

#[cfg(test)]
impl GatedStorage {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            entered: tokio::sync::Notify::new(),
            open: Mutex::new(false),
            opened: parking_lot::Condvar::new(),
        }
    }

    /// Resolves once a write is parked on the gate
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    pub(crate) fn written(&self) -> Vec<StoredImage> {
        self.inner.written()
    }
}

#[cfg(test)]
impl StorageWriter for GatedStorage {
    fn persist(
        &self,
        image: &EncodedImage,
        timestamp_millis: u64,
        save_to_gallery: bool,
    ) -> StorageResult<CaptureRecord> {
        self.entered.notify_one();
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
        drop(open);
        self.inner.persist(image, timestamp_millis, save_to_gallery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn image() -> EncodedImage {
        EncodedImage {
            data: Bytes::from_static(b"\x89PNG fake"),
            width: 4,
            height: 2,
            mime_type: "image/png",
            encode_time_us: 0,
        }
    }

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("snapfloat-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_targets_by_setting() {
        let root = scratch();
        let storage = FsStorage::new(root.join("gallery"), root.join("private"));

        let gallery = storage.persist(&image(), 1_700_000_000_000, true).unwrap();
        assert!(
            matches!(gallery.location(), StorageLocation::Uri(uri) if uri.starts_with("file://"))
        );
        assert!(gallery.location().is_png());

        let private = storage.persist(&image(), 1_700_000_000_000, false).unwrap();
        assert_eq!(
            private.location(),
            &StorageLocation::Path(root.join("private").join("Screenshot_1700000000000.png"))
        );
        assert_eq!(private.timestamp_millis(), 1_700_000_000_000);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_same_millisecond_does_not_overwrite() {
        let root = scratch();
        let storage = FsStorage::new(root.join("gallery"), root.join("private"));

        let first = storage.persist(&image(), 42, false).unwrap();
        let second = storage.persist(&image(), 42, false).unwrap();
        assert_ne!(first.location(), second.location());
        assert_eq!(
            second.location(),
            &StorageLocation::Path(root.join("private").join("Screenshot_43.png"))
        );
        // record and file name agree on the bumped millisecond
        assert_eq!(first.timestamp_millis(), 42);
        assert_eq!(second.timestamp_millis(), 43);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_list_captures_newest_first() {
        let root = scratch();
        let gallery = root.join("gallery");
        let storage = FsStorage::new(&gallery, root.join("private"));

        storage.persist(&image(), 100, true).unwrap();
        storage.persist(&image(), 300, true).unwrap();
        storage.persist(&image(), 200, true).unwrap();
        std::fs::write(gallery.join("IMG_0001.png"), b"other").unwrap();

        let names: Vec<String> = storage
            .list_captures()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect();
        assert_eq!(
            names,
            vec!["Screenshot_300.png", "Screenshot_200.png", "Screenshot_100.png"]
        );

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_list_without_gallery_dir_is_empty() {
        let storage = FsStorage::new(scratch(), scratch());
        assert!(storage.list_captures().unwrap().is_empty());
    }

    #[test]
    fn test_memory_storage_failure() {
        let storage = MemoryStorage::new();
        storage.fail_with("disk full");
        assert!(matches!(
            storage.persist(&image(), 1, true),
            Err(StorageError::PersistFailed(_))
        ));
        assert!(storage.written().is_empty());
    }
}
