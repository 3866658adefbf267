//! Capture Sequencer: the off-loop half of a pass
//!
//! The service loop hides the control, recreates the surface and binds the
//! mirror. Everything after the first frame (acquire, crop, encode,
//! persist) happens here on the blocking pool, then the outcome is posted
//! back to the loop. The [`PassLatch`] is claimed only right before that
//! post, so the watchdog can still win while encode or persist hangs.

use capture::{CaptureError, CaptureSurface};
use encoder::FrameEncoder;
use shared_protocol::{CaptureOrigin, CaptureRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task;
use tracing::{debug, info};

use crate::service::UiMessage;
use crate::storage::StorageWriter;

/// Why a pass produced no result
#[derive(Debug, Error)]
pub enum PassError {
    #[error("Frame acquisition failed: {0}")]
    FrameAcquisitionFailed(CaptureError),
    #[error("Encode or persist failed: {0}")]
    EncodeOrPersistFailed(String),
    #[error("No frame before the watchdog expired")]
    TimedOut,
    #[error("Mirror bind failed")]
    MirrorBindFailed,
    #[error("Pass canceled by session stop")]
    Cancelled,
}

/// Completion of one pass. `result` is `None` for every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass_id: u64,
    pub origin: CaptureOrigin,
    pub result: Option<CaptureRecord>,
}

/// One-shot claim on a pass's completion
#[derive(Debug, Clone, Default)]
pub struct PassLatch(Arc<AtomicBool>);

impl PassLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for exactly one caller
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Register the frame-ready listener. Call before binding the mirror.
pub fn arm(surface: &CaptureSurface) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    surface.set_frame_listener(Box::new(move || {
        let _ = tx.send(());
    }));
    rx
}

/// Everything the off-loop half needs
pub struct CapturePass {
    pub id: u64,
    pub surface: Arc<CaptureSurface>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub storage: Arc<dyn StorageWriter>,
    pub save_to_gallery: bool,
    pub latch: PassLatch,
}

impl CapturePass {
    /// Wait for the first frame, then finish the pass and report back.
    /// Nothing is posted when the watchdog claimed the pass first.
    pub async fn run(self, frame_ready: oneshot::Receiver<()>, tx: UnboundedSender<UiMessage>) {
        let ready = frame_ready.await;

        let id = self.id;
        let latch = self.latch.clone();
        if latch.is_claimed() {
            debug!(pass = id, "Frame arrived after the pass was claimed");
            return;
        }

        let outcome = match ready {
            Ok(()) => match task::spawn_blocking(move || self.process()).await {
                Ok(outcome) => outcome,
                Err(e) => Err(PassError::EncodeOrPersistFailed(format!(
                    "encode task failed: {}",
                    e
                ))),
            },
            Err(_) => Err(PassError::FrameAcquisitionFailed(CaptureError::SurfaceClosed)),
        };

        // no await between the claim and the post
        if !latch.claim() {
            debug!(pass = id, "Pass finished after the watchdog claimed it");
            return;
        }
        let _ = tx.send(UiMessage::PassFinished { pass_id: id, outcome });
    }

    /// Acquire the newest frame, crop away stride padding, encode, persist.
    /// Blocking; [`run`](Self::run) moves it off the async workers.
    pub fn process(&self) -> Result<CaptureRecord, PassError> {
        let frame = self
            .surface
            .acquire_latest()
            .map_err(PassError::FrameAcquisitionFailed)?;

        let image = frame
            .to_rgba_image()
            .map_err(PassError::FrameAcquisitionFailed)?;

        let encoded = self
            .encoder
            .encode_image(&image)
            .map_err(|e| PassError::EncodeOrPersistFailed(e.to_string()))?;

        let record = self
            .storage
            .persist(&encoded, unix_millis(), self.save_to_gallery)
            .map_err(|e| PassError::EncodeOrPersistFailed(e.to_string()))?;

        info!(
            pass = self.id,
            "Captured {}x{} ({} bytes) to {}",
            encoded.width,
            encoded.height,
            encoded.data.len(),
            record.location()
        );
        Ok(record)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GatedStorage, MemoryStorage};
    use bytes::Bytes;
    use capture::{PixelFormat, RawFrame, SurfaceConfig};
    use encoder::{EncoderConfig, PngFrameEncoder};
    use std::time::Instant;
    use tokio::sync::mpsc;

    /// 3x2 frame padded to 5 pixels per row, BGRA
    fn padded_frame() -> RawFrame {
        let row_stride = 5 * 4;
        let mut data = vec![0xFFu8; row_stride * 2];
        for y in 0..2 {
            for x in 0..3 {
                let offset = y * row_stride + x * 4;
                data[offset..offset + 4].copy_from_slice(&[0x30, x as u8, y as u8, 0xFF]);
            }
        }
        RawFrame {
            data: Bytes::from(data),
            width: 3,
            height: 2,
            pixel_stride: 4,
            row_stride: row_stride as u32,
            format: PixelFormat::Bgra8,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    fn pass(storage: Arc<dyn StorageWriter>) -> CapturePass {
        CapturePass {
            id: 1,
            surface: Arc::new(CaptureSurface::new(SurfaceConfig::new(3, 2)).unwrap()),
            encoder: Arc::new(PngFrameEncoder::new(EncoderConfig::default())),
            storage,
            save_to_gallery: true,
            latch: PassLatch::new(),
        }
    }

    #[test]
    fn test_latch_claims_once() {
        let latch = PassLatch::new();
        let other = latch.clone();
        assert!(latch.claim());
        assert!(!other.claim());
        assert!(other.is_claimed());
    }

    #[test]
    fn test_process_crops_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let pass = pass(storage.clone());
        pass.surface.submit(padded_frame()).unwrap();

        let record = pass.process().unwrap();
        assert!(record.location().is_png());

        let written = storage.written();
        assert_eq!(written.len(), 1);
        assert_eq!((written[0].width, written[0].height), (3, 2));
    }

    #[test]
    fn test_process_without_frame() {
        let storage = Arc::new(MemoryStorage::new());
        let pass = pass(storage.clone());
        assert!(matches!(
            pass.process(),
            Err(PassError::FrameAcquisitionFailed(
                CaptureError::FrameAcquisitionFailed
            ))
        ));
        assert!(storage.written().is_empty());
    }

    #[test]
    fn test_persist_failure_is_typed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.fail_with("disk full");
        let pass = pass(storage);
        pass.surface.submit(padded_frame()).unwrap();
        assert!(matches!(
            pass.process(),
            Err(PassError::EncodeOrPersistFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_run_reports_once_on_frame() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let storage = Arc::new(MemoryStorage::new());
        let pass = pass(storage);
        let frame_ready = arm(&pass.surface);
        let surface = pass.surface.clone();

        let task = tokio::spawn(pass.run(frame_ready, tx));
        surface.submit(padded_frame()).unwrap();
        task.await.unwrap();

        match rx.recv().await {
            Some(UiMessage::PassFinished { pass_id, outcome }) => {
                assert_eq!(pass_id, 1);
                assert!(outcome.is_ok());
            }
            _ => panic!("expected a pass report"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_claimed_pass_stays_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pass = pass(Arc::new(MemoryStorage::new()));
        let frame_ready = arm(&pass.surface);
        let surface = pass.surface.clone();
        // watchdog got there first
        assert!(pass.latch.claim());

        let task = tokio::spawn(pass.run(frame_ready, tx));
        surface.submit(padded_frame()).unwrap();
        task.await.unwrap();

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_watchdog_claim_during_persist_wins() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let storage = Arc::new(GatedStorage::new());
        let pass = pass(storage.clone());
        let frame_ready = arm(&pass.surface);
        let surface = pass.surface.clone();
        let latch = pass.latch.clone();

        let task = tokio::spawn(pass.run(frame_ready, tx));
        surface.submit(padded_frame()).unwrap();
        storage.entered().await;

        // frame already landed; the watchdog can still take the pass
        let claimed = latch.claim();
        storage.release();
        task.await.unwrap();

        assert!(claimed);
        assert_eq!(storage.written().len(), 1);
        assert!(rx.recv().await.is_none());
    }
}
