//! Frame sink bound to a display mirror

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace};

use crate::{CaptureError, CaptureResult, PixelFormat, RawFrame};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// One-shot callback fired when the first frame lands
pub type FrameListener = Box<dyn FnOnce() + Send>;

/// Surface configuration
#[derive(Debug, Clone, Copy)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Number of buffers queued before the oldest is dropped
    pub max_images: usize,
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            max_images: 2,
        }
    }
}

/// Surface statistics
#[derive(Debug, Clone, Default)]
pub struct SurfaceStats {
    /// Frames accepted from the producer
    pub frames_received: u64,
    /// Frames discarded because a newer one replaced them
    pub frames_dropped: u64,
}

/// Pixel-buffer sink a mirror renders into.
///
/// Producers call [`submit`](Self::submit) from their own thread. The
/// queue holds at most `max_images` frames; when full, the oldest frame is
/// dropped so the consumer always sees the most recent one.
pub struct CaptureSurface {
    id: u64,
    config: SurfaceConfig,
    tx: Sender<RawFrame>,
    rx: Receiver<RawFrame>,
    listener: Mutex<Option<FrameListener>>,
    closed: AtomicBool,
    stats: Mutex<SurfaceStats>,
}

impl CaptureSurface {
    /// Allocate a new surface
    pub fn new(config: SurfaceConfig) -> CaptureResult<Self> {
        if config.width == 0 || config.height == 0 || config.max_images == 0 {
            return Err(CaptureError::SurfaceAllocation(format!(
                "invalid surface {}x{} with {} buffers",
                config.width, config.height, config.max_images
            )));
        }

        let (tx, rx) = bounded(config.max_images);
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            surface = id,
            "Allocated {}x{} surface",
            config.width, config.height
        );

        Ok(Self {
            id,
            config,
            tx,
            rx,
            listener: Mutex::new(None),
            closed: AtomicBool::new(false),
            stats: Mutex::new(SurfaceStats::default()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats.lock().clone()
    }

    /// Register the frame-ready callback. Must happen before a mirror is
    /// bound, otherwise the first frame can arrive with nobody listening.
    pub fn set_frame_listener(&self, listener: FrameListener) {
        *self.listener.lock() = Some(listener);
    }

    pub fn clear_frame_listener(&self) {
        self.listener.lock().take();
    }

    /// Queue a frame from the producer side
    pub fn submit(&self, frame: RawFrame) -> CaptureResult<()> {
        if self.is_closed() {
            return Err(CaptureError::SurfaceClosed);
        }

        let mut pending = frame;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => break,
                Err(TrySendError::Full(frame)) => {
                    if self.rx.try_recv().is_ok() {
                        self.stats.lock().frames_dropped += 1;
                    }
                    pending = frame;
                }
                Err(TrySendError::Disconnected(_)) => return Err(CaptureError::SurfaceClosed),
            }
        }
        self.stats.lock().frames_received += 1;
        trace!(surface = self.id, "Frame queued");

        // Fire outside the lock; the listener may touch the surface again
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener();
        }

        Ok(())
    }

    /// Take the newest queued frame, discarding anything older
    pub fn acquire_latest(&self) -> CaptureResult<RawFrame> {
        if self.is_closed() {
            return Err(CaptureError::SurfaceClosed);
        }

        let mut latest = None;
        while let Ok(frame) = self.rx.try_recv() {
            if latest.is_some() {
                self.stats.lock().frames_dropped += 1;
            }
            latest = Some(frame);
        }

        latest.ok_or(CaptureError::FrameAcquisitionFailed)
    }

    /// Release all buffers. Further submits are rejected.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.clear_frame_listener();
        while self.rx.try_recv().is_ok() {}
        debug!(surface = self.id, "Surface closed");
    }
}

impl Drop for CaptureSurface {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn frame(sequence: u64) -> RawFrame {
        RawFrame {
            data: Bytes::from(vec![0u8; 16]),
            width: 2,
            height: 2,
            pixel_stride: 4,
            row_stride: 8,
            format: PixelFormat::Rgba8,
            timestamp: Instant::now(),
            sequence,
        }
    }

    #[test]
    fn test_most_recent_frame_wins() {
        let surface = CaptureSurface::new(SurfaceConfig::new(2, 2)).unwrap();
        for seq in 1..=5 {
            surface.submit(frame(seq)).unwrap();
        }

        let latest = surface.acquire_latest().unwrap();
        assert_eq!(latest.sequence, 5);

        let stats = surface.stats();
        assert_eq!(stats.frames_received, 5);
        assert_eq!(stats.frames_dropped, 4);
    }

    #[test]
    fn test_listener_fires_once() {
        let surface = CaptureSurface::new(SurfaceConfig::new(2, 2)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        surface.set_frame_listener(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        surface.submit(frame(1)).unwrap();
        surface.submit(frame(2)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_surface_has_no_frame() {
        let surface = CaptureSurface::new(SurfaceConfig::new(2, 2)).unwrap();
        assert!(matches!(
            surface.acquire_latest(),
            Err(CaptureError::FrameAcquisitionFailed)
        ));
    }

    #[test]
    fn test_closed_surface_rejects_frames() {
        let surface = CaptureSurface::new(SurfaceConfig::new(2, 2)).unwrap();
        surface.submit(frame(1)).unwrap();
        surface.close();

        assert!(matches!(
            surface.submit(frame(2)),
            Err(CaptureError::SurfaceClosed)
        ));
        assert!(matches!(
            surface.acquire_latest(),
            Err(CaptureError::SurfaceClosed)
        ));
    }

    #[test]
    fn test_zero_sized_surface_rejected() {
        assert!(CaptureSurface::new(SurfaceConfig::new(0, 10)).is_err());
    }
}
