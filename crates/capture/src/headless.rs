//! Headless projector that renders synthetic frames
//!
//! Used by the demo binary and by tests. Frames carry a recognizable
//! pattern (pixel = x, y) and padding bytes set to 0xFF, so a missing crop
//! shows up immediately.

use bytes::Bytes;
use parking_lot::Mutex;
use shared_protocol::DisplayMetrics;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    CaptureError, CaptureGrant, CaptureResult, CaptureSurface, MIRROR_NAME, MirrorLink,
    PixelFormat, Projection, RawFrame, ScreenProjector,
};

/// When a freshly bound mirror produces its frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDelivery {
    /// Two frames, synchronously while the mirror is bound
    Immediate,
    /// One frame after the given delay
    Delayed(Duration),
    /// Nothing ever arrives
    Never,
}

/// Headless projector configuration
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub metrics: DisplayMetrics,
    /// Extra pixels of row padding in every buffer
    pub row_padding_px: u32,
    pub format: PixelFormat,
    pub delivery: FrameDelivery,
    /// Make every mirror creation fail
    pub fail_mirror: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            metrics: DisplayMetrics::new(360, 640, 160),
            row_padding_px: 8,
            format: PixelFormat::Rgba8,
            delivery: FrameDelivery::Immediate,
            fail_mirror: false,
        }
    }
}

/// Resource counters observed by tests
#[derive(Debug, Default)]
pub struct HeadlessProbe {
    pub projections_open: AtomicUsize,
    pub live_mirrors: AtomicUsize,
    pub max_live_mirrors: AtomicUsize,
    pub mirrors_created: AtomicUsize,
}

impl HeadlessProbe {
    pub fn live_mirrors(&self) -> usize {
        self.live_mirrors.load(Ordering::SeqCst)
    }

    pub fn max_live_mirrors(&self) -> usize {
        self.max_live_mirrors.load(Ordering::SeqCst)
    }

    pub fn mirrors_created(&self) -> usize {
        self.mirrors_created.load(Ordering::SeqCst)
    }

    pub fn projections_open(&self) -> usize {
        self.projections_open.load(Ordering::SeqCst)
    }
}

struct Shared {
    config: Mutex<HeadlessConfig>,
    redeemed: Mutex<HashSet<Uuid>>,
    sequence: AtomicU64,
    probe: Arc<HeadlessProbe>,
}

/// Software [`ScreenProjector`]
#[derive(Clone)]
pub struct HeadlessProjector {
    shared: Arc<Shared>,
}

impl HeadlessProjector {
    pub fn new(config: HeadlessConfig) -> Self {
        info!(
            "Initializing headless projector: {}x{} @ {}dpi",
            config.metrics.width, config.metrics.height, config.metrics.density_dpi
        );

        Self {
            shared: Arc::new(Shared {
                config: Mutex::new(config),
                redeemed: Mutex::new(HashSet::new()),
                sequence: AtomicU64::new(0),
                probe: Arc::new(HeadlessProbe::default()),
            }),
        }
    }

    pub fn probe(&self) -> Arc<HeadlessProbe> {
        self.shared.probe.clone()
    }

    /// Change frame delivery for mirrors bound from now on
    pub fn set_delivery(&self, delivery: FrameDelivery) {
        self.shared.config.lock().delivery = delivery;
    }

    pub fn set_fail_mirror(&self, fail: bool) {
        self.shared.config.lock().fail_mirror = fail;
    }
}

impl Default for HeadlessProjector {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl ScreenProjector for HeadlessProjector {
    fn display_metrics(&self) -> CaptureResult<DisplayMetrics> {
        Ok(self.shared.config.lock().metrics)
    }

    fn open_projection(&self, grant: CaptureGrant) -> CaptureResult<Box<dyn Projection>> {
        if !grant.is_approved() {
            return Err(CaptureError::GrantInvalid(format!(
                "consent result code {}",
                grant.result_code()
            )));
        }

        if !self.shared.redeemed.lock().insert(grant.token()) {
            return Err(CaptureError::GrantInvalid("grant already redeemed".into()));
        }

        self.shared
            .probe
            .projections_open
            .fetch_add(1, Ordering::SeqCst);
        debug!("Projection opened");

        Ok(Box::new(HeadlessProjection {
            shared: self.shared.clone(),
            stopped: false,
        }))
    }
}

struct HeadlessProjection {
    shared: Arc<Shared>,
    stopped: bool,
}

impl Projection for HeadlessProjection {
    fn create_mirror(
        &mut self,
        surface: Arc<CaptureSurface>,
        metrics: DisplayMetrics,
    ) -> CaptureResult<Box<dyn MirrorLink>> {
        if self.stopped {
            return Err(CaptureError::ProjectionStopped);
        }

        let config = self.shared.config.lock().clone();
        if config.fail_mirror {
            return Err(CaptureError::MirrorBindFailed(format!(
                "{} rejected by display manager",
                MIRROR_NAME
            )));
        }

        let probe = &self.shared.probe;
        probe.mirrors_created.fetch_add(1, Ordering::SeqCst);
        let live = probe.live_mirrors.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_live_mirrors.fetch_max(live, Ordering::SeqCst);

        let released = Arc::new(AtomicBool::new(false));
        let mirror = HeadlessMirror {
            probe: probe.clone(),
            released: released.clone(),
        };

        let renderer = FrameRenderer {
            metrics,
            row_padding_px: config.row_padding_px,
            format: config.format,
        };

        match config.delivery {
            FrameDelivery::Immediate => {
                for _ in 0..2 {
                    let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst);
                    surface.submit(renderer.render(sequence))?;
                }
            }
            FrameDelivery::Delayed(delay) => {
                let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst);
                let deliver = move || {
                    if !released.load(Ordering::SeqCst) {
                        let _ = surface.submit(renderer.render(sequence));
                    }
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            tokio::time::sleep(delay).await;
                            deliver();
                        });
                    }
                    Err(_) => {
                        std::thread::spawn(move || {
                            std::thread::sleep(delay);
                            deliver();
                        });
                    }
                }
            }
            FrameDelivery::Never => {}
        }

        Ok(Box::new(mirror))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.shared
                .probe
                .projections_open
                .fetch_sub(1, Ordering::SeqCst);
            debug!("Projection stopped");
        }
    }
}

struct HeadlessMirror {
    probe: Arc<HeadlessProbe>,
    released: Arc<AtomicBool>,
}

impl MirrorLink for HeadlessMirror {
    fn release(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.probe.live_mirrors.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for HeadlessMirror {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone, Copy)]
struct FrameRenderer {
    metrics: DisplayMetrics,
    row_padding_px: u32,
    format: PixelFormat,
}

impl FrameRenderer {
    fn render(&self, sequence: u64) -> RawFrame {
        let width = self.metrics.width;
        let height = self.metrics.height;
        let pixel_stride = self.format.bytes_per_pixel();
        let row_stride = (width + self.row_padding_px) * pixel_stride;

        let mut data = vec![0xFFu8; (row_stride * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let offset = (y * row_stride + x * pixel_stride) as usize;
                let rgba = [x as u8, y as u8, 0x80, 0xFF];
                let pixel = match self.format {
                    PixelFormat::Rgba8 => rgba,
                    PixelFormat::Bgra8 => [rgba[2], rgba[1], rgba[0], rgba[3]],
                };
                data[offset..offset + 4].copy_from_slice(&pixel);
            }
        }

        RawFrame {
            data: Bytes::from(data),
            width,
            height,
            pixel_stride,
            row_stride,
            format: self.format,
            timestamp: Instant::now(),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RESULT_CANCELED, SurfaceConfig};

    fn small_config() -> HeadlessConfig {
        HeadlessConfig {
            metrics: DisplayMetrics::new(12, 6, 160),
            row_padding_px: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_denied_grant_rejected() {
        let projector = HeadlessProjector::new(small_config());
        let grant = CaptureGrant::new(RESULT_CANCELED, Uuid::new_v4());
        assert!(matches!(
            projector.open_projection(grant),
            Err(CaptureError::GrantInvalid(_))
        ));
    }

    #[test]
    fn test_grant_redeemed_only_once() {
        let projector = HeadlessProjector::new(small_config());
        let token = Uuid::new_v4();
        assert!(
            projector
                .open_projection(CaptureGrant::new(crate::RESULT_OK, token))
                .is_ok()
        );
        assert!(matches!(
            projector.open_projection(CaptureGrant::new(crate::RESULT_OK, token)),
            Err(CaptureError::GrantInvalid(_))
        ));
    }

    #[test]
    fn test_immediate_mirror_fills_surface() {
        let projector = HeadlessProjector::new(small_config());
        let metrics = projector.display_metrics().unwrap();
        let mut projection = projector.open_projection(CaptureGrant::approved()).unwrap();

        let surface = Arc::new(
            CaptureSurface::new(SurfaceConfig::new(metrics.width, metrics.height)).unwrap(),
        );
        let mut mirror = projection.create_mirror(surface.clone(), metrics).unwrap();
        assert_eq!(projector.probe().live_mirrors(), 1);

        let frame = surface.acquire_latest().unwrap();
        assert_eq!(frame.sequence, 1);
        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (12, 6));
        assert_eq!(image.get_pixel(11, 5).0, [11, 5, 0x80, 0xFF]);

        mirror.release();
        mirror.release();
        assert_eq!(projector.probe().live_mirrors(), 0);

        projection.stop();
        assert_eq!(projector.probe().projections_open(), 0);
    }

    #[test]
    fn test_failing_mirror() {
        let projector = HeadlessProjector::new(small_config());
        projector.set_fail_mirror(true);
        let metrics = projector.display_metrics().unwrap();
        let mut projection = projector.open_projection(CaptureGrant::approved()).unwrap();
        let surface = Arc::new(CaptureSurface::new(SurfaceConfig::new(12, 6)).unwrap());

        assert!(matches!(
            projection.create_mirror(surface, metrics),
            Err(CaptureError::MirrorBindFailed(_))
        ));
        assert_eq!(projector.probe().live_mirrors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_delivery() {
        let projector = HeadlessProjector::new(small_config());
        projector.set_delivery(FrameDelivery::Delayed(Duration::from_millis(500)));
        let metrics = projector.display_metrics().unwrap();
        let mut projection = projector.open_projection(CaptureGrant::approved()).unwrap();
        let surface = Arc::new(CaptureSurface::new(SurfaceConfig::new(12, 6)).unwrap());

        let _mirror = projection.create_mirror(surface.clone(), metrics).unwrap();
        assert!(surface.acquire_latest().is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(surface.acquire_latest().is_ok());
    }
}
