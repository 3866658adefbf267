//! The UI-affinity loop
//!
//! One task owns the session, the overlay and every timer. Touches, panel
//! actions, timer expiries and pass completions all arrive as
//! [`UiMessage`]s and are handled in order, so no widget is ever touched
//! from another task.

use encoder::{EncoderConfig, FrameEncoder, PngFrameEncoder};
use overlay::{
    CountdownStep, DetachMode, OverlayLayout, OverlaySurface, TouchOutcome, WidgetKind,
};
use parking_lot::RwLock;
use shared_protocol::{
    BridgeEvent, CaptureOrigin, CaptureRecord, OUTPUT_MIME_TYPE, PanelAction, SessionMode,
    SessionState, TouchEvent,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::platform::Platform;
use crate::sequencer::{self, CapturePass, PassError, PassLatch, PassReport};
use crate::session::{SessionError, SessionManager, SessionRequest, SessionResult};
use crate::timers::{TimerSlot, Timers};

const COMPLETION_CAPACITY: usize = 16;

/// Everything the service loop reacts to
#[derive(Debug)]
pub enum UiMessage {
    Touch(TouchEvent),
    /// Programmatic equivalent of tapping the control
    Capture,
    PanelAction(PanelAction),
    StartTimer(u32),
    UpdateSound(bool),
    TimerFired {
        slot: TimerSlot,
        ticket: u64,
    },
    PassFinished {
        pass_id: u64,
        outcome: Result<CaptureRecord, PassError>,
    },
    Status(oneshot::Sender<ServiceStatus>),
    Stop {
        ack: Option<oneshot::Sender<()>>,
    },
}

/// Snapshot of the loop's state
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub state: SessionState,
    pub mode: SessionMode,
    pub capturing: bool,
    pub sound_enabled: bool,
    /// `None` when there is no primary control
    pub control_visible: Option<bool>,
    pub widgets: Vec<WidgetKind>,
    pub countdown: Option<u32>,
    pub panel: Option<CaptureRecord>,
    pub has_surface: bool,
    pub has_mirror: bool,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<UiMessage>,
    state: Arc<RwLock<SessionState>>,
    completions: broadcast::Sender<PassReport>,
}

impl ServiceHandle {
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    pub fn touch(&self, event: TouchEvent) {
        self.send(UiMessage::Touch(event));
    }

    pub fn capture(&self) {
        self.send(UiMessage::Capture);
    }

    pub fn panel_action(&self, action: PanelAction) {
        self.send(UiMessage::PanelAction(action));
    }

    /// Run a countdown inside this session, reusing its grant
    pub fn start_timer(&self, seconds: u32) {
        self.send(UiMessage::StartTimer(seconds));
    }

    pub fn update_sound(&self, enabled: bool) {
        self.send(UiMessage::UpdateSound(enabled));
    }

    /// `None` once the session has stopped
    pub async fn status(&self) -> Option<ServiceStatus> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(UiMessage::Status(tx)).is_err() {
            return None;
        }
        rx.await.ok()
    }

    /// Stop the session and wait until every resource is released
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(UiMessage::Stop { ack: Some(tx) }).is_err() {
            return;
        }
        let _ = rx.await;
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<PassReport> {
        self.completions.subscribe()
    }

    fn send(&self, message: UiMessage) {
        if self.tx.send(message).is_err() {
            debug!("Session already stopped, dropping message");
        }
    }
}

/// Pass in flight
struct ActivePass {
    id: u64,
    origin: CaptureOrigin,
    latch: PassLatch,
    task: Option<JoinHandle<()>>,
}

pub struct Service {
    config: ServiceConfig,
    platform: Platform,
    encoder: Arc<dyn FrameEncoder>,
    session: SessionManager,
    overlay: OverlaySurface,
    timers: Timers,
    pass: Option<ActivePass>,
    next_pass_id: u64,
    tx: mpsc::UnboundedSender<UiMessage>,
    events: broadcast::Sender<BridgeEvent>,
    completions: broadcast::Sender<PassReport>,
    stopped: bool,
}

impl Service {
    /// Start a session and its loop on `runtime`.
    ///
    /// On-screen sessions attach the primary control before returning;
    /// timer sessions start their countdown as the first message.
    pub fn spawn(
        runtime: &Handle,
        config: ServiceConfig,
        platform: Platform,
        events: broadcast::Sender<BridgeEvent>,
        request: SessionRequest,
    ) -> SessionResult<ServiceHandle> {
        let mode = request.mode;
        let mut session = SessionManager::start(
            platform.projector.as_ref(),
            platform.indicator.clone(),
            request,
            config.surface_buffers,
        )?;

        let layout = OverlayLayout::new(session.metrics());
        let mut overlay = OverlaySurface::new(
            layout,
            config.drag_threshold_px,
            platform.overlay.create_layer(),
        );

        if mode == SessionMode::OnScreen {
            if let Err(e) = overlay.show_control() {
                error!("Failed to attach capture control: {}", e);
                session.stop();
                return Err(SessionError::Overlay(e));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (completions, _) = broadcast::channel(COMPLETION_CAPACITY);
        let handle = ServiceHandle {
            tx: tx.clone(),
            state: session.state_handle(),
            completions: completions.clone(),
        };

        if let SessionMode::Timer { seconds } = mode {
            let _ = tx.send(UiMessage::StartTimer(seconds));
        }

        let service = Service {
            encoder: Arc::new(PngFrameEncoder::new(EncoderConfig::default())),
            timers: Timers::new(tx.clone()),
            config,
            platform,
            session,
            overlay,
            pass: None,
            next_pass_id: 1,
            tx,
            events,
            completions,
            stopped: false,
        };

        // Timers spawn from inside the loop, so it must run on `runtime`
        runtime.spawn(service.run(rx));
        Ok(handle)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<UiMessage>) {
        info!("Service loop started ({:?})", self.session.mode());

        while let Some(message) = rx.recv().await {
            self.handle(message);
            if self.stopped {
                break;
            }
        }

        info!("Service loop ended");
    }

    fn handle(&mut self, message: UiMessage) {
        match message {
            UiMessage::Touch(event) => self.on_touch(event),
            UiMessage::Capture => self.begin_pass(CaptureOrigin::Control),
            UiMessage::PanelAction(action) => self.on_panel_action(action),
            UiMessage::StartTimer(seconds) => self.start_countdown(seconds),
            UiMessage::UpdateSound(enabled) => self.session.update_sound(enabled),
            UiMessage::TimerFired { slot, ticket } => {
                if self.timers.take_fired(slot, ticket) {
                    self.on_timer(slot);
                } else {
                    debug!(?slot, ticket, "Stale timer ignored");
                }
            }
            UiMessage::PassFinished { pass_id, outcome } => {
                if self.pass.as_ref().is_some_and(|pass| pass.id == pass_id) {
                    self.finish_pass(outcome);
                } else {
                    debug!(pass = pass_id, "Ignoring late pass completion");
                }
            }
            UiMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            UiMessage::Stop { ack } => {
                self.stop();
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }
    }

    fn on_timer(&mut self, slot: TimerSlot) {
        match slot {
            TimerSlot::HideSettle => self.grab(),
            TimerSlot::Watchdog => self.on_watchdog(),
            TimerSlot::PanelAutoHide => {
                debug!("Result panel timed out");
                self.overlay.hide_panel(DetachMode::Animated);
            }
            TimerSlot::CountdownTick => self.tick_countdown(),
            TimerSlot::CountdownSettle => self.begin_pass(CaptureOrigin::Timer),
            TimerSlot::TimerTeardown => {
                info!("Timer session complete");
                self.stop();
            }
        }
    }

    // ---- input ----------------------------------------------------------

    fn on_touch(&mut self, event: TouchEvent) {
        match self.overlay.on_touch(event) {
            TouchOutcome::Tap => self.begin_pass(CaptureOrigin::Control),
            TouchOutcome::Dismiss => {
                info!("Control dropped on dismiss zone");
                self.stop();
            }
            TouchOutcome::Tracking | TouchOutcome::Ignored => {}
        }
    }

    fn on_panel_action(&mut self, action: PanelAction) {
        let Some(panel) = self.overlay.hide_panel(DetachMode::Animated) else {
            debug!("No result panel for {:?}", action);
            return;
        };
        self.timers.cancel(TimerSlot::PanelAutoHide);

        let location = panel.record().location();
        let launcher = &self.platform.launcher;
        match action {
            PanelAction::Share => {
                if let Err(e) = launcher.share(location, OUTPUT_MIME_TYPE) {
                    warn!("Share failed: {}", e);
                    launcher.toast("Unable to share screenshot");
                }
            }
            PanelAction::Edit => {
                if let Err(e) = launcher.edit(location, OUTPUT_MIME_TYPE) {
                    debug!("No editor ({}), falling back to viewer", e);
                    if let Err(e) = launcher.view(location, OUTPUT_MIME_TYPE) {
                        warn!("View failed: {}", e);
                        launcher.toast("No app available to open screenshot");
                    }
                }
            }
            PanelAction::Dismiss => {}
        }
    }

    // ---- countdown ------------------------------------------------------

    fn start_countdown(&mut self, seconds: u32) {
        if self.pass.is_some() || self.overlay.countdown_remaining().is_some() {
            debug!("Capture in progress, countdown request ignored");
            return;
        }

        info!("Starting {}s countdown", seconds);
        if self.overlay.has_control() {
            self.overlay.set_control_visible(false);
        }
        if self.overlay.start_countdown(seconds) {
            self.timers
                .schedule(TimerSlot::CountdownTick, self.config.countdown_tick());
        } else {
            self.restore_control();
        }
    }

    fn tick_countdown(&mut self) {
        match self.overlay.tick_countdown() {
            Some(CountdownStep::Show(n)) => {
                debug!("Countdown {}", n);
                self.timers
                    .schedule(TimerSlot::CountdownTick, self.config.countdown_tick());
            }
            Some(CountdownStep::Finished) => {
                self.timers
                    .schedule(TimerSlot::CountdownSettle, self.config.countdown_settle());
            }
            None => {}
        }
    }

    // ---- capture pass ---------------------------------------------------

    fn begin_pass(&mut self, origin: CaptureOrigin) {
        if self.pass.is_some() {
            debug!("Capture already in progress, ignoring {:?} trigger", origin);
            return;
        }
        if self.overlay.countdown_remaining().is_some() {
            debug!("Countdown running, ignoring {:?} trigger", origin);
            return;
        }

        let id = self.next_pass_id;
        self.next_pass_id += 1;
        info!(pass = id, "Capture pass started ({:?})", origin);

        self.session.set_state(SessionState::Capturing);
        self.pass = Some(ActivePass {
            id,
            origin,
            latch: PassLatch::new(),
            task: None,
        });

        if self.overlay.hide_panel(DetachMode::Immediate).is_some() {
            self.timers.cancel(TimerSlot::PanelAutoHide);
        }
        if self.session.sound_enabled() {
            self.platform.shutter.play();
        }

        match origin {
            CaptureOrigin::Control => {
                self.overlay.set_control_visible(false);
                self.timers
                    .schedule(TimerSlot::HideSettle, self.config.hide_settle());
            }
            // the countdown settle already covered the compositor delay
            CaptureOrigin::Timer => self.grab(),
        }
    }

    /// Recreate the surface, arm the frame future, bind the mirror and hand
    /// the rest of the pass to the sequencer
    fn grab(&mut self) {
        let Some((id, latch)) = self.pass.as_ref().map(|p| (p.id, p.latch.clone())) else {
            return;
        };

        self.timers
            .schedule(TimerSlot::Watchdog, self.config.watchdog());

        let surface = match self.session.recreate_surface() {
            Ok(surface) => surface,
            Err(e) => return self.abort_on_resource_failure(e),
        };
        let frame_ready = sequencer::arm(&surface);
        if let Err(e) = self.session.bind_mirror() {
            return self.abort_on_resource_failure(e);
        }

        let job = CapturePass {
            id,
            surface,
            encoder: self.encoder.clone(),
            storage: self.platform.storage.clone(),
            save_to_gallery: self.session.save_to_gallery(),
            latch,
        };
        let task = tokio::spawn(job.run(frame_ready, self.tx.clone()));
        if let Some(pass) = self.pass.as_mut() {
            pass.task = Some(task);
        }
    }

    fn on_watchdog(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        if !pass.latch.claim() {
            // sequencer claimed and posted in one step; its report is queued
            debug!(pass = pass.id, "Watchdog expired after completion was claimed");
            return;
        }

        warn!(pass = pass.id, "Watchdog expired, restoring control");
        if let Some(task) = &pass.task {
            task.abort();
        }
        self.finish_pass(Err(PassError::TimedOut));
    }

    /// The single exit of every pass: release per-pass resources, restore
    /// the control, report exactly once
    fn finish_pass(&mut self, outcome: Result<CaptureRecord, PassError>) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        self.timers.cancel(TimerSlot::Watchdog);
        self.timers.cancel(TimerSlot::HideSettle);
        if let Some(task) = pass.task {
            task.abort();
        }

        self.session.release_pass_resources();
        self.session.set_state(SessionState::Active);
        self.restore_control();

        let result = match outcome {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(pass = pass.id, "Capture pass produced no result: {}", e);
                None
            }
        };

        if let Some(record) = &result {
            self.overlay.show_panel(record.clone());
            self.timers
                .schedule(TimerSlot::PanelAutoHide, self.config.panel_auto_hide());
        }
        if self.session.mode().is_timer() {
            self.timers
                .schedule(TimerSlot::TimerTeardown, self.config.timer_teardown());
        }

        info!(pass = pass.id, success = result.is_some(), "Capture pass finished");
        let _ = self.completions.send(PassReport {
            pass_id: pass.id,
            origin: pass.origin,
            result,
        });
    }

    fn restore_control(&mut self) {
        if self.overlay.has_control() && self.overlay.countdown_remaining().is_none() {
            self.overlay.set_control_visible(true);
        }
    }

    /// Mirror or surface allocation failed: end the pass, tell the host and
    /// stop the session
    fn abort_on_resource_failure(&mut self, e: SessionError) {
        error!("Capture resources unavailable: {}", e);
        if let Some(pass) = &self.pass {
            pass.latch.claim();
        }
        self.finish_pass(Err(PassError::MirrorBindFailed));
        let _ = self.events.send(BridgeEvent::error(e.to_string()));
        self.stop();
    }

    // ---- teardown -------------------------------------------------------

    /// Release grant, surface, mirror and widgets in one synchronous pass
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.timers.cancel_all();
        if let Some(pass) = self.pass.take() {
            pass.latch.claim();
            if let Some(task) = pass.task {
                task.abort();
            }
            debug!(pass = pass.id, "{}", PassError::Cancelled);
            let _ = self.completions.send(PassReport {
                pass_id: pass.id,
                origin: pass.origin,
                result: None,
            });
        }

        self.session.stop();
        self.overlay.detach_all();
        let _ = self.events.send(BridgeEvent::CaptureStopped);
    }

    fn status(&self) -> ServiceStatus {
        ServiceStatus {
            state: self.session.state(),
            mode: self.session.mode(),
            capturing: self.pass.is_some(),
            sound_enabled: self.session.sound_enabled(),
            control_visible: self.overlay.control_visible(),
            widgets: self.overlay.attached(),
            countdown: self.overlay.countdown_remaining(),
            panel: self.overlay.panel().map(|panel| panel.record().clone()),
            has_surface: self.session.has_surface(),
            has_mirror: self.session.has_mirror(),
        }
    }
}
