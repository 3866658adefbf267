//! In-memory window layer that records every call

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::{DetachMode, OverlayError, OverlayResult, WidgetKind, WidgetState, WindowLayer};

/// One call made against the layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOp {
    Attach(WidgetState),
    Update(WidgetState),
    Detach(WidgetKind, DetachMode),
}

impl LayerOp {
    pub fn kind(&self) -> WidgetKind {
        match self {
            LayerOp::Attach(widget) | LayerOp::Update(widget) => widget.kind,
            LayerOp::Detach(kind, _) => *kind,
        }
    }
}

#[derive(Debug)]
struct LayerLog {
    ops: Vec<LayerOp>,
    attached: BTreeMap<WidgetKind, WidgetState>,
    rejected: HashSet<WidgetKind>,
    can_draw: bool,
}

/// [`WindowLayer`] for headless runs. Clones share the same log.
#[derive(Debug, Clone)]
pub struct RecordingLayer {
    log: Arc<Mutex<LayerLog>>,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(LayerLog {
                ops: Vec::new(),
                attached: BTreeMap::new(),
                rejected: HashSet::new(),
                can_draw: true,
            })),
        }
    }

    pub fn ops(&self) -> Vec<LayerOp> {
        self.log.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.log.lock().ops.clear();
    }

    /// Number of recorded calls touching `kind` that match `filter`
    pub fn count(&self, kind: WidgetKind, filter: impl Fn(&LayerOp) -> bool) -> usize {
        self.log
            .lock()
            .ops
            .iter()
            .filter(|op| op.kind() == kind && filter(op))
            .count()
    }

    pub fn attached(&self, kind: WidgetKind) -> Option<WidgetState> {
        self.log.lock().attached.get(&kind).cloned()
    }

    pub fn attached_kinds(&self) -> Vec<WidgetKind> {
        self.log.lock().attached.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().attached.is_empty()
    }

    /// Make every attach of `kind` fail
    pub fn reject(&self, kind: WidgetKind) {
        self.log.lock().rejected.insert(kind);
    }

    pub fn set_can_draw(&self, can_draw: bool) {
        self.log.lock().can_draw = can_draw;
    }
}

impl Default for RecordingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowLayer for RecordingLayer {
    fn can_draw_overlays(&self) -> bool {
        self.log.lock().can_draw
    }

    fn attach(&mut self, widget: &WidgetState) -> OverlayResult<()> {
        let mut log = self.log.lock();
        if log.rejected.contains(&widget.kind) {
            return Err(OverlayError::Rejected {
                kind: widget.kind,
                reason: "window token rejected".into(),
            });
        }
        log.ops.push(LayerOp::Attach(widget.clone()));
        log.attached.insert(widget.kind, widget.clone());
        Ok(())
    }

    fn update(&mut self, widget: &WidgetState) -> OverlayResult<()> {
        let mut log = self.log.lock();
        if !log.attached.contains_key(&widget.kind) {
            return Err(OverlayError::NotAttached(widget.kind));
        }
        log.ops.push(LayerOp::Update(widget.clone()));
        log.attached.insert(widget.kind, widget.clone());
        Ok(())
    }

    fn detach(&mut self, kind: WidgetKind, mode: DetachMode) -> OverlayResult<()> {
        let mut log = self.log.lock();
        if log.attached.remove(&kind).is_none() {
            return Err(OverlayError::NotAttached(kind));
        }
        log.ops.push(LayerOp::Detach(kind, mode));
        Ok(())
    }
}
