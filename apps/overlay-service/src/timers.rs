//! Cancelable deferred callbacks for the service loop
//!
//! Each slot holds at most one pending timer. Firing posts a message back
//! into the loop; a message whose ticket is no longer current was canceled
//! or replaced and must be dropped.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::service::UiMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Control hidden, waiting for the compositor before the grab
    HideSettle,
    /// Bounds a pass from mirror bind to persist
    Watchdog,
    PanelAutoHide,
    CountdownTick,
    /// Countdown gone, waiting before the pass
    CountdownSettle,
    /// Timer-mode session end
    TimerTeardown,
}

struct Pending {
    ticket: u64,
    task: JoinHandle<()>,
}

pub struct Timers {
    tx: UnboundedSender<UiMessage>,
    pending: HashMap<TimerSlot, Pending>,
    next_ticket: u64,
}

impl Timers {
    pub fn new(tx: UnboundedSender<UiMessage>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
            next_ticket: 1,
        }
    }

    /// Arm `slot`, replacing whatever was pending there
    pub fn schedule(&mut self, slot: TimerSlot, delay: Duration) -> u64 {
        self.cancel(slot);

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(UiMessage::TimerFired { slot, ticket });
        });
        trace!(?slot, ticket, "Timer armed for {:?}", delay);

        self.pending.insert(slot, Pending { ticket, task });
        ticket
    }

    pub fn cancel(&mut self, slot: TimerSlot) {
        if let Some(pending) = self.pending.remove(&slot) {
            pending.task.abort();
            trace!(?slot, ticket = pending.ticket, "Timer canceled");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.task.abort();
        }
    }

    pub fn is_pending(&self, slot: TimerSlot) -> bool {
        self.pending.contains_key(&slot)
    }

    /// Accept a fired timer. False when it was canceled or replaced.
    pub fn take_fired(&mut self, slot: TimerSlot, ticket: u64) -> bool {
        match self.pending.get(&slot) {
            Some(pending) if pending.ticket == ticket => {
                self.pending.remove(&slot);
                true
            }
            _ => false,
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn next_fired(rx: &mut mpsc::UnboundedReceiver<UiMessage>) -> (TimerSlot, u64) {
        match rx.recv().await {
            Some(UiMessage::TimerFired { slot, ticket }) => (slot, ticket),
            _ => panic!("expected a timer message"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);
        let start = tokio::time::Instant::now();

        let ticket = timers.schedule(TimerSlot::Watchdog, Duration::from_millis(3000));
        let (slot, fired) = next_fired(&mut rx).await;

        assert_eq!(slot, TimerSlot::Watchdog);
        assert_eq!(fired, ticket);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert!(timers.take_fired(slot, fired));
        assert!(!timers.is_pending(TimerSlot::Watchdog));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_supersedes_old_ticket() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        let old = timers.schedule(TimerSlot::PanelAutoHide, Duration::from_millis(100));
        let new = timers.schedule(TimerSlot::PanelAutoHide, Duration::from_millis(500));

        let (slot, fired) = next_fired(&mut rx).await;
        assert_eq!(fired, new);
        assert!(!timers.take_fired(slot, old));
        assert!(timers.take_fired(slot, new));
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.schedule(TimerSlot::CountdownTick, Duration::from_millis(1000));
        timers.cancel(TimerSlot::CountdownTick);
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert!(rx.try_recv().is_err());
    }
}
