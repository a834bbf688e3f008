//! Trigger loop (C7)
//!
//! Merges the three cycle triggers into one stream of cycle requests:
//!
//! 1. the periodic sync interval,
//! 2. settled (debounced) filesystem change events,
//! 3. manual "sync now" requests.
//!
//! Requests go into a capacity-1 channel via `try_send`; when a request is
//! already pending the new one is dropped. Together with the engine's
//! single-flight guard this collapses trigger bursts into at most one
//! follow-up cycle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

/// A request to start a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRequest;

/// Cloneable handle for posting manual sync requests
#[derive(Clone)]
pub struct SchedulerHandle {
    cycle_tx: mpsc::Sender<CycleRequest>,
}

impl SchedulerHandle {
    /// Requests an immediate cycle, bypassing the debounce window
    ///
    /// Silently drops the request when one is already pending.
    pub fn request_sync(&self) {
        if self.cycle_tx.try_send(CycleRequest).is_err() {
            debug!("cycle request already pending, dropping manual trigger");
        }
    }
}

/// Schedules sync cycles from watcher events, a periodic timer, and manual
/// requests
pub struct SyncScheduler {
    change_rx: mpsc::Receiver<ChangeEvent>,
    queue: DebouncedChangeQueue,
    cycle_tx: mpsc::Sender<CycleRequest>,
    poll_interval: Duration,
    sync_interval: Duration,
    shutdown: CancellationToken,
}

impl SyncScheduler {
    /// Creates a scheduler
    ///
    /// Returns the scheduler, the receiving end of the cycle-request channel
    /// (consumed by the daemon loop), and a handle for manual triggers.
    pub fn new(
        change_rx: mpsc::Receiver<ChangeEvent>,
        debounce: Duration,
        sync_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<CycleRequest>, SchedulerHandle) {
        let (cycle_tx, cycle_rx) = mpsc::channel(1);

        // Poll at half the debounce window so settled events are picked up
        // promptly, with a floor for very small debounce values.
        let poll_interval = Duration::from_secs_f64((debounce.as_secs_f64() / 2.0).max(0.25));

        info!(
            debounce_ms = debounce.as_millis() as u64,
            sync_interval_secs = sync_interval.as_secs(),
            "Creating sync scheduler"
        );

        let handle = SchedulerHandle {
            cycle_tx: cycle_tx.clone(),
        };
        let scheduler = Self {
            change_rx,
            queue: DebouncedChangeQueue::new(debounce),
            cycle_tx,
            poll_interval,
            sync_interval,
            shutdown,
        };

        (scheduler, cycle_rx, handle)
    }

    fn post_request(&self, reason: &str) {
        if self.cycle_tx.try_send(CycleRequest).is_ok() {
            debug!(reason, "cycle request posted");
        } else {
            debug!(reason, "cycle request already pending, dropped");
        }
    }

    /// Main event loop
    ///
    /// Runs until the shutdown token fires or the change channel closes.
    /// The periodic timer's first tick fires immediately so a freshly
    /// started daemon syncs right away.
    pub async fn run(&mut self) {
        info!("Sync scheduler starting");

        let mut poll_timer = tokio::time::interval(self.poll_interval);
        let mut sync_timer = tokio::time::interval(self.sync_interval);

        loop {
            tokio::select! {
                // Raw events from the watcher go into the debounce queue.
                event = self.change_rx.recv() => {
                    match event {
                        Some(change) => {
                            debug!(event = ?change, "scheduler received change event");
                            self.queue.push(change);
                        }
                        None => {
                            info!("Change channel closed, scheduler shutting down");
                            if !self.queue.poll().is_empty() {
                                self.post_request("flush on shutdown");
                            }
                            break;
                        }
                    }
                }

                // Settled events trigger a cycle.
                _ = poll_timer.tick() => {
                    let settled = self.queue.poll();
                    if !settled.is_empty() {
                        info!(count = settled.len(), "settled changes ready");
                        self.post_request("filesystem changes");
                    }
                }

                // Periodic polling cadence.
                _ = sync_timer.tick() => {
                    self.post_request("periodic interval");
                }

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, scheduler stopping");
                    break;
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
