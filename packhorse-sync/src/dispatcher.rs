//! Background task that drains the outbox toward the remote store.
//!
//! On each tick: probe connectivity (no-op when unreachable), fetch a bounded
//! batch of pending entries, replay each against the remote store, and record
//! the per-entry outcome. One entry's failure never aborts the batch, and the
//! dispatcher has no return path to whatever enqueued the entry.

use crate::task::TaskHandle;
use packhorse::outbox::Operation;
use packhorse::{ConnectivityProbe, LocalStore, Outbox, RemoteStore, SyncConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

/// Outcome of a single drain pass, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub synced: usize,
    pub failed: usize,
    /// True when the probe said the remote was unreachable and nothing was
    /// attempted.
    pub skipped_offline: bool,
}

pub struct SyncDispatcher {
    outbox: Outbox,
    remote: Arc<RemoteStore>,
    probe: Arc<ConnectivityProbe>,
    interval: Duration,
    batch_size: u32,
}

impl SyncDispatcher {
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<RemoteStore>,
        probe: Arc<ConnectivityProbe>,
        config: &SyncConfig,
    ) -> Self {
        SyncDispatcher {
            outbox: Outbox::new(local, config.max_retries),
            remote,
            probe,
            interval: config.dispatch_interval(),
            batch_size: config.batch_size,
        }
    }

    /// One drain pass. Public so callers can force a drain outside the timer,
    /// notably right before a reconciliation pass.
    pub async fn drain_once(&self) -> DrainReport {
        if !self.probe.is_remote_available().await {
            tracing::debug!("[SYNC] remote unreachable, skipping drain");
            return DrainReport {
                skipped_offline: true,
                ..DrainReport::default()
            };
        }

        let batch = match self.outbox.next_batch(self.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("[SYNC] failed to read outbox batch: {}", e);
                return DrainReport::default();
            }
        };

        let mut report = DrainReport::default();
        for entry in batch {
            let result = match &entry.op {
                Operation::Create(p) | Operation::Update(p) => self.remote.upsert(p).await,
                Operation::Delete { id } => self.remote.delete(*id).await,
            };

            match result {
                Ok(()) => {
                    if let Err(e) = self.outbox.mark_synced(entry.id) {
                        tracing::error!(
                            "[SYNC] replayed entry {} but could not mark it: {}",
                            entry.id,
                            e
                        );
                        continue;
                    }
                    tracing::info!(
                        "[SYNC] entry {} ({} record {}) synced",
                        entry.id,
                        entry.op.kind(),
                        entry.op.record_id()
                    );
                    report.synced += 1;
                }
                Err(e) => {
                    if let Err(e) = self.outbox.increment_retry(entry.id) {
                        tracing::error!(
                            "[SYNC] could not record retry for entry {}: {}",
                            entry.id,
                            e
                        );
                        continue;
                    }
                    tracing::warn!(
                        "[SYNC] entry {} ({} record {}) failed, attempt {}: {}",
                        entry.id,
                        entry.op.kind(),
                        entry.op.record_id(),
                        entry.retry_count + 1,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Spawn the timer-driven drain loop. The first drain happens one full
    /// interval after start.
    pub fn start(self: &Arc<Self>) -> TaskHandle {
        let dispatcher = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker =
                interval_at(Instant::now() + dispatcher.interval, dispatcher.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        dispatcher.drain_once().await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("[SYNC] dispatcher stopped");
                        break;
                    }
                }
            }
        });

        TaskHandle::new(shutdown_tx, task)
    }
}
