//! Background convergence machinery for packhorse.
//!
//! Two long-lived tasks run alongside the foreground request path:
//!
//! - [`dispatcher::SyncDispatcher`] wakes on a timer and replays pending
//!   outbox entries against the remote store.
//! - [`reconciler::Reconciler`] runs once after a startup grace delay (and
//!   optionally on a slower cadence) to pull the remote's state into the
//!   local store.
//!
//! [`start_background_sync`] wires both up. Whenever a reconciliation pass is
//! about to run, the outbox is drained first: a node that edited records
//! while offline pushes those edits before the remote snapshot is pulled in
//! the same connectivity window, which narrows the window in which
//! reconciliation could overwrite them.

pub mod dispatcher;
pub mod reconciler;
pub mod task;

pub use dispatcher::{DrainReport, SyncDispatcher};
pub use reconciler::{ReconcileSummary, Reconciler};
pub use task::TaskHandle;

use packhorse::{ConnectivityProbe, LocalStore, RemoteStore, SyncConfig};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

/// Handles to the running background tasks. Stop them before dropping the
/// store handles they borrow.
pub struct SyncHandles {
    pub dispatcher: TaskHandle,
    pub reconciler: TaskHandle,
}

impl SyncHandles {
    pub async fn stop(self) {
        self.reconciler.stop().await;
        self.dispatcher.stop().await;
    }
}

/// Start the dispatcher loop and the reconciler task.
///
/// The reconciler waits out `reconcile_delay` (letting network interfaces
/// settle after boot), drains the outbox once, runs a reconciliation pass,
/// and then repeats both on `reconcile_interval` if one is configured.
pub fn start_background_sync(
    local: Arc<LocalStore>,
    remote: Arc<RemoteStore>,
    probe: Arc<ConnectivityProbe>,
    config: &SyncConfig,
) -> SyncHandles {
    let dispatcher = Arc::new(SyncDispatcher::new(
        Arc::clone(&local),
        Arc::clone(&remote),
        Arc::clone(&probe),
        config,
    ));
    let reconciler = Arc::new(Reconciler::new(local, remote, probe));

    let dispatcher_handle = dispatcher.start();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let delay = config.reconcile_delay();
    let cadence = config.reconcile_interval();
    let drain_first = Arc::clone(&dispatcher);

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => return,
        }

        drain_first.drain_once().await;
        reconciler.run_once().await;

        let Some(every) = cadence else {
            return;
        };
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    drain_first.drain_once().await;
                    reconciler.run_once().await;
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("[RECON] reconciler stopped");
                    break;
                }
            }
        }
    });

    SyncHandles {
        dispatcher: dispatcher_handle,
        reconciler: TaskHandle::new(shutdown_tx, task),
    }
}
