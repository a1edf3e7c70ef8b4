//! Background task that pulls the remote store's current state into the local
//! store, bootstrapping an empty node and healing divergence.
//!
//! During a reconciliation pass the remote is authoritative: a record missing
//! locally is inserted verbatim, and a record whose business fields differ is
//! overwritten with the remote values. Local records absent from the remote
//! are left alone; tombstones never propagate from remote to local.

use packhorse::{ConnectivityProbe, LocalStore, RemoteStore};
use std::sync::Arc;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    /// True when the remote was unreachable and the pass was skipped. Not an
    /// error; the next pass will try again.
    pub skipped: bool,
}

pub struct Reconciler {
    local: Arc<LocalStore>,
    remote: Arc<RemoteStore>,
    probe: Arc<ConnectivityProbe>,
}

impl Reconciler {
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<RemoteStore>,
        probe: Arc<ConnectivityProbe>,
    ) -> Self {
        Reconciler {
            local,
            remote,
            probe,
        }
    }

    /// One full remote-to-local pass. Also serves as the manual "sync now"
    /// entry point.
    pub async fn run_once(&self) -> ReconcileSummary {
        if !self.probe.is_remote_available().await {
            tracing::info!("[RECON] remote unreachable, skipping reconciliation");
            return ReconcileSummary {
                skipped: true,
                ..ReconcileSummary::default()
            };
        }

        let records = match self.remote.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("[RECON] failed to fetch remote records: {}", e);
                return ReconcileSummary {
                    skipped: true,
                    ..ReconcileSummary::default()
                };
            }
        };

        let mut summary = ReconcileSummary::default();
        for remote_record in records {
            match self.local.get_project(remote_record.id) {
                Ok(None) => match self.local.insert_project_with_id(&remote_record) {
                    Ok(()) => {
                        tracing::info!("[RECON] record {} pulled from remote", remote_record.id);
                        summary.inserted += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[RECON] failed to insert record {}: {}",
                            remote_record.id,
                            e
                        );
                    }
                },
                Ok(Some(local_record)) => {
                    if local_record != remote_record {
                        match self.local.update_project(&remote_record) {
                            Ok(()) => {
                                tracing::info!(
                                    "[RECON] record {} overwritten from remote",
                                    remote_record.id
                                );
                                summary.updated += 1;
                            }
                            Err(e) => {
                                tracing::warn!(
                                    "[RECON] failed to overwrite record {}: {}",
                                    remote_record.id,
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "[RECON] local lookup of record {} failed: {}",
                        remote_record.id,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "[RECON] pass complete: {} inserted, {} updated",
            summary.inserted,
            summary.updated
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_skips_when_offline() {
        let local = Arc::new(LocalStore::open_in_memory().unwrap());
        let remote = Arc::new(RemoteStore::new(
            "http://127.0.0.1:9",
            Duration::from_millis(100),
        ));
        let probe = Arc::new(ConnectivityProbe::new(
            "127.0.0.1:9",
            Duration::from_millis(100),
            Arc::clone(&remote),
        ));

        let reconciler = Reconciler::new(local, remote, probe);
        let summary = reconciler.run_once().await;
        assert!(summary.skipped);
        assert_eq!(summary.inserted, 0);
    }
}
