//! The public CRUD surface consumed by the application layer.
//!
//! Writes are local-first: the mutation commits to the local store
//! synchronously, then the engine makes one opportunistic inline attempt
//! against the remote store if the probe says it is reachable, and otherwise
//! (or on any remote failure) enqueues the mutation to the outbox. A call that
//! returns `Ok` has durably applied the mutation locally; remote convergence
//! is strictly best-effort and asynchronous from the caller's perspective.
//!
//! Reads never consult the remote store.

use crate::config::SyncConfig;
use crate::error::{PackhorseError, Result};
use crate::outbox::{Operation, Outbox};
use crate::probe::ConnectivityProbe;
use crate::record::{Project, ProjectStats};
use crate::store::{LocalStore, RemoteStore};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct Repository {
    local: Arc<LocalStore>,
    remote: Arc<RemoteStore>,
    probe: Arc<ConnectivityProbe>,
    outbox: Outbox,
}

impl Repository {
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<RemoteStore>,
        probe: Arc<ConnectivityProbe>,
        config: &SyncConfig,
    ) -> Self {
        let outbox = Outbox::new(Arc::clone(&local), config.max_retries);
        Repository {
            local,
            remote,
            probe,
            outbox,
        }
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Create a project. The id on the argument is ignored; the local store
    /// assigns one and it is returned on the stored copy. The referenced user
    /// must already exist locally.
    pub async fn create(&self, project: Project) -> Result<Project> {
        if !self.local.user_exists(project.user_id)? {
            return Err(PackhorseError::MissingParent(project.user_id));
        }

        let stored = self.local.insert_project(&project)?;
        self.propagate(Operation::Create(stored.clone())).await?;
        Ok(stored)
    }

    /// Overwrite an existing project. Safe to call repeatedly with the same
    /// record; the media pipeline does exactly that once an upload URL lands.
    pub async fn update(&self, project: Project) -> Result<()> {
        if !self.local.project_exists(project.id)? {
            return Err(PackhorseError::NotFound(project.id));
        }

        self.local.update_project(&project)?;
        self.propagate(Operation::Update(project)).await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.local.project_exists(id)? {
            return Err(PackhorseError::NotFound(id));
        }

        self.local.delete_project(id)?;
        self.propagate(Operation::Delete { id }).await?;
        Ok(())
    }

    /// Remote leg of a write. The local mutation has already committed, so
    /// from here on nothing fails the caller: an unreachable remote routes to
    /// the outbox, and so does an inline attempt that is rejected. Only a
    /// failure to write the outbox itself (a local-store failure) propagates.
    async fn propagate(&self, op: Operation) -> Result<()> {
        if self.probe.is_remote_available().await {
            match self.apply_remote(&op).await {
                Ok(()) => {
                    tracing::info!(
                        "Record {} {} applied to both stores",
                        op.record_id(),
                        op.kind()
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        "Inline remote {} for record {} failed, enqueueing: {}",
                        op.kind(),
                        op.record_id(),
                        e
                    );
                }
            }
        } else {
            tracing::info!(
                "Remote unreachable, enqueueing {} for record {}",
                op.kind(),
                op.record_id()
            );
        }

        self.outbox.enqueue(&op)?;
        Ok(())
    }

    async fn apply_remote(&self, op: &Operation) -> Result<()> {
        match op {
            Operation::Create(p) | Operation::Update(p) => self.remote.upsert(p).await,
            Operation::Delete { id } => self.remote.delete(*id).await,
        }
    }

    // --- reads, served exclusively by the local store ---

    pub fn get(&self, id: i64) -> Result<Project> {
        self.local
            .get_project(id)?
            .ok_or(PackhorseError::NotFound(id))
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        self.local.list_projects()
    }

    pub fn find_by_name(&self, name: &str) -> Result<Vec<Project>> {
        self.local.find_by_name(name)
    }

    pub fn find_by_category(&self, category: &str) -> Result<Vec<Project>> {
        self.local.find_by_category(category)
    }

    pub fn find_by_user(&self, user_id: i64) -> Result<Vec<Project>> {
        self.local.find_by_user(user_id)
    }

    pub fn find_by_date(&self, recorded_on: NaiveDate) -> Result<Vec<Project>> {
        self.local.find_by_date(recorded_on)
    }

    pub fn count_by_user(&self, user_id: i64) -> Result<u64> {
        self.local.count_by_user(user_id)
    }

    /// Per-day project counts for a user over the last `days` days plus the
    /// derived total. A window of 0 means the default of 7 days.
    pub fn project_stats(&self, user_id: i64, days: u32) -> Result<ProjectStats> {
        let days = if days == 0 { 7 } else { days };
        let daily = self.local.project_stats(user_id, days)?;
        let total_count = daily.iter().map(|d| d.count).sum();
        Ok(ProjectStats {
            user_id,
            total_count,
            daily,
        })
    }
}
