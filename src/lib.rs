//! # Packhorse
//!
//! An offline-first dual-store replication engine. A field-deployed node
//! writes to a local SQLite store unconditionally and converges with a
//! central remote store once connectivity returns: writes never block on the
//! network, and the remote is healed in the background.
//!
//! The moving parts:
//!
//! - [`store::LocalStore`] — the always-available SQLite store, authoritative
//!   for every read.
//! - [`store::RemoteStore`] — HTTP client for the central store; mutations
//!   are upserts keyed by the locally assigned id, so replay is idempotent.
//! - [`probe::ConnectivityProbe`] — composed reachability check (TCP dial
//!   plus application round-trip), never errors.
//! - [`outbox::Outbox`] — durable queue of pending mutations, co-located with
//!   the data in the same SQLite database.
//! - [`repository::Repository`] — the CRUD facade: local commit, then an
//!   inline remote attempt or an outbox enqueue.
//!
//! The background machinery that drains the outbox and reconciles remote
//! state into the local store lives in the companion `packhorse-sync` crate.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use packhorse::{ConnectivityProbe, LocalStore, RemoteStore, Repository, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> packhorse::Result<()> {
//! let config = SyncConfig::load_or_default(std::path::Path::new("./data"));
//! let local = Arc::new(LocalStore::open(std::path::Path::new("./data/field.db"))?);
//! let remote = Arc::new(RemoteStore::new(&config.remote_url, config.probe_timeout()));
//! let probe = Arc::new(ConnectivityProbe::new(
//!     &config.probe_target,
//!     config.probe_timeout(),
//!     Arc::clone(&remote),
//! ));
//!
//! let repo = Repository::new(local, remote, probe, &config);
//! let projects = repo.list()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod outbox;
pub mod probe;
pub mod record;
pub mod repository;
pub mod store;

pub use config::SyncConfig;
pub use error::{PackhorseError, Result};
pub use outbox::{Operation, Outbox, OutboxEntry, OutboxStatus};
pub use probe::ConnectivityProbe;
pub use record::{DailyProjectCount, Project, ProjectStats, User};
pub use repository::Repository;
pub use store::{LocalStore, RemoteStore};
