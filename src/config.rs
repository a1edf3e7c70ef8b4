use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the replication engine. All durations are stored as whole
/// seconds so the on-disk `sync.json` stays hand-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the central remote store, e.g. "http://hq.example.com:8000"
    pub remote_url: String,
    /// host:port dialed for the generic network reachability check
    pub probe_target: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval_secs: u64,
    #[serde(default = "default_reconcile_delay")]
    pub reconcile_delay_secs: u64,
    /// Recurring remote-to-local pull; disabled when absent.
    #[serde(default)]
    pub reconcile_interval_secs: Option<u64>,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_dispatch_interval() -> u64 {
    30
}

fn default_reconcile_delay() -> u64 {
    5
}

fn default_batch_size() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            remote_url: "http://localhost:8000".to_string(),
            probe_target: "8.8.8.8:53".to_string(),
            probe_timeout_secs: default_probe_timeout(),
            dispatch_interval_secs: default_dispatch_interval(),
            reconcile_delay_secs: default_reconcile_delay(),
            reconcile_interval_secs: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from `{data_dir}/sync.json`, or fall back to
    /// environment variables and defaults.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let sync_json = data_dir.join("sync.json");

        if sync_json.exists() {
            match std::fs::read_to_string(&sync_json) {
                Ok(content) => match serde_json::from_str::<SyncConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded sync config: remote={}, dispatch every {}s",
                            config.remote_url,
                            config.dispatch_interval_secs
                        );
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse sync.json: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read sync.json: {}, using defaults", e);
                }
            }
        }

        let mut config = SyncConfig::default();
        if let Ok(url) = std::env::var("PACKHORSE_REMOTE_URL") {
            config.remote_url = url;
        }
        if let Ok(target) = std::env::var("PACKHORSE_PROBE_TARGET") {
            config.probe_target = target;
        }

        tracing::info!(
            "No sync.json found, using defaults: remote={}",
            config.remote_url
        );

        config
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_secs(self.reconcile_delay_secs)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        self.reconcile_interval_secs.map(Duration::from_secs)
    }
}
