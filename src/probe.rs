//! Connectivity detection.
//!
//! Two checks, both required: a short-timeout TCP dial to a well-known
//! host/port (generic network reachability), then an application-level
//! round-trip against the remote store itself. The probe never errors; any
//! failure reads as "unreachable". Callers rate-limit it themselves: once per
//! dispatch cycle and once per foreground write.

use crate::store::RemoteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

pub struct ConnectivityProbe {
    target: String,
    timeout: Duration,
    remote: Arc<RemoteStore>,
}

impl ConnectivityProbe {
    pub fn new(target: impl Into<String>, timeout: Duration, remote: Arc<RemoteStore>) -> Self {
        ConnectivityProbe {
            target: target.into(),
            timeout,
            remote,
        }
    }

    /// Generic network reachability: can we open a TCP connection to the
    /// configured well-known target within the timeout?
    pub async fn network_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.target.as_str())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Probe dial to {} failed: {}", self.target, e);
                false
            }
            Err(_) => {
                tracing::debug!("Probe dial to {} timed out", self.target);
                false
            }
        }
    }

    /// True only when both the network and the remote store answer. The
    /// blocking wait is bounded by the probe timeout.
    pub async fn is_remote_available(&self) -> bool {
        if !self.network_reachable().await {
            return false;
        }
        let up = self.remote.ping().await;
        if !up {
            tracing::debug!("Network reachable but remote store did not answer");
        }
        up
    }
}
