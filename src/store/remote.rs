//! HTTP client for the central remote store.
//!
//! Remote mutations are keyed by the id already assigned locally: `upsert`
//! issues a `PUT /projects/{id}`, so replaying the same CREATE entry twice can
//! never create a duplicate on the remote side.

use crate::error::{PackhorseError, Result};
use crate::record::Project;
use std::time::Duration;

pub struct RemoteStore {
    base_url: String,
    http_client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        RemoteStore {
            base_url: base_url.into(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Application-level round-trip used by the connectivity probe. Any
    /// failure, including a non-2xx status, reads as "not available".
    pub async fn ping(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Insert-or-overwrite keyed by the record's pre-assigned id.
    pub async fn upsert(&self, project: &Project) -> Result<()> {
        let url = format!("{}/projects/{}", self.base_url, project.id);

        let response = self
            .http_client
            .put(&url)
            .json(project)
            .send()
            .await
            .map_err(|e| {
                PackhorseError::RemoteWrite(format!("Failed to send upsert to {}: {}", url, e))
            })?;

        if !response.status().is_success() {
            return Err(PackhorseError::RemoteWrite(format!(
                "Remote store rejected upsert of record {}: {}",
                project.id,
                response.status()
            )));
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let url = format!("{}/projects/{}", self.base_url, id);

        let response = self.http_client.delete(&url).send().await.map_err(|e| {
            PackhorseError::RemoteWrite(format!("Failed to send delete to {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(PackhorseError::RemoteWrite(format!(
                "Remote store rejected delete of record {}: {}",
                id,
                response.status()
            )));
        }

        Ok(())
    }

    /// Fetch the remote's full record listing, ordered by id. This is the
    /// reconciliation source.
    pub async fn fetch_all(&self) -> Result<Vec<Project>> {
        let url = format!("{}/projects", self.base_url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            PackhorseError::RemoteWrite(format!("Failed to fetch records from {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(PackhorseError::RemoteWrite(format!(
                "Remote store returned error on listing: {}",
                response.status()
            )));
        }

        response.json::<Vec<Project>>().await.map_err(|e| {
            PackhorseError::RemoteWrite(format!("Failed to parse record listing: {}", e))
        })
    }
}
