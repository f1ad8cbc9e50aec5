//! HTTP persistence gateway — a single endpoint that serves the state
//! document on `GET` and replaces it on `POST`.
//!
//! `404` on `GET` means nothing is stored yet. Any other non-success status
//! is reported as [`PersistenceError::Rejected`].

use async_trait::async_trait;
use labeler_core::error::PersistenceError;
use labeler_core::persistence::{PersistedState, PersistenceGateway};
use std::time::Duration;
use tracing::{debug, warn};

/// A persistence gateway talking to a remote JSON endpoint.
pub struct HttpGateway {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersistenceError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            warn!(status, endpoint = %self.endpoint, "State endpoint refused load");
            return Err(PersistenceError::Rejected { status_code: status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let state = PersistedState::from_json(&body)?;
        debug!(endpoint = %self.endpoint, users = state.users.len(), "State fetched");
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(state)
            .send()
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(PersistenceError::Rejected { status_code: status });
        }

        debug!(endpoint = %self.endpoint, status, "State posted");
        Ok(())
    }
}
