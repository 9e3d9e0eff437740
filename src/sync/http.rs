//! REST client for the training record table
//!
//! Posts the whole batch in one insert and reads back the created rows to
//! learn their remote ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RecordPayload, RemoteSink};
use crate::config::RemoteConfig;
use crate::errors::{Result, StoreError};

/// HTTP implementation of [`RemoteSink`]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

/// Row shape of the remote table
#[derive(Debug, Clone, PartialEq, Serialize)]
struct RemoteRow<'a> {
    user_id: &'a str,
    module_name: &'a str,
    difficulty: &'a str,
    score: f64,
    accuracy: f64,
    duration: u64,
    completed_at: DateTime<Utc>,
    details: &'a serde_json::Value,
}

impl<'a> RemoteRow<'a> {
    fn new(user_id: &'a str, payload: &'a RecordPayload) -> Self {
        Self {
            user_id,
            module_name: &payload.module_name,
            difficulty: &payload.difficulty,
            score: payload.score,
            accuracy: payload.accuracy,
            duration: payload.duration,
            completed_at: payload.completed_at,
            details: &payload.details,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: serde_json::Value,
}

impl HttpRemote {
    /// Create a client for `base_url` authenticated with the project api key
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        match (&config.base_url, &config.api_key) {
            (Some(url), Some(key)) => Self::new(url.clone(), key.clone(), config.timeout()),
            _ => Err(StoreError::ConfigError(
                "remote base_url and api_key are required for sync".to_string(),
            )),
        }
    }

    /// Use the signed-in user's token instead of the anonymous key
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/training_records", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RemoteSink for HttpRemote {
    async fn upload_batch(&self, user_id: &str, batch: &[RecordPayload]) -> Result<Vec<String>> {
        let rows: Vec<RemoteRow<'_>> = batch.iter().map(|p| RemoteRow::new(user_id, p)).collect();
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);

        debug!(count = rows.len(), url = %self.endpoint(), "uploading record batch");
        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", &self.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(bearer)
            .json(&rows)
            .send()
            .await
            .map_err(|e| StoreError::SyncFailure(format!("Failed to reach sync service: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::SyncFailure(format!(
                "sync service returned {}: {}",
                status, body
            )));
        }

        let inserted: Vec<InsertedRow> = response
            .json()
            .await
            .map_err(|e| StoreError::SyncFailure(format!("Failed to parse response: {}", e)))?;

        Ok(inserted.into_iter().map(|row| remote_id(row.id)).collect())
    }
}

fn remote_id(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
