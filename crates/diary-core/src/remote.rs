//! Remote document store client
//!
//! The shared record lives in a JSON document store with a two-call API:
//!
//! - `GET {base}/{code}/latest` → `{ "record": <document> }`, or 404 when
//!   the record was never created
//! - `PUT {base}/{code}` with the full document → replaces it wholesale
//!
//! Both calls authenticate with the `X-Master-Key` header.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{ApiKey, Config};
use crate::models::RemoteDocument;
use crate::sync::{NetworkError, SyncError, SyncResult};

/// Header carrying the store credential
pub const MASTER_KEY_HEADER: &str = "X-Master-Key";

/// Fetch/replace access to the shared remote record
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current remote document, `None` if it does not exist yet
    async fn fetch(&self, sync_code: &str) -> SyncResult<Option<RemoteDocument>>;

    /// Replace the remote document (creating it if absent)
    async fn push(&self, sync_code: &str, document: &RemoteDocument) -> SyncResult<()>;
}

/// Response body of a GET-latest call
#[derive(Deserialize)]
struct LatestEnvelope {
    record: RemoteDocument,
}

/// HTTP client for a JSONBin-compatible document store
pub struct JsonBinClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<ApiKey>,
    timeout: Duration,
}

impl JsonBinClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, api_key: Option<ApiKey>, timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("class-diary/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self::with_http(http, base_url, api_key, timeout))
    }

    /// Create a client on top of a preconfigured `reqwest::Client`
    ///
    /// `timeout` is only used for error reporting; the HTTP client is
    /// expected to enforce it.
    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<ApiKey>,
        timeout: Duration,
    ) -> Self {
        if api_key.is_none() {
            warn!("No API key configured for {}, requests will be unauthenticated", base_url);
        }

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Self::new(
            &config.sync_url,
            config.api_key.clone(),
            config.request_timeout(),
        )
    }

    fn record_url(&self, sync_code: &str) -> String {
        format!("{}/{}", self.base_url, sync_code)
    }

    fn latest_url(&self, sync_code: &str) -> String {
        format!("{}/latest", self.record_url(sync_code))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(MASTER_KEY_HEADER, key.expose()),
            None => request,
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            NetworkError::Timeout(self.timeout).into()
        } else {
            NetworkError::Transport(error.to_string()).into()
        }
    }
}

fn status_error(status: StatusCode) -> SyncError {
    NetworkError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
    .into()
}

#[async_trait]
impl RemoteStore for JsonBinClient {
    async fn fetch(&self, sync_code: &str) -> SyncResult<Option<RemoteDocument>> {
        let url = self.latest_url(sync_code);
        debug!("GET {}", url);

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Remote record {} does not exist yet", sync_code);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        let envelope: LatestEnvelope = serde_json::from_slice(&body).map_err(SyncError::Decode)?;
        Ok(Some(envelope.record))
    }

    async fn push(&self, sync_code: &str, document: &RemoteDocument) -> SyncResult<()> {
        let url = self.record_url(sync_code);
        debug!("PUT {}", url);

        let response = self
            .authorize(self.http.put(&url))
            .json(document)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(())
    }
}

/// In-process remote store
///
/// Holds records per sync code in memory. Useful for tests and for running
/// the diary without a network. Failures and latency can be injected.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<MemoryRemoteInner>,
}

#[derive(Default)]
struct MemoryRemoteInner {
    records: Mutex<std::collections::HashMap<String, RemoteDocument>>,
    failure: Mutex<Option<String>>,
    push_failure: Mutex<Option<String>>,
    latency: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
    pushes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the record stored under `sync_code`
    pub fn with_record(self, sync_code: &str, document: RemoteDocument) -> Self {
        self.lock_records().insert(sync_code.to_string(), document);
        self
    }

    /// Make every following call fail with a transport error
    pub fn fail_with(&self, message: Option<&str>) {
        *self
            .inner
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// Make every following push fail with a transport error; fetches still succeed
    pub fn fail_push_with(&self, message: Option<&str>) {
        *self
            .inner
            .push_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }

    /// Delay every following call
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .inner
            .latency
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn record(&self, sync_code: &str) -> Option<RemoteDocument> {
        self.lock_records().get(sync_code).cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn push_count(&self) -> usize {
        self.inner.pushes.load(Ordering::SeqCst)
    }

    fn lock_records(
        &self,
    ) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, RemoteDocument>> {
        self.inner
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate(&self) -> SyncResult<()> {
        let latency = *self
            .inner
            .latency
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .inner
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match failure {
            Some(message) => Err(NetworkError::Transport(message).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, sync_code: &str) -> SyncResult<Option<RemoteDocument>> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self.record(sync_code))
    }

    async fn push(&self, sync_code: &str, document: &RemoteDocument) -> SyncResult<()> {
        self.inner.pushes.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let failure = self
            .inner
            .push_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(message) = failure {
            return Err(NetworkError::Transport(message).into());
        }

        self.lock_records()
            .insert(sync_code.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HomeworkMap, Settings};

    #[test]
    fn test_urls() {
        let client = JsonBinClient::new(
            "https://api.jsonbin.io/v3/b/",
            Some(ApiKey::new("key")),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.record_url("class_diary_2025"),
            "https://api.jsonbin.io/v3/b/class_diary_2025"
        );
        assert_eq!(
            client.latest_url("class_diary_2025"),
            "https://api.jsonbin.io/v3/b/class_diary_2025/latest"
        );
    }

    #[test]
    fn test_latest_envelope_decodes_record() {
        let body = r#"{
            "record": {
                "settings": {"syncCode": "class_diary_2025", "maxLessons": 7},
                "homeworks": {"2025-09-01-lesson-0": "p.5"},
                "lastSync": "2025-09-01T12:00:00.000Z"
            },
            "metadata": {"id": "class_diary_2025", "private": true}
        }"#;

        let envelope: LatestEnvelope = serde_json::from_str(body).unwrap();
        let settings = envelope.record.settings.unwrap();
        assert_eq!(settings.max_lessons, 7);
        assert_eq!(envelope.record.homeworks.unwrap().len(), 1);
        assert!(envelope.record.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_memory_remote_round_trip() {
        let remote = MemoryRemote::new();
        assert!(remote.fetch("code").await.unwrap().is_none());

        let doc = RemoteDocument::snapshot(Settings::default(), HomeworkMap::new());
        remote.push("code", &doc).await.unwrap();

        assert_eq!(remote.fetch("code").await.unwrap(), Some(doc));
        assert_eq!(remote.fetch_count(), 2);
        assert_eq!(remote.push_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_remote_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_with(Some("connection refused"));

        let err = remote.fetch("code").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));

        remote.fail_with(None);
        assert!(remote.fetch("code").await.is_ok());
    }
}
