//! Sync orchestrator
//!
//! Runs the round trip against the shared remote record:
//!
//! 1. Fetch the remote document
//! 2. If it exists, merge it with the local documents and store the result
//! 3. Push the (merged or local) snapshot back as the new remote document
//! 4. Count the cycle in the settings' request counter
//!
//! Only one cycle is ever in flight. Sync requests that arrive while a
//! cycle runs queue behind it and are served together by a single
//! follow-up cycle, so overlapping triggers cannot push stale merges over
//! each other.
//!
//! Errors never escape a cycle: they become an `Error` status with the
//! message, and the request counter is left untouched.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::error::{NetworkError, SyncError, SyncResult};
use super::status::{StatusReport, SyncEvent, SyncOutcome, SyncStatus};
use crate::config::Config;
use crate::merge::{merge_homeworks, merge_settings};
use crate::models::{RemoteDocument, Settings};
use crate::remote::RemoteStore;
use crate::storage::StorageArea;
use crate::store::LocalStore;

/// Owns the local store and drives sync cycles against a remote store
pub struct SyncEngine<A: StorageArea, R: RemoteStore> {
    /// Local documents; every read-modify-write happens under this lock
    store: Mutex<LocalStore<A>>,
    remote: R,
    /// Deployment-wide sync code, preferred over the one in settings
    shared_code: Option<String>,
    request_timeout: Duration,
    status_display: Duration,
    status: Arc<watch::Sender<StatusReport>>,
    status_rx: watch::Receiver<StatusReport>,
    /// Bumped on every status change, lets auto-clear skip stale timers
    generation: Arc<AtomicU64>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    /// Single-flight gate, holding the outcome of the last cycle
    gate: Mutex<Option<SyncOutcome>>,
    /// A sync was requested and no cycle has started for it yet
    pending: AtomicBool,
}

impl<A: StorageArea, R: RemoteStore> SyncEngine<A, R> {
    pub fn new(store: LocalStore<A>, remote: R, config: &Config) -> Self {
        let (status_tx, status_rx) = watch::channel(StatusReport::idle());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            store: Mutex::new(store),
            remote,
            shared_code: config
                .sync_code
                .as_deref()
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            request_timeout: config.request_timeout(),
            status_display: config.status_display(),
            status: Arc::new(status_tx),
            status_rx,
            generation: Arc::new(AtomicU64::new(0)),
            event_tx,
            event_rx: Some(event_rx),
            gate: Mutex::new(None),
            pending: AtomicBool::new(false),
        }
    }

    /// Get the current status
    pub fn status(&self) -> StatusReport {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<StatusReport> {
        self.status_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.take()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Run `f` with exclusive access to the local store
    pub async fn with_store<T>(&self, f: impl FnOnce(&mut LocalStore<A>) -> T) -> T {
        let mut store = self.store.lock().await;
        f(&mut store)
    }

    /// Remote record identifier for the given settings, if any
    pub fn resolve_sync_code(&self, settings: &Settings) -> Option<String> {
        self.shared_code.clone().or_else(|| {
            settings
                .has_sync_code()
                .then(|| settings.sync_code.trim().to_string())
        })
    }

    /// Request a sync and wait until a cycle covering the request finished
    ///
    /// If a cycle is already running, this waits for it and then either
    /// runs the single follow-up cycle or, when another waiter already ran
    /// it, returns that cycle's outcome.
    pub async fn sync(&self) -> SyncOutcome {
        self.pending.store(true, Ordering::SeqCst);

        let mut last = self.gate.lock().await;
        if self.pending.swap(false, Ordering::SeqCst) {
            let outcome = self.run_cycle().await;
            *last = Some(outcome);
        } else {
            debug!("Sync request served by a cycle started after it");
        }

        last.clone().unwrap_or(SyncOutcome::Skipped)
    }

    /// One full cycle, with status reporting
    async fn run_cycle(&self) -> SyncOutcome {
        info!("Starting sync");
        self.set_status(SyncStatus::Syncing, "Syncing with remote store...");

        match self.try_cycle().await {
            Ok(outcome) => {
                let message = match outcome {
                    SyncOutcome::Uploaded => "Data uploaded to remote store",
                    _ => "Data synchronized",
                };
                info!("Sync complete: {:?}", outcome);
                let generation = self.set_status(SyncStatus::Success, message);
                self.schedule_clear(generation);
                outcome
            }
            Err(e) => {
                warn!("Sync failed: {}", e);
                let message = format!("Sync failed: {}", e);
                let generation = self.set_status(SyncStatus::Error, message.clone());
                self.schedule_clear(generation);
                SyncOutcome::Failed {
                    message,
                    transient: e.is_transient(),
                }
            }
        }
    }

    async fn try_cycle(&self) -> SyncResult<SyncOutcome> {
        let settings = self.with_store(|store| store.load_settings()).await?;
        let sync_code = self
            .resolve_sync_code(&settings)
            .ok_or(SyncError::NoSyncCode)?;

        let remote = self.bounded(self.remote.fetch(&sync_code)).await?;

        // Re-read local state after the fetch so edits made meanwhile
        // are part of what gets merged and pushed.
        let (outcome, snapshot) = {
            let mut store = self.store.lock().await;
            let settings = store.load_settings()?;
            let homeworks = store.load_homeworks()?;

            match remote {
                Some(remote) => {
                    debug!("Merging remote record {}", sync_code);
                    let merged_settings = merge_settings(&settings, remote.settings.as_ref());
                    let merged_homeworks =
                        merge_homeworks(&homeworks, remote.homeworks.as_ref());
                    store.save_settings(&merged_settings)?;
                    store.save_homeworks(&merged_homeworks)?;
                    (
                        SyncOutcome::Merged,
                        RemoteDocument::snapshot(merged_settings, merged_homeworks),
                    )
                }
                None => {
                    debug!("Remote record {} missing, uploading local state", sync_code);
                    (
                        SyncOutcome::Uploaded,
                        RemoteDocument::snapshot(settings, homeworks),
                    )
                }
            }
        };

        if outcome == SyncOutcome::Merged {
            self.emit(SyncEvent::LocalStateReplaced);
        }

        self.bounded(self.remote.push(&sync_code, &snapshot)).await?;

        {
            let mut store = self.store.lock().await;
            let mut settings = store.load_settings()?;
            settings.request_count += 1;
            store.save_settings(&settings)?;
        }

        Ok(outcome)
    }

    /// Apply the request timeout to a remote call
    async fn bounded<T>(&self, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| SyncError::from(NetworkError::Timeout(self.request_timeout)))?
    }

    /// Publish a status, returning its generation
    fn set_status(&self, status: SyncStatus, message: impl Into<String>) -> u64 {
        let report = StatusReport::new(status, message);
        let mut generation = 0;
        self.status.send_modify(|current| {
            *current = report.clone();
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        });
        self.emit(SyncEvent::StatusChanged(report));
        generation
    }

    /// Reset to `Idle` after the display period, unless the status changed
    fn schedule_clear(&self, generation: u64) {
        let status = Arc::clone(&self.status);
        let current = Arc::clone(&self.generation);
        let event_tx = self.event_tx.clone();
        let delay = self.status_display;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let cleared = status.send_if_modified(|report| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *report = StatusReport::idle();
                true
            });
            if cleared {
                let _ = event_tx.send(SyncEvent::StatusChanged(StatusReport::idle()));
            }
        });
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }
}
