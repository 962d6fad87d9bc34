//! Application facade
//!
//! `Diary` is what a front end talks to. It owns the sync engine (and with
//! it the local store), wires the background scheduler, and decides which
//! user actions lead to a sync.
//!
//! ## Usage
//!
//! ```ignore
//! let mut diary = Diary::open(&config)?;
//! diary.start().await?;
//!
//! diary.record_homework_edit(&key, "p.10").await?;
//! let outcome = diary.manual_sync().await?;
//!
//! diary.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{HomeworkMap, LessonKey, Settings, SettingsPatch};
use crate::remote::{JsonBinClient, RemoteStore};
use crate::storage::{FileArea, StorageArea, StorageResult};
use crate::store::LocalStore;
use crate::sync::{
    spawn_scheduler, SchedulerHandle, StatusReport, SyncEngine, SyncError, SyncEvent,
    SyncOutcome, SyncResult, SyncTrigger,
};

/// Class diary with local storage and remote sync
pub struct Diary<A: StorageArea + 'static, R: RemoteStore + 'static> {
    engine: Arc<SyncEngine<A, R>>,
    scheduler: Option<SchedulerHandle>,
    events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    startup_delay: Duration,
    edit_debounce: Duration,
}

impl Diary<FileArea, JsonBinClient> {
    /// Open the diary stored in `config.data_dir`, syncing over HTTP
    pub fn open(config: &Config) -> SyncResult<Self> {
        let store = LocalStore::new(FileArea::new(config.data_dir.clone()));
        let remote = JsonBinClient::from_config(config)?;
        Ok(Self::new(store, remote, config))
    }
}

impl<A: StorageArea + 'static, R: RemoteStore + 'static> Diary<A, R> {
    pub fn new(store: LocalStore<A>, remote: R, config: &Config) -> Self {
        let mut engine = SyncEngine::new(store, remote, config);
        let events = engine.take_events();

        Self {
            engine: Arc::new(engine),
            scheduler: None,
            events,
            startup_delay: config.startup_delay(),
            edit_debounce: config.edit_debounce(),
        }
    }

    /// Start the background scheduler and queue the startup sync
    ///
    /// The startup sync is only queued when auto-sync is enabled and a sync
    /// code is available. Calling this twice has no further effect.
    pub async fn start(&mut self) -> SyncResult<()> {
        if self.scheduler.is_some() {
            return Ok(());
        }

        let scheduler = spawn_scheduler(
            Arc::clone(&self.engine),
            self.startup_delay,
            self.edit_debounce,
        );

        let settings = self.get_settings().await?;
        if self.auto_sync_enabled(&settings) {
            info!("Auto-sync enabled, scheduling startup sync");
            scheduler.trigger(SyncTrigger::Startup).await;
        }

        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Stop the scheduler, flushing a pending edit sync
    pub async fn shutdown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
    }

    pub async fn get_settings(&self) -> StorageResult<Settings> {
        self.engine.with_store(|store| store.load_settings()).await
    }

    pub async fn get_homework(&self, key: &LessonKey) -> StorageResult<Option<String>> {
        let key = key.to_string();
        self.engine.with_store(|store| store.load_homework(&key)).await
    }

    /// All homework entries, keyed by lesson key
    pub async fn homeworks(&self) -> StorageResult<HomeworkMap> {
        self.engine.with_store(|store| store.load_homeworks()).await
    }

    /// Validate and save a settings change, then sync if auto-sync is on
    ///
    /// Returns `Skipped` when no sync ran. Sync failures are reported in
    /// the outcome and the status, never as an error.
    pub async fn save_settings_and_maybe_sync(
        &self,
        patch: SettingsPatch,
    ) -> SyncResult<SyncOutcome> {
        let settings = self
            .engine
            .with_store(|store| -> SyncResult<Settings> {
                let mut settings = store.load_settings()?;
                patch.apply_to(&mut settings)?;
                store.save_settings(&settings)?;
                Ok(settings)
            })
            .await?;
        debug!("Settings saved");

        if self.auto_sync_enabled(&settings) {
            Ok(self.engine.sync().await)
        } else {
            Ok(SyncOutcome::Skipped)
        }
    }

    /// Persist a homework entry and schedule a debounced sync
    pub async fn record_homework_edit(&self, key: &LessonKey, text: &str) -> SyncResult<()> {
        let key = key.to_string();
        let settings = self
            .engine
            .with_store(|store| -> SyncResult<Settings> {
                store.save_homework_entry(&key, text)?;
                Ok(store.load_settings()?)
            })
            .await?;

        if self.auto_sync_enabled(&settings) {
            if let Some(scheduler) = &self.scheduler {
                scheduler.trigger(SyncTrigger::HomeworkEdited).await;
            }
        }
        Ok(())
    }

    /// Sync now, regardless of the auto-sync setting
    ///
    /// Fails with `NoSyncCode` before touching the network when no sync
    /// code is available.
    pub async fn manual_sync(&self) -> SyncResult<SyncOutcome> {
        let settings = self.get_settings().await?;
        if self.engine.resolve_sync_code(&settings).is_none() {
            return Err(SyncError::NoSyncCode);
        }
        Ok(self.engine.sync().await)
    }

    pub fn current_sync_status(&self) -> StatusReport {
        self.engine.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusReport> {
        self.engine.subscribe_status()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.events.take()
    }

    pub fn remote(&self) -> &R {
        self.engine.remote()
    }

    fn auto_sync_enabled(&self, settings: &Settings) -> bool {
        settings.auto_sync && self.engine.resolve_sync_code(settings).is_some()
    }
}
