//! Background sync trigger task
//!
//! Turns application events into sync cycles:
//!
//! - `Startup` runs a cycle once the startup delay has passed
//! - `HomeworkEdited` runs a cycle after the debounce period; every further
//!   edit pushes the deadline back
//! - `Immediate` runs a cycle right away
//!
//! Shutting down runs a last cycle if an edit is still waiting for one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::engine::SyncEngine;
use crate::remote::RemoteStore;
use crate::storage::StorageArea;

/// Reason for requesting a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Application started
    Startup,
    /// A homework entry was saved
    HomeworkEdited,
    /// Sync without delay
    Immediate,
}

enum SchedulerCommand {
    Trigger(SyncTrigger),
    Shutdown,
}

/// Handle to the background scheduler task
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Queue a trigger; returns false if the scheduler already stopped
    pub async fn trigger(&self, trigger: SyncTrigger) -> bool {
        self.command_tx
            .send(SchedulerCommand::Trigger(trigger))
            .await
            .is_ok()
    }

    /// Stop the scheduler, waiting for a final flush if one is due
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Sync scheduler task ended abnormally: {}", e);
        }
    }
}

/// Spawn the scheduler for `engine`
pub fn spawn_scheduler<A, R>(
    engine: Arc<SyncEngine<A, R>>,
    startup_delay: Duration,
    debounce: Duration,
) -> SchedulerHandle
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(16);
    let task = tokio::spawn(scheduler_task(engine, startup_delay, debounce, command_rx));

    SchedulerHandle { command_tx, task }
}

async fn scheduler_task<A, R>(
    engine: Arc<SyncEngine<A, R>>,
    startup_delay: Duration,
    debounce: Duration,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
) where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let mut deadline: Option<Instant> = None;
    let mut edit_pending = false;

    loop {
        let due = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = due => {
                deadline = None;
                edit_pending = false;
                engine.sync().await;
            }
            cmd = command_rx.recv() => match cmd {
                Some(SchedulerCommand::Trigger(SyncTrigger::Startup)) => {
                    let at = Instant::now() + startup_delay;
                    deadline = Some(deadline.map_or(at, |current| current.min(at)));
                    debug!("Startup sync scheduled in {:?}", startup_delay);
                }
                Some(SchedulerCommand::Trigger(SyncTrigger::HomeworkEdited)) => {
                    deadline = Some(Instant::now() + debounce);
                    edit_pending = true;
                }
                Some(SchedulerCommand::Trigger(SyncTrigger::Immediate)) => {
                    deadline = None;
                    edit_pending = false;
                    engine.sync().await;
                }
                Some(SchedulerCommand::Shutdown) | None => {
                    if edit_pending {
                        debug!("Flushing pending edit before shutdown");
                        engine.sync().await;
                    }
                    break;
                }
            }
        }
    }
}
