//! Synchronization with the shared remote record
//!
//! The whole diary (settings and homeworks) is mirrored into one remote
//! JSON document identified by the sync code. A cycle fetches it, merges
//! it into the local documents with local priority, and pushes the result
//! back as a full replacement.
//!
//! ## Components
//!
//! - `SyncEngine`: runs cycles, one at a time, and reports status
//! - `spawn_scheduler`: background task turning startup and edit events
//!   into delayed or debounced cycles
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(SyncEngine::new(store, remote, &config));
//! let scheduler = spawn_scheduler(engine.clone(), config.startup_delay(), config.edit_debounce());
//! scheduler.trigger(SyncTrigger::Startup).await;
//! ```

mod engine;
mod error;
mod scheduler;
mod status;

pub use engine::SyncEngine;
pub use error::{NetworkError, SyncError, SyncResult};
pub use scheduler::{spawn_scheduler, SchedulerHandle, SyncTrigger};
pub use status::{StatusReport, SyncEvent, SyncOutcome, SyncStatus};
