//! Class Diary Core Library
//!
//! This crate provides the core functionality for the class diary: a
//! weekly lesson schedule with per-lesson homework, stored locally and
//! mirrored into one shared remote record so several devices see the same
//! diary.
//!
//! # Architecture
//!
//! - **Local store**: settings and homework documents as JSON files
//! - **Remote store**: one JSON document per sync code, replaced wholesale
//! - **Merge**: local data wins, remote data fills the gaps
//! - **Sync engine**: single-flight fetch → merge → push cycles
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut diary = Diary::open(&config)?;
//! diary.start().await?;
//!
//! let key = LessonKey::new(today, 0);
//! diary.record_homework_edit(&key, "p.10").await?;
//! ```
//!
//! # Modules
//!
//! - `diary`: Application facade (main entry point)
//! - `models`: Settings, schedules, holidays and the remote document
//! - `store`: Typed access to the local documents
//! - `storage`: Key/value storage areas and storage errors
//! - `remote`: Remote document store clients
//! - `merge`: Merge rules for settings and homework
//! - `sync`: Sync engine, scheduler and status reporting
//! - `config`: Application configuration

pub mod config;
pub mod diary;
pub mod merge;
pub mod models;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::{ApiKey, Config};
pub use diary::Diary;
pub use models::{
    HomeworkMap, LessonKey, LessonSlot, RemoteDocument, ScheduleTable, Settings, SettingsPatch,
    Weekday,
};
pub use remote::{JsonBinClient, MemoryRemote, RemoteStore};
pub use storage::{FileArea, MemoryArea, StorageArea, StorageError};
pub use store::LocalStore;
pub use sync::{StatusReport, SyncError, SyncOutcome, SyncStatus};
