//! Storage layer
//!
//! Persists the diary's documents in a key/value storage area.
//!
//! ## Documents
//!
//! - `diarySettings`: the settings document
//! - `diaryHomeworks`: lesson key → homework text
//!
//! A document that was never written is distinct from one that exists but
//! cannot be decoded; only the former falls back to defaults.

pub mod area;
pub mod error;

pub use area::{FileArea, MemoryArea, StorageArea};
pub use error::{StorageError, StorageResult};
