//! Key/value storage areas
//!
//! A storage area is a flat map from document name to serialized JSON, the
//! local equivalent of the browser's local storage. Two areas are provided:
//!
//! - `FileArea`: one `{key}.json` file per document in the data directory,
//!   written atomically (write to temp file, then rename)
//! - `MemoryArea`: in-process map, for tests and embedding

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// A persistent key/value area holding serialized documents
pub trait StorageArea: Send {
    /// Read a document, `None` if it was never written
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace a document
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

/// File-backed storage area rooted at a directory
#[derive(Debug, Clone)]
pub struct FileArea {
    dir: PathBuf,
}

impl FileArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StorageArea for FileArea {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_read(e, path)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        atomic_write(&self.path_for(key), value.as_bytes())
    }
}

/// In-memory storage area
#[derive(Debug, Clone, Default)]
pub struct MemoryArea {
    entries: HashMap<String, String>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an area with raw document contents
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl StorageArea for MemoryArea {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_write(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_area_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let area = FileArea::new(temp_dir.path());

        assert!(area.get("diarySettings").unwrap().is_none());
    }

    #[test]
    fn test_file_area_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut area = FileArea::new(temp_dir.path());

        area.set("diaryHomeworks", r#"{"2025-09-01-lesson-0":"p.10"}"#)
            .unwrap();

        assert!(area.path_for("diaryHomeworks").exists());
        assert_eq!(
            area.get("diaryHomeworks").unwrap().as_deref(),
            Some(r#"{"2025-09-01-lesson-0":"p.10"}"#)
        );
    }

    #[test]
    fn test_file_area_overwrite_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut area = FileArea::new(temp_dir.path());

        area.set("diarySettings", "{}").unwrap();
        area.set("diarySettings", r#"{"theme":"dark"}"#).unwrap();

        assert_eq!(
            area.get("diarySettings").unwrap().as_deref(),
            Some(r#"{"theme":"dark"}"#)
        );
        assert!(!area.path_for("diarySettings").with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.json");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_memory_area() {
        let mut area = MemoryArea::new().with_entry("diarySettings", "{}");

        assert_eq!(area.get("diarySettings").unwrap().as_deref(), Some("{}"));
        assert!(area.get("diaryHomeworks").unwrap().is_none());

        area.set("diaryHomeworks", "{}").unwrap();
        assert!(area.get("diaryHomeworks").unwrap().is_some());
    }
}
