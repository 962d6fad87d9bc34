//! Local store
//!
//! Typed access to the two persisted documents: settings and the homework
//! map. Both live in a `StorageArea` under fixed document names.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = LocalStore::new(FileArea::new(config.data_dir.clone()));
//!
//! let settings = store.load_settings()?;  // defaults on first run
//! store.save_homework_entry("2025-09-01-lesson-0", "p.10")?;
//! ```

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::models::{HomeworkMap, Settings};
use crate::storage::{StorageArea, StorageError, StorageResult};

/// Document name of the settings document
pub const SETTINGS_KEY: &str = "diarySettings";

/// Document name of the homework map
pub const HOMEWORKS_KEY: &str = "diaryHomeworks";

/// Typed view over a storage area
pub struct LocalStore<A: StorageArea> {
    area: A,
}

impl<A: StorageArea> LocalStore<A> {
    pub fn new(area: A) -> Self {
        Self { area }
    }

    /// Load settings, applying defaults for anything missing
    ///
    /// An absent document yields default settings; a corrupt one is an error.
    /// Unset year boundaries are derived from today's date.
    pub fn load_settings(&self) -> StorageResult<Settings> {
        self.load_settings_on(Local::now().date_naive())
    }

    /// Load settings, deriving default year boundaries from `today`
    pub fn load_settings_on(&self, today: NaiveDate) -> StorageResult<Settings> {
        let mut settings: Settings = self.load_document(SETTINGS_KEY)?.unwrap_or_default();
        settings.fill_default_dates(today);
        Ok(settings)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> StorageResult<()> {
        self.save_document(SETTINGS_KEY, settings)
    }

    /// Load the full homework map (empty if never written)
    pub fn load_homeworks(&self) -> StorageResult<HomeworkMap> {
        Ok(self.load_document(HOMEWORKS_KEY)?.unwrap_or_default())
    }

    pub fn save_homeworks(&mut self, homeworks: &HomeworkMap) -> StorageResult<()> {
        self.save_document(HOMEWORKS_KEY, homeworks)
    }

    /// Homework for one lesson
    pub fn load_homework(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load_homeworks()?.remove(key))
    }

    /// Set the homework for one lesson, keeping all other entries
    pub fn save_homework_entry(&mut self, key: &str, text: &str) -> StorageResult<()> {
        let mut homeworks = self.load_homeworks()?;
        homeworks.insert(key.to_string(), text.to_string());
        self.save_homeworks(&homeworks)
    }

    /// Access the underlying storage area
    pub fn area(&self) -> &A {
        &self.area
    }

    fn load_document<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.area.get(key)? else {
            debug!("Document {} not found, using defaults", key);
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            })
    }

    fn save_document<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.area.set(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Theme, Weekday};
    use crate::storage::{FileArea, MemoryArea};
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_first_run_defaults() {
        let store = LocalStore::new(MemoryArea::new());

        let settings = store.load_settings_on(date("2025-10-18")).unwrap();
        assert_eq!(settings.max_lessons, 8);
        assert_eq!(settings.theme, Theme::Light);
        assert!(settings.auto_sync);
        assert!(settings.sync_code.is_empty());
        assert_eq!(settings.schedule_start, Some(date("2025-09-01")));
        assert_eq!(settings.schedule_end, Some(date("2026-05-31")));
        assert_eq!(settings.semester_break_date, Some(date("2026-01-10")));

        assert!(store.load_homeworks().unwrap().is_empty());
    }

    #[test]
    fn test_partial_document_keeps_present_fields() {
        let area = MemoryArea::new().with_entry(
            SETTINGS_KEY,
            r#"{"maxLessons": 6, "theme": "dark", "scheduleStart": "2025-09-02"}"#,
        );
        let store = LocalStore::new(area);

        let settings = store.load_settings_on(date("2025-10-18")).unwrap();
        assert_eq!(settings.max_lessons, 6);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.schedule_start, Some(date("2025-09-02")));
        // Missing fields still get defaults
        assert_eq!(settings.schedule_end, Some(date("2026-05-31")));
        assert!(settings.schedule_first_half.day(Weekday::Monday).is_empty());
    }

    #[test]
    fn test_corrupt_settings_fail_loudly() {
        let area = MemoryArea::new().with_entry(SETTINGS_KEY, "{\"maxLessons\": 6,");
        let store = LocalStore::new(area);

        let err = store.load_settings().unwrap_err();
        assert!(matches!(err, StorageError::Decode { ref key, .. } if key == SETTINGS_KEY));
    }

    #[test]
    fn test_malformed_field_fails_instead_of_defaulting() {
        let area = MemoryArea::new().with_entry(SETTINGS_KEY, r#"{"holidays": "none"}"#);
        let store = LocalStore::new(area);

        assert!(store.load_settings().is_err());
    }

    #[test]
    fn test_corrupt_homeworks_fail_loudly() {
        let area = MemoryArea::new().with_entry(HOMEWORKS_KEY, "[1, 2, 3]");
        let store = LocalStore::new(area);

        assert!(store.load_homeworks().is_err());
        assert!(store.load_homework("2025-09-01-lesson-0").is_err());
    }

    #[test]
    fn test_homework_entries() {
        let mut store = LocalStore::new(MemoryArea::new());

        store
            .save_homework_entry("2025-09-01-lesson-0", "p.10")
            .unwrap();
        store
            .save_homework_entry("2025-09-01-lesson-1", "read ch.2")
            .unwrap();
        store
            .save_homework_entry("2025-09-01-lesson-0", "p.11")
            .unwrap();

        assert_eq!(
            store.load_homework("2025-09-01-lesson-0").unwrap().as_deref(),
            Some("p.11")
        );
        assert_eq!(store.load_homeworks().unwrap().len(), 2);
        assert!(store.load_homework("2025-09-02-lesson-0").unwrap().is_none());
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut store = LocalStore::new(FileArea::new(temp_dir.path()));
            let mut settings = store.load_settings().unwrap();
            settings.sync_code = "class_diary_2025".to_string();
            settings.request_count = 3;
            store.save_settings(&settings).unwrap();
            store
                .save_homework_entry("2025-09-01-lesson-0", "p.10")
                .unwrap();
        }

        let store = LocalStore::new(FileArea::new(temp_dir.path()));
        let settings = store.load_settings().unwrap();
        assert_eq!(settings.sync_code, "class_diary_2025");
        assert_eq!(settings.request_count, 3);
        assert_eq!(
            store.load_homework("2025-09-01-lesson-0").unwrap().as_deref(),
            Some("p.10")
        );
    }
}
