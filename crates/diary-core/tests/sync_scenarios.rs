//! End-to-end sync scenarios against an in-memory remote

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use tempfile::TempDir;

use diary_core::models::{LessonSlot, Weekday};
use diary_core::storage::StorageError;
use diary_core::{
    Config, Diary, FileArea, HomeworkMap, LessonKey, LocalStore, MemoryRemote, RemoteDocument,
    ScheduleTable, Settings, SyncError, SyncOutcome, SyncStatus,
};

const CODE: &str = "class_diary_2025";

fn monday(period: usize) -> LessonKey {
    LessonKey::new(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(), period)
}

fn homeworks(entries: &[(&str, &str)]) -> HomeworkMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// File-backed store seeded with the given settings and homework
fn seeded_store(dir: &TempDir, settings: &Settings, hw: &HomeworkMap) -> LocalStore<FileArea> {
    let mut store = LocalStore::new(FileArea::new(dir.path()));
    store.save_settings(settings).unwrap();
    store.save_homeworks(hw).unwrap();
    store
}

fn settings_with_code() -> Settings {
    let mut settings = Settings::default();
    settings.fill_default_dates(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    settings.sync_code = CODE.to_string();
    settings
}

fn reopen(dir: &TempDir) -> LocalStore<FileArea> {
    LocalStore::new(FileArea::new(dir.path()))
}

#[tokio::test]
async fn manual_sync_without_code_fails_before_network() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let diary = Diary::new(
        LocalStore::new(FileArea::new(dir.path())),
        remote.clone(),
        &Config::default(),
    );

    let err = diary.manual_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::NoSyncCode));
    assert_eq!(remote.fetch_count(), 0);
    assert_eq!(remote.push_count(), 0);
    assert_eq!(diary.current_sync_status().status, SyncStatus::Idle);
}

#[tokio::test]
async fn remote_homework_is_merged_with_local_priority() {
    let dir = TempDir::new().unwrap();
    let local_hw = homeworks(&[("2025-09-01-lesson-0", "p.10")]);
    let store = seeded_store(&dir, &settings_with_code(), &local_hw);

    let remote_hw = homeworks(&[
        ("2025-09-01-lesson-0", "p.5"),
        ("2025-09-01-lesson-1", "read ch.2"),
    ]);
    let remote = MemoryRemote::new().with_record(
        CODE,
        RemoteDocument::snapshot(Settings::default(), remote_hw),
    );

    let diary = Diary::new(store, remote.clone(), &Config::default());
    let outcome = diary.manual_sync().await.unwrap();
    assert_eq!(outcome, SyncOutcome::Merged);

    let expected = homeworks(&[
        ("2025-09-01-lesson-0", "p.10"),
        ("2025-09-01-lesson-1", "read ch.2"),
    ]);
    assert_eq!(reopen(&dir).load_homeworks().unwrap(), expected);
    assert_eq!(remote.record(CODE).unwrap().homeworks, Some(expected));

    let status = diary.current_sync_status();
    assert_eq!(status.status, SyncStatus::Success);
    assert_eq!(status.message, "Data synchronized");
    assert_eq!(diary.get_homework(&monday(1)).await.unwrap().as_deref(), Some("read ch.2"));
}

#[tokio::test]
async fn absent_remote_uploads_local_snapshot() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with_code();
    let local_hw = homeworks(&[("2025-09-01-lesson-0", "p.10")]);
    let store = seeded_store(&dir, &settings, &local_hw);
    let remote = MemoryRemote::new();

    let diary = Diary::new(store, remote.clone(), &Config::default());
    assert_eq!(diary.manual_sync().await.unwrap(), SyncOutcome::Uploaded);

    let pushed = remote.record(CODE).unwrap();
    assert_eq!(pushed.settings.as_ref(), Some(&settings));
    assert_eq!(pushed.homeworks.as_ref(), Some(&local_hw));
    assert!(pushed.last_sync.is_some());

    let stored = reopen(&dir).load_settings().unwrap();
    assert_eq!(stored.request_count, 1);
    assert_eq!(
        Settings {
            request_count: 0,
            ..stored
        },
        settings
    );
    assert_eq!(reopen(&dir).load_homeworks().unwrap(), local_hw);
    assert_eq!(diary.current_sync_status().message, "Data uploaded to remote store");
}

#[tokio::test]
async fn transport_error_leaves_local_state_alone() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with_code();
    let local_hw = homeworks(&[("2025-09-01-lesson-0", "p.10")]);
    let store = seeded_store(&dir, &settings, &local_hw);

    let remote = MemoryRemote::new();
    remote.fail_with(Some("connection refused"));

    let diary = Diary::new(store, remote.clone(), &Config::default());
    let outcome = diary.manual_sync().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Failed { transient: true, .. }));

    let status = diary.current_sync_status();
    assert_eq!(status.status, SyncStatus::Error);
    assert!(status.message.starts_with("Sync failed:"));
    assert!(status.message.contains("connection refused"));

    assert_eq!(reopen(&dir).load_settings().unwrap(), settings);
    assert_eq!(reopen(&dir).load_homeworks().unwrap(), local_hw);
    assert_eq!(remote.push_count(), 0);
}

#[tokio::test]
async fn failed_push_keeps_merge_but_not_the_count() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with_code();
    let local_hw = homeworks(&[("2025-09-01-lesson-0", "p.10")]);
    let store = seeded_store(&dir, &settings, &local_hw);

    let remote_hw = homeworks(&[("2025-09-01-lesson-1", "read ch.2")]);
    let remote = MemoryRemote::new().with_record(
        CODE,
        RemoteDocument::snapshot(Settings::default(), remote_hw.clone()),
    );
    remote.fail_push_with(Some("connection reset"));

    let diary = Diary::new(store, remote.clone(), &Config::default());
    let outcome = diary.manual_sync().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Failed { transient: true, .. }));

    let status = diary.current_sync_status();
    assert_eq!(status.status, SyncStatus::Error);
    assert!(status.message.contains("connection reset"));

    // merged locally, counter untouched, remote unchanged
    let expected = homeworks(&[
        ("2025-09-01-lesson-0", "p.10"),
        ("2025-09-01-lesson-1", "read ch.2"),
    ]);
    assert_eq!(reopen(&dir).load_homeworks().unwrap(), expected);
    assert_eq!(reopen(&dir).load_settings().unwrap().request_count, 0);
    assert_eq!(remote.push_count(), 1);
    assert_eq!(remote.record(CODE).unwrap().homeworks, Some(remote_hw));
}

#[tokio::test]
async fn empty_local_schedule_keeps_remote_schedule() {
    let dir = TempDir::new().unwrap();
    let mut local = settings_with_code();
    local.theme = "dark".parse().unwrap();
    let store = seeded_store(&dir, &local, &HomeworkMap::new());

    let mut table = ScheduleTable::with_weekdays();
    table.set_day(
        Weekday::Monday,
        vec![LessonSlot::Subject("Математика".to_string())],
    );
    let mut remote_settings = Settings::default();
    remote_settings.schedule_first_half = table.clone();
    remote_settings.max_lessons = 6;

    let remote = MemoryRemote::new().with_record(
        CODE,
        RemoteDocument::snapshot(remote_settings, HomeworkMap::new()),
    );

    let diary = Diary::new(store, remote, &Config::default());
    diary.manual_sync().await.unwrap();

    let merged = diary.get_settings().await.unwrap();
    assert_eq!(merged.schedule_first_half, table);
    assert_eq!(merged.max_lessons, local.max_lessons);
    assert_eq!(merged.theme, local.theme);
}

#[tokio::test(start_paused = true)]
async fn overlapping_syncs_coalesce_into_one_follow_up() {
    let remote = MemoryRemote::new();
    remote.set_latency(Some(Duration::from_millis(500)));

    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, &settings_with_code(), &HomeworkMap::new());
    let diary = Diary::new(store, remote.clone(), &Config::default());

    let (a, b, c, d) = tokio::join!(
        diary.manual_sync(),
        diary.manual_sync(),
        diary.manual_sync(),
        diary.manual_sync(),
    );

    for outcome in [a, b, c, d] {
        assert!(outcome.unwrap().is_success());
    }
    assert_eq!(remote.fetch_count(), 2);
    assert_eq!(remote.push_count(), 2);
    assert_eq!(reopen(&dir).load_settings().unwrap().request_count, 2);
}

#[tokio::test]
async fn corrupt_local_settings_fail_to_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("diarySettings.json"), "{not json").unwrap();

    let diary = Diary::new(reopen(&dir), MemoryRemote::new(), &Config::default());
    let err = diary.get_settings().await.unwrap_err();
    assert!(matches!(err, StorageError::Decode { .. }));
}

#[tokio::test]
async fn unknown_settings_fields_survive_a_sync() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("diarySettings.json"),
        format!(r#"{{"syncCode": "{CODE}", "lessonColors": {{"Математика": "red"}}}}"#),
    )
    .unwrap();

    let remote = MemoryRemote::new();
    let diary = Diary::new(reopen(&dir), remote.clone(), &Config::default());
    diary.manual_sync().await.unwrap();

    let pushed = remote.record(CODE).unwrap().settings.unwrap();
    let colors: BTreeMap<String, String> =
        serde_json::from_value(pushed.extra["lessonColors"].clone()).unwrap();
    assert_eq!(colors["Математика"], "red");
}

#[tokio::test(start_paused = true)]
async fn homework_edit_triggers_debounced_sync_when_auto_sync_is_on() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_with_code();
    settings.auto_sync = true;
    let store = seeded_store(&dir, &settings, &HomeworkMap::new());
    let remote = MemoryRemote::new();

    let mut diary = Diary::new(store, remote.clone(), &Config::default());
    diary.start().await.unwrap();

    // startup sync after the startup delay
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(remote.fetch_count(), 1);

    diary.record_homework_edit(&monday(2), "ex. 4").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(remote.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(remote.fetch_count(), 2);
    let pushed = remote.record(CODE).unwrap().homeworks.unwrap();
    assert_eq!(pushed["2025-09-01-lesson-2"], "ex. 4");

    diary.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn homework_edit_does_not_sync_when_auto_sync_is_off() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_with_code();
    settings.auto_sync = false;
    let store = seeded_store(&dir, &settings, &HomeworkMap::new());
    let remote = MemoryRemote::new();

    let mut diary = Diary::new(store, remote.clone(), &Config::default());
    diary.start().await.unwrap();
    diary.record_homework_edit(&monday(0), "p.10").await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    diary.shutdown().await;
    assert_eq!(remote.fetch_count(), 0);
}
