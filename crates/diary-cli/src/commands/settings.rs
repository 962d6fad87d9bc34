//! Settings command handlers

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use diary_core::models::{Holiday, LessonSlot, ScheduleTable, Subgroups, Theme, Weekday};
use diary_core::remote::RemoteStore;
use diary_core::storage::StorageArea;
use diary_core::{Diary, SettingsPatch};

use crate::commands::sync::report;
use crate::output::Output;

/// Show the diary settings
pub async fn show<A, R>(diary: &Diary<A, R>, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let settings = diary.get_settings().await?;
    output.print_settings(&settings);
    Ok(())
}

/// Set one scalar setting
pub async fn set<A, R>(diary: &Diary<A, R>, key: String, value: String, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let patch = parse_patch(&key, &value)?;
    save(diary, patch, output).await?;
    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Append a holiday interval
pub async fn add_holiday<A, R>(
    diary: &Diary<A, R>,
    start: NaiveDate,
    end: NaiveDate,
    output: &Output,
) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let mut holidays = diary.get_settings().await?.holidays;
    holidays.push(Holiday::new(start, end));

    let patch = SettingsPatch {
        holidays: Some(holidays),
        ..SettingsPatch::default()
    };
    save(diary, patch, output).await?;
    output.success(&format!("Added holiday {} .. {}", start, end));
    Ok(())
}

/// Put a subject into one period of a schedule table
///
/// Earlier empty periods are filled with blank slots; an empty subject
/// blanks the period and trailing blanks are dropped.
#[allow(clippy::too_many_arguments)]
pub async fn set_lesson<A, R>(
    diary: &Diary<A, R>,
    second_half: bool,
    weekday: Weekday,
    period: usize,
    subject: String,
    subgroup: Option<u32>,
    subgroups: &Subgroups,
    output: &Output,
) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let settings = diary.get_settings().await?;
    if period >= settings.max_lessons as usize {
        bail!(
            "Lesson {} is beyond the configured {} lessons per day",
            period + 1,
            settings.max_lessons
        );
    }

    let slot = LessonSlot::for_subject(subject.trim(), subgroup, subgroups);
    if let (Some(n), None) = (subgroup, slot.subgroup()) {
        output.warning(&format!(
            "'{}' has no subgroup {}, saved without it",
            slot.subject(),
            n
        ));
    }

    let mut patch = SettingsPatch::default();
    if second_half {
        let mut table = settings.schedule_second_half;
        place_slot(&mut table, weekday, period, slot.clone());
        patch.schedule_second_half = Some(table);
    } else {
        let mut table = settings.schedule_first_half;
        place_slot(&mut table, weekday, period, slot.clone());
        patch.schedule_first_half = Some(table);
    }

    save(diary, patch, output).await?;
    output.success(&format!("{} lesson {}: {}", weekday, period + 1, slot));
    Ok(())
}

fn place_slot(table: &mut ScheduleTable, weekday: Weekday, period: usize, slot: LessonSlot) {
    let mut lessons = table.day(weekday).to_vec();
    if lessons.len() <= period {
        lessons.resize(period + 1, LessonSlot::Subject(String::new()));
    }
    lessons[period] = slot;
    while lessons.last().is_some_and(|last| last.subject().is_empty()) {
        lessons.pop();
    }
    table.set_day(weekday, lessons);
}

/// Remove all holidays
pub async fn clear_holidays<A, R>(diary: &Diary<A, R>, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let patch = SettingsPatch {
        holidays: Some(Vec::new()),
        ..SettingsPatch::default()
    };
    save(diary, patch, output).await?;
    output.success("Cleared holidays");
    Ok(())
}

async fn save<A, R>(diary: &Diary<A, R>, patch: SettingsPatch, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let outcome = diary
        .save_settings_and_maybe_sync(patch)
        .await
        .context("Failed to save settings")?;

    // The settings are saved either way; a failed sync is only a warning
    if let Err(e) = report(&outcome, output) {
        output.warning(&format!("{}", e));
    }
    Ok(())
}

fn parse_patch(key: &str, value: &str) -> Result<SettingsPatch> {
    let mut patch = SettingsPatch::default();

    match key {
        "sync_code" => {
            patch.sync_code = Some(if value == "none" { String::new() } else { value.to_string() });
        }
        "auto_sync" => {
            patch.auto_sync = Some(
                value
                    .parse()
                    .context("Invalid value for auto_sync. Use 'true' or 'false'.")?,
            );
        }
        "max_lessons" => {
            patch.max_lessons = Some(
                value
                    .parse()
                    .context("Invalid value for max_lessons. Use a positive number.")?,
            );
        }
        "theme" => {
            patch.theme = Some(value.parse::<Theme>().map_err(anyhow::Error::msg)?);
        }
        "schedule_start" => patch.schedule_start = Some(parse_date(key, value)?),
        "schedule_end" => patch.schedule_end = Some(parse_date(key, value)?),
        "semester_break_date" => patch.semester_break_date = Some(parse_date(key, value)?),
        _ => {
            bail!(
                "Unknown settings key: '{}'\n\
                 Valid keys: sync_code, auto_sync, max_lessons, theme, \
                 schedule_start, schedule_end, semester_break_date",
                key
            );
        }
    }

    Ok(patch)
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date for {}. Use YYYY-MM-DD.", key))
}
