//! Homework command handlers

use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};

use diary_core::models::Weekday;
use diary_core::remote::RemoteStore;
use diary_core::storage::StorageArea;
use diary_core::{Diary, HomeworkMap, LessonKey, Settings};

use crate::output::{DayRow, LessonRow, Output};

/// List homework for the school week containing `date`
pub async fn list<A, R>(diary: &Diary<A, R>, date: NaiveDate, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let settings = diary.get_settings().await?;
    let homeworks = diary.homeworks().await?;

    output.print_week(&week_rows(&settings, &homeworks, date));
    Ok(())
}

/// Show the homework for one lesson
pub async fn get<A, R>(
    diary: &Diary<A, R>,
    date: NaiveDate,
    period: usize,
    output: &Output,
) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let key = LessonKey::new(date, period);
    let homework = diary.get_homework(&key).await?;
    output.print_homework(&key.to_string(), homework.as_deref());
    Ok(())
}

/// Save the homework for one lesson
///
/// The diary must be started so the edit schedules a sync; the caller
/// flushes it on shutdown.
pub async fn set<A, R>(
    diary: &Diary<A, R>,
    date: NaiveDate,
    period: usize,
    text: String,
    output: &Output,
) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let settings = diary.get_settings().await?;
    if period >= settings.max_lessons as usize {
        output.warning(&format!(
            "Lesson {} is beyond the configured {} lessons per day",
            period + 1,
            settings.max_lessons
        ));
    }

    let key = LessonKey::new(date, period);
    diary
        .record_homework_edit(&key, &text)
        .await
        .with_context(|| format!("Failed to save homework for {}", key))?;

    output.success(&format!("Saved homework for {}", key));
    Ok(())
}

/// Monday to Friday of the week containing `date`
fn school_week(date: NaiveDate) -> Vec<NaiveDate> {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let monday = date - Days::new(offset);
    (0..5).map(|i| monday + Days::new(i)).collect()
}

fn week_rows(settings: &Settings, homeworks: &HomeworkMap, date: NaiveDate) -> Vec<DayRow> {
    school_week(date)
        .into_iter()
        .map(|day| {
            let weekday = Weekday::from_date(day)
                .map(|w| w.to_string())
                .unwrap_or_default();

            if settings.is_holiday(day) {
                return DayRow {
                    date: day,
                    weekday,
                    holiday: true,
                    lessons: Vec::new(),
                };
            }

            let slots = settings.schedule_for(day);
            let lessons = (0..settings.max_lessons as usize)
                .filter_map(|period| {
                    let subject = slots.get(period).map(|slot| slot.to_string());
                    let homework = homeworks
                        .get(&LessonKey::new(day, period).to_string())
                        .cloned();
                    (subject.is_some() || homework.is_some()).then_some(LessonRow {
                        date: day,
                        period,
                        subject,
                        homework,
                    })
                })
                .collect();

            DayRow {
                date: day,
                weekday,
                holiday: false,
                lessons,
            }
        })
        .collect()
}
