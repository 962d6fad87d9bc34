//! Status command handler

use anyhow::Result;

use diary_core::remote::RemoteStore;
use diary_core::storage::StorageArea;
use diary_core::{Config, Diary};

use crate::output::{Output, OutputFormat};

/// Show status information
pub async fn show<A, R>(diary: &Diary<A, R>, config: &Config, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    let settings = diary.get_settings().await?;
    let homeworks = diary.homeworks().await?;
    let sync_code = config
        .sync_code
        .clone()
        .or_else(|| settings.has_sync_code().then(|| settings.sync_code.clone()));

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "sync": {
                        "code": sync_code,
                        "auto_sync": settings.auto_sync,
                        "url": config.sync_url,
                        "api_key_set": config.api_key.is_some(),
                        "request_count": settings.request_count
                    },
                    "schedule": {
                        "start": settings.schedule_start,
                        "end": settings.schedule_end,
                        "semester_break_date": settings.semester_break_date,
                        "max_lessons": settings.max_lessons,
                        "holidays": settings.holidays.len()
                    },
                    "storage": {
                        "location": config.data_dir,
                        "homeworks": homeworks.len()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", settings.request_count);
        }
        OutputFormat::Human => {
            println!("Class Diary Status");
            println!("==================");
            println!();
            println!("Sync:");
            match sync_code {
                Some(ref code) => println!("  Code:      {}", code),
                None => println!("  Code:      (not set)"),
            }
            println!(
                "  Auto-sync: {}",
                if settings.auto_sync {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  Server:    {}", config.sync_url);
            println!(
                "  API key:   {}",
                if config.api_key.is_some() {
                    "configured"
                } else {
                    "(not set)"
                }
            );
            println!("  Requests:  {}", settings.request_count);
            println!();
            println!("Schedule:");
            if let (Some(start), Some(end)) = (settings.schedule_start, settings.schedule_end) {
                println!("  Year:      {} .. {}", start, end);
            }
            if let Some(date) = settings.semester_break_date {
                println!("  Semester:  second half from {}", date);
            }
            println!("  Lessons:   {} per day", settings.max_lessons);
            println!("  Holidays:  {}", settings.holidays.len());
            println!();
            println!("Storage:");
            println!("  Location:  {}", config.data_dir.display());
            println!("  Homework:  {} entries", homeworks.len());
        }
    }

    Ok(())
}
