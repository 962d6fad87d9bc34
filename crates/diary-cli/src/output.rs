//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::NaiveDate;
use serde::Serialize;

use diary_core::{Settings, StatusReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One lesson of a week listing
#[derive(Debug, Clone, Serialize)]
pub struct LessonRow {
    pub date: NaiveDate,
    pub period: usize,
    pub subject: Option<String>,
    pub homework: Option<String>,
}

/// One school day of a week listing
#[derive(Debug, Clone, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub weekday: String,
    pub holiday: bool,
    pub lessons: Vec<LessonRow>,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a week of lessons with their homework
    pub fn print_week(&self, days: &[DayRow]) {
        match self.format {
            OutputFormat::Human => {
                for day in days {
                    println!("{} {}", day.date.format("%Y-%m-%d"), day.weekday);
                    if day.holiday {
                        println!("  (holiday)");
                        continue;
                    }
                    if day.lessons.is_empty() {
                        println!("  (no lessons)");
                        continue;
                    }
                    for lesson in &day.lessons {
                        println!(
                            "  {}. {:<30} {}",
                            lesson.period + 1,
                            truncate(lesson.subject.as_deref().unwrap_or("-"), 30),
                            lesson
                                .homework
                                .as_deref()
                                .map(|hw| truncate_line(hw, 40))
                                .unwrap_or_default()
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(days),
            OutputFormat::Quiet => {
                for lesson in days.iter().flat_map(|day| &day.lessons) {
                    if let Some(ref hw) = lesson.homework {
                        println!("{}-lesson-{}\t{}", lesson.date, lesson.period, hw);
                    }
                }
            }
        }
    }

    /// Print one homework entry
    pub fn print_homework(&self, key: &str, homework: Option<&str>) {
        match self.format {
            OutputFormat::Human => match homework {
                Some(text) => println!("{}", text),
                None => println!("No homework for {}.", key),
            },
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"key": key, "homework": homework}));
            }
            OutputFormat::Quiet => {
                if let Some(text) = homework {
                    println!("{}", text);
                }
            }
        }
    }

    /// Print the settings document
    pub fn print_settings(&self, settings: &Settings) {
        match self.format {
            OutputFormat::Human => {
                println!("Settings:");
                println!("  schedule_start:      {}", date_or_unset(settings.schedule_start));
                println!("  schedule_end:        {}", date_or_unset(settings.schedule_end));
                println!(
                    "  semester_break_date: {}",
                    date_or_unset(settings.semester_break_date)
                );
                println!("  max_lessons:         {}", settings.max_lessons);
                println!("  theme:               {}", settings.theme);
                println!(
                    "  sync_code:           {}",
                    if settings.has_sync_code() {
                        settings.sync_code.as_str()
                    } else {
                        "(not set)"
                    }
                );
                println!("  auto_sync:           {}", settings.auto_sync);
                println!("  request_count:       {}", settings.request_count);
                if settings.holidays.is_empty() {
                    println!("  holidays:            (none)");
                } else {
                    println!("  holidays:");
                    for holiday in &settings.holidays {
                        println!("    {} .. {}", holiday.start, holiday.end);
                    }
                }
            }
            OutputFormat::Json => print_json(settings),
            OutputFormat::Quiet => {}
        }
    }

    /// Print the sync indicator
    pub fn print_sync_status(&self, report: &StatusReport) {
        match self.format {
            OutputFormat::Human => {
                if report.message.is_empty() {
                    println!("Sync: {}", report.status);
                } else {
                    println!("Sync: {} - {}", report.status, report.message);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": report.status.to_string(),
                        "message": report.message
                    })
                );
            }
            OutputFormat::Quiet => println!("{}", report.status),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn date_or_unset(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
