//! Class Diary CLI
//!
//! Command-line interface for the class diary - schedule, homework and
//! remote sync.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use diary_core::models::Weekday;
use diary_core::{Config, Diary, StorageError};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "diary")]
#[command(about = "Class diary - lesson schedule and homework with remote sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show settings summary and sync configuration
    Status,
    /// Sync with the remote store now
    Sync,
    /// Read or write homework
    #[command(alias = "hw")]
    Homework {
        #[command(subcommand)]
        command: HomeworkCommands,
    },
    /// Show or change diary settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Show or set application configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum HomeworkCommands {
    /// List homework for a school week
    #[command(alias = "ls")]
    List {
        /// Any date in the week (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show the homework for one lesson
    Get {
        /// Lesson date (YYYY-MM-DD)
        date: NaiveDate,
        /// Lesson number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        lesson: u32,
    },
    /// Set the homework for one lesson
    Set {
        /// Lesson date (YYYY-MM-DD)
        date: NaiveDate,
        /// Lesson number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        lesson: u32,
        /// Homework text
        text: String,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Set a settings value
    Set {
        /// Settings key (sync_code, auto_sync, max_lessons, theme,
        /// schedule_start, schedule_end, semester_break_date)
        key: String,
        /// Settings value
        value: String,
    },
    /// Manage holidays
    Holiday {
        #[command(subcommand)]
        command: HolidayCommands,
    },
    /// Set the subject of one lesson in a schedule table
    Lesson {
        /// Which half of the year
        #[arg(value_enum)]
        half: Half,
        /// Weekday (monday..friday)
        #[arg(value_enum)]
        weekday: WeekdayArg,
        /// Lesson number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        lesson: u32,
        /// Subject name (empty to clear the lesson)
        subject: String,
        /// Subgroup, for subjects taught in subgroups
        #[arg(short, long)]
        subgroup: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Half {
    First,
    Second,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeekdayArg {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl From<WeekdayArg> for Weekday {
    fn from(arg: WeekdayArg) -> Self {
        match arg {
            WeekdayArg::Monday => Weekday::Monday,
            WeekdayArg::Tuesday => Weekday::Tuesday,
            WeekdayArg::Wednesday => Weekday::Wednesday,
            WeekdayArg::Thursday => Weekday::Thursday,
            WeekdayArg::Friday => Weekday::Friday,
        }
    }
}

#[derive(Subcommand)]
enum HolidayCommands {
    /// Add a holiday interval (inclusive)
    Add { start: NaiveDate, end: NaiveDate },
    /// Remove all holidays
    Clear,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the diary
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut diary = Diary::open(&config).context("Failed to open diary")?;

    let result = match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => {
            commands::status::show(&diary, &config, &output).await?;
            output.print_sync_status(&diary.current_sync_status());
            Ok(())
        }
        Commands::Sync => commands::sync::sync(&diary, &output).await,
        Commands::Homework { command } => match command {
            HomeworkCommands::List { date } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                commands::homework::list(&diary, date, &output).await
            }
            HomeworkCommands::Get { date, lesson } => {
                commands::homework::get(&diary, date, lesson as usize - 1, &output).await
            }
            HomeworkCommands::Set { date, lesson, text } => {
                // Scheduler runs so the edit queues a sync; shutdown flushes it
                diary.start().await?;
                let result =
                    commands::homework::set(&diary, date, lesson as usize - 1, text, &output)
                        .await;
                diary.shutdown().await;
                result
            }
        },
        Commands::Settings { command } => match command {
            Some(SettingsCommands::Show) | None => {
                commands::settings::show(&diary, &output).await
            }
            Some(SettingsCommands::Set { key, value }) => {
                commands::settings::set(&diary, key, value, &output).await
            }
            Some(SettingsCommands::Holiday { command }) => match command {
                HolidayCommands::Add { start, end } => {
                    commands::settings::add_holiday(&diary, start, end, &output).await
                }
                HolidayCommands::Clear => {
                    commands::settings::clear_holidays(&diary, &output).await
                }
            },
            Some(SettingsCommands::Lesson {
                half,
                weekday,
                lesson,
                subject,
                subgroup,
            }) => {
                commands::settings::set_lesson(
                    &diary,
                    matches!(half, Half::Second),
                    weekday.into(),
                    lesson as usize - 1,
                    subject,
                    subgroup,
                    &config.subgroups,
                    &output,
                )
                .await
            }
        },
    };

    if let Err(ref e) = result {
        print_recovery_hint(e, &output);
    }
    result
}

/// Point at a fix when the failure came from local storage
fn print_recovery_hint(error: &anyhow::Error, output: &Output) {
    let suggestion = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion);

    if let Some(suggestion) = suggestion {
        output.warning(suggestion);
    }
}

/// Initialize file-based logging when DIARY_LOG is set
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("DIARY_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("diary_core={},diary={}", log_level, log_level));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
