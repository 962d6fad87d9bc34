//! Data models for the class diary
//!
//! Defines the persisted documents: `Settings` (schedule, holidays, sync
//! preferences) and the homework map, plus the `RemoteDocument` envelope
//! that is stored in the shared remote record.
//!
//! Field names serialize in camelCase so that documents written by any
//! client of the shared record decode here unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Homework content keyed by lesson key (`{date}-lesson-{period}`)
pub type HomeworkMap = BTreeMap<String, String>;

/// Default number of lessons per school day
pub const DEFAULT_MAX_LESSONS: u32 = 8;

/// School weekdays, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Weekday of a calendar date, `None` on weekends
    pub fn from_date(date: NaiveDate) -> Option<Self> {
        match date.weekday() {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }

    /// Storage key for this weekday
    pub fn key(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One scheduled period
///
/// Plain subjects serialize as a bare string; subgroup-bearing subjects as
/// `{"subject": ..., "subgroup": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonSlot {
    Subject(String),
    Grouped { subject: String, subgroup: u32 },
}

impl LessonSlot {
    /// Build a slot for a subject, attaching the subgroup only when the
    /// subject is subgroup-bearing and the number is in range.
    pub fn for_subject(subject: &str, subgroup: Option<u32>, subgroups: &Subgroups) -> Self {
        let subject = subject.trim().to_string();
        match (subgroup, subgroups.count(&subject)) {
            (Some(n), Some(max)) if n >= 1 && n <= max => LessonSlot::Grouped {
                subject,
                subgroup: n,
            },
            _ => LessonSlot::Subject(subject),
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            LessonSlot::Subject(subject) => subject,
            LessonSlot::Grouped { subject, .. } => subject,
        }
    }

    pub fn subgroup(&self) -> Option<u32> {
        match self {
            LessonSlot::Subject(_) => None,
            LessonSlot::Grouped { subgroup, .. } => Some(*subgroup),
        }
    }
}

impl fmt::Display for LessonSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonSlot::Subject(subject) => f.write_str(subject),
            LessonSlot::Grouped { subject, subgroup } => {
                write!(f, "{} (group {})", subject, subgroup)
            }
        }
    }
}

/// Subjects that are split into numbered subgroups, with their group count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subgroups(BTreeMap<String, u32>);

impl Default for Subgroups {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert("Трудовое обучение".to_string(), 2);
        table.insert("Иностранный язык".to_string(), 3);
        Self(table)
    }
}

impl Subgroups {
    /// Number of subgroups for a subject, if it has any
    pub fn count(&self, subject: &str) -> Option<u32> {
        self.0.get(subject.trim()).copied()
    }
}

/// Weekday → lesson sequence for one half of the school year
///
/// Index `i` in a day's sequence is period `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleTable(BTreeMap<Weekday, Vec<LessonSlot>>);

impl ScheduleTable {
    /// A table with every weekday present and no lessons
    pub fn with_weekdays() -> Self {
        Self(Weekday::ALL.iter().map(|day| (*day, Vec::new())).collect())
    }

    /// Lessons for a weekday (empty if the weekday is absent)
    pub fn day(&self, day: Weekday) -> &[LessonSlot] {
        self.0.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_day(&mut self, day: Weekday, lessons: Vec<LessonSlot>) {
        self.0.insert(day, lessons);
    }

    /// True when no weekday holds a lesson
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Drop lessons beyond `max` periods on every day
    pub fn truncate(&mut self, max: usize) {
        for lessons in self.0.values_mut() {
            lessons.truncate(max);
        }
    }
}

/// An inclusive holiday interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Holiday {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

/// Application settings
///
/// Every top-level field has a structural default, applied only when the
/// field is missing from a persisted document. A field that is present but
/// has the wrong shape is a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// First school day of the year
    #[serde(default, with = "optional_date")]
    pub schedule_start: Option<NaiveDate>,
    /// Last school day of the year
    #[serde(default, with = "optional_date")]
    pub schedule_end: Option<NaiveDate>,
    /// Date the second-half schedule takes effect
    #[serde(default, with = "optional_date")]
    pub semester_break_date: Option<NaiveDate>,
    /// Holiday intervals, in the order they were entered
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    /// Lessons per day (at least 1)
    #[serde(default = "default_max_lessons")]
    pub max_lessons: u32,
    #[serde(default)]
    pub theme: Theme,
    /// Shared sync identifier; empty when sync is not set up
    #[serde(default)]
    pub sync_code: String,
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    /// Number of successful sync cycles
    #[serde(default)]
    pub request_count: u64,
    #[serde(default = "ScheduleTable::with_weekdays")]
    pub schedule_first_half: ScheduleTable,
    #[serde(default = "ScheduleTable::with_weekdays")]
    pub schedule_second_half: ScheduleTable,
    /// Top-level fields this client does not know, kept for round trips
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_max_lessons() -> u32 {
    DEFAULT_MAX_LESSONS
}

fn default_auto_sync() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schedule_start: None,
            schedule_end: None,
            semester_break_date: None,
            holidays: Vec::new(),
            max_lessons: DEFAULT_MAX_LESSONS,
            theme: Theme::default(),
            sync_code: String::new(),
            auto_sync: true,
            request_count: 0,
            schedule_first_half: ScheduleTable::with_weekdays(),
            schedule_second_half: ScheduleTable::with_weekdays(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Fill unset year boundaries from the calendar year of `today`
    ///
    /// Start is Sep 1 of that year, end is May 31 and the semester break
    /// Jan 10 of the following year.
    pub fn fill_default_dates(&mut self, today: NaiveDate) {
        let year = today.year();
        if self.schedule_start.is_none() {
            self.schedule_start = NaiveDate::from_ymd_opt(year, 9, 1);
        }
        if self.schedule_end.is_none() {
            self.schedule_end = NaiveDate::from_ymd_opt(year + 1, 5, 31);
        }
        if self.semester_break_date.is_none() {
            self.semester_break_date = NaiveDate::from_ymd_opt(year + 1, 1, 10);
        }
    }

    pub fn has_sync_code(&self) -> bool {
        !self.sync_code.trim().is_empty()
    }

    /// Lessons scheduled on a date
    ///
    /// Empty on weekends and when no semester break is set.
    pub fn schedule_for(&self, date: NaiveDate) -> &[LessonSlot] {
        let (Some(semester_break), Some(day)) = (self.semester_break_date, Weekday::from_date(date))
        else {
            return &[];
        };

        if date < semester_break {
            self.schedule_first_half.day(day)
        } else {
            self.schedule_second_half.day(day)
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.iter().any(|holiday| holiday.contains(date))
    }
}

/// Partial settings update coming from a settings form
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub schedule_start: Option<NaiveDate>,
    pub schedule_end: Option<NaiveDate>,
    pub semester_break_date: Option<NaiveDate>,
    pub holidays: Option<Vec<Holiday>>,
    pub max_lessons: Option<u32>,
    pub theme: Option<Theme>,
    pub sync_code: Option<String>,
    pub auto_sync: Option<bool>,
    pub schedule_first_half: Option<ScheduleTable>,
    pub schedule_second_half: Option<ScheduleTable>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("maxLessons must be at least 1")]
    ZeroLessons,
    #[error("holiday ending {end} starts after it ends ({start})")]
    InvertedHoliday { start: NaiveDate, end: NaiveDate },
}

impl SettingsPatch {
    /// Apply the patch, keeping every schedule within `max_lessons`
    pub fn apply_to(self, settings: &mut Settings) -> Result<(), SettingsError> {
        if self.max_lessons == Some(0) {
            return Err(SettingsError::ZeroLessons);
        }
        if let Some(holidays) = &self.holidays {
            if let Some(bad) = holidays.iter().find(|h| h.start > h.end) {
                return Err(SettingsError::InvertedHoliday {
                    start: bad.start,
                    end: bad.end,
                });
            }
        }

        if let Some(date) = self.schedule_start {
            settings.schedule_start = Some(date);
        }
        if let Some(date) = self.schedule_end {
            settings.schedule_end = Some(date);
        }
        if let Some(date) = self.semester_break_date {
            settings.semester_break_date = Some(date);
        }
        if let Some(holidays) = self.holidays {
            settings.holidays = holidays;
        }
        if let Some(max) = self.max_lessons {
            settings.max_lessons = max;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(code) = self.sync_code {
            settings.sync_code = code.trim().to_string();
        }
        if let Some(auto_sync) = self.auto_sync {
            settings.auto_sync = auto_sync;
        }
        if let Some(table) = self.schedule_first_half {
            settings.schedule_first_half = table;
        }
        if let Some(table) = self.schedule_second_half {
            settings.schedule_second_half = table;
        }

        let max = settings.max_lessons as usize;
        settings.schedule_first_half.truncate(max);
        settings.schedule_second_half.truncate(max);
        Ok(())
    }
}

/// Identifies one lesson: a date and a zero-based period index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LessonKey {
    pub date: NaiveDate,
    pub period: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid lesson key '{0}', expected YYYY-MM-DD-lesson-N")]
pub struct LessonKeyError(String);

impl LessonKey {
    pub fn new(date: NaiveDate, period: usize) -> Self {
        Self { date, period }
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-lesson-{}", self.date.format("%Y-%m-%d"), self.period)
    }
}

impl FromStr for LessonKey {
    type Err = LessonKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LessonKeyError(s.to_string());
        let (date, period) = s.rsplit_once("-lesson-").ok_or_else(err)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| err())?;
        let period = period.parse().map_err(|_| err())?;
        Ok(Self { date, period })
    }
}

/// The shared record stored in the remote document store
///
/// Both payload fields tolerate being absent, which is how a partially
/// written record from another client shows up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub homeworks: Option<HomeworkMap>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl RemoteDocument {
    /// Snapshot for a push, stamped with the current time
    pub fn snapshot(settings: Settings, homeworks: HomeworkMap) -> Self {
        Self {
            settings: Some(settings),
            homeworks: Some(homeworks),
            last_sync: Some(Utc::now()),
        }
    }
}

/// `Option<NaiveDate>` as a `YYYY-MM-DD` string, with `""` for unset
mod optional_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.serialize_str(&date.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => NaiveDate::parse_from_str(value, FORMAT)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", value, e))),
        }
    }
}
