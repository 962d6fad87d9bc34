//! Merge engine
//!
//! Combines a local and a remote snapshot into one. The policy is local
//! priority, field by field:
//!
//! - Scalar settings fields always come from the local snapshot, even when
//!   the local value is a default.
//! - The two schedule tables and the holiday list come from the local
//!   snapshot only when the local value is non-empty; an empty local value
//!   lets the remote one through. A table taken from the remote is not
//!   checked against the local `max_lessons`, so a weekday can end up with
//!   more lessons than the local limit.
//! - Homework entries are unioned by key, local text winning on shared
//!   keys. There are no tombstones, so an entry removed locally but still
//!   present remotely comes back after a merge.
//!
//! Both merges are pure and idempotent: merging the same local snapshot
//! into an already-merged result changes nothing.

use crate::models::{HomeworkMap, Settings};

/// Merge remote settings into local settings
pub fn merge_settings(local: &Settings, remote: Option<&Settings>) -> Settings {
    let Some(remote) = remote else {
        return local.clone();
    };

    let mut extra = remote.extra.clone();
    extra.extend(local.extra.clone());

    Settings {
        schedule_start: local.schedule_start,
        schedule_end: local.schedule_end,
        semester_break_date: local.semester_break_date,
        holidays: if local.holidays.is_empty() {
            remote.holidays.clone()
        } else {
            local.holidays.clone()
        },
        max_lessons: local.max_lessons,
        theme: local.theme,
        sync_code: local.sync_code.clone(),
        auto_sync: local.auto_sync,
        request_count: local.request_count,
        schedule_first_half: if local.schedule_first_half.is_empty() {
            remote.schedule_first_half.clone()
        } else {
            local.schedule_first_half.clone()
        },
        schedule_second_half: if local.schedule_second_half.is_empty() {
            remote.schedule_second_half.clone()
        } else {
            local.schedule_second_half.clone()
        },
        extra,
    }
}

/// Merge remote homework into local homework
pub fn merge_homeworks(local: &HomeworkMap, remote: Option<&HomeworkMap>) -> HomeworkMap {
    let Some(remote) = remote else {
        return local.clone();
    };

    let mut merged = remote.clone();
    merged.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
