use super::enums::Quadrant;
use super::task::{Recurrence, Task};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Field delta applied by `TaskBoard::update_task`. Outer `Option` = "field
/// present in the update"; the inner `Option` on `deadline`/`xp_reward`
/// distinguishes setting a value from clearing it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub recurring: Option<Recurrence>,
    pub xp_reward: Option<Option<u32>>,
}

impl TaskPatch {
    pub fn deadline(instant: Option<DateTime<Utc>>) -> Self {
        Self { deadline: Some(instant), ..Self::default() }
    }

    pub fn quadrant(quadrant: Quadrant) -> Self {
        Self { quadrant: Some(quadrant), ..Self::default() }
    }
}

/// Derive the quadrant a task ends up in after applying `patch`.
///
/// `do_first` means "urgent today". When an update moves or clears the
/// deadline so it no longer falls on today in the configured zone, the task
/// is demoted to `schedule`. An explicit quadrant in the patch always wins,
/// and tasks outside `do_first` are never reclassified here.
pub fn derive_quadrant(
    task: &Task,
    patch: &TaskPatch,
    today: NaiveDate,
    tz: FixedOffset,
) -> Quadrant {
    if let Some(explicit) = patch.quadrant {
        return explicit;
    }
    if task.quadrant != Quadrant::DoFirst {
        return task.quadrant;
    }
    let Some(new_deadline) = patch.deadline else {
        return task.quadrant;
    };
    let due_today = new_deadline
        .map(|at| at.with_timezone(&tz).date_naive() == today)
        .unwrap_or(false);
    if due_today {
        Quadrant::DoFirst
    } else {
        Quadrant::Schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::NewTask;
    use chrono::NaiveDateTime;

    fn tz_plus2() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap().and_utc()
    }

    fn do_first_task(deadline: Option<DateTime<Utc>>) -> Task {
        let mut draft = NewTask::titled("t");
        draft.quadrant = Some(Quadrant::DoFirst);
        draft.deadline = deadline;
        Task::new(draft, utc("2024-03-05 08:00"), tz_plus2())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_clearing_deadline_demotes_do_first() {
        let task = do_first_task(Some(utc("2024-03-05 15:00")));
        let patch = TaskPatch::deadline(None);
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Schedule);
    }

    #[test]
    fn test_moving_deadline_off_today_demotes_do_first() {
        let task = do_first_task(Some(utc("2024-03-05 15:00")));
        let patch = TaskPatch::deadline(Some(utc("2024-03-08 15:00")));
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Schedule);
    }

    #[test]
    fn test_deadline_still_today_keeps_do_first() {
        let task = do_first_task(Some(utc("2024-03-05 09:00")));
        let patch = TaskPatch::deadline(Some(utc("2024-03-05 19:00")));
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::DoFirst);
    }

    #[test]
    fn test_today_is_judged_in_the_configured_zone() {
        let task = do_first_task(Some(utc("2024-03-05 09:00")));
        // 22:30 UTC on the 5th is already the 6th at +02:00
        let patch = TaskPatch::deadline(Some(utc("2024-03-05 22:30")));
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Schedule);
    }

    #[test]
    fn test_non_do_first_is_never_reclassified() {
        let mut task = do_first_task(Some(utc("2024-03-05 15:00")));
        task.quadrant = Quadrant::Schedule;
        let patch = TaskPatch::deadline(None);
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Schedule);

        task.quadrant = Quadrant::Delegate;
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Delegate);
    }

    #[test]
    fn test_explicit_quadrant_in_patch_wins() {
        let task = do_first_task(Some(utc("2024-03-05 15:00")));
        let patch = TaskPatch {
            quadrant: Some(Quadrant::Eliminate),
            deadline: Some(None),
            ..TaskPatch::default()
        };
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::Eliminate);
    }

    #[test]
    fn test_patch_without_deadline_change_keeps_quadrant() {
        let task = do_first_task(Some(utc("2024-03-05 15:00")));
        let patch = TaskPatch { title: Some("renamed".into()), ..TaskPatch::default() };
        assert_eq!(derive_quadrant(&task, &patch, today(), tz_plus2()), Quadrant::DoFirst);
    }
}
