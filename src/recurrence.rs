//! Next-occurrence math for recurring tasks.
//!
//! Pure functions only: a completion instant (already translated into the
//! task's configured zone) goes in, the next deadline comes out. Malformed
//! configuration fails closed with `None` so bad data can never generate a
//! runaway stream of duplicate tasks.

use crate::domain::{Recurrence, RecurrenceKind};
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

/// Deadline time applied when a recurring task never had a time-of-day
pub fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Computed next occurrence of a recurring schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextOccurrence {
    /// Canonical deadline instant
    pub deadline: DateTime<Utc>,
    /// Display date in the configured zone
    pub due_date: NaiveDate,
    /// Display time in the configured zone
    pub due_time: NaiveTime,
}

/// Compute the next occurrence after completing a recurring task.
///
/// `completed_at` carries the configured zone; all calendar arithmetic stays
/// in that zone. `due_time` is the completed task's time-of-day, when it had
/// one. Returns `None` for non-recurring tasks and for malformed
/// configuration.
pub fn next_occurrence(
    rec: &Recurrence,
    completed_at: DateTime<FixedOffset>,
    due_time: Option<NaiveTime>,
) -> Option<NextOccurrence> {
    let completed_on = completed_at.date_naive();
    let due_date = match rec.kind {
        RecurrenceKind::None => return None,
        RecurrenceKind::Daily => completed_on.checked_add_days(Days::new(1))?,
        RecurrenceKind::Weekly => completed_on.checked_add_days(Days::new(7))?,
        RecurrenceKind::Weekdays => next_weekday(completed_on)?,
        RecurrenceKind::Custom => next_custom_day(completed_on, &rec.days)?,
    };

    let due_time = due_time.unwrap_or_else(default_due_time);
    let deadline = completed_at
        .timezone()
        .from_local_datetime(&due_date.and_time(due_time))
        .earliest()?
        .with_timezone(&Utc);

    Some(NextOccurrence { deadline, due_date, due_time })
}

/// First Monday..Friday strictly after `from`
fn next_weekday(from: NaiveDate) -> Option<NaiveDate> {
    let mut date = from.checked_add_days(Days::new(1))?;
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date.checked_add_days(Days::new(1))?;
    }
    Some(date)
}

/// First date in `from+1 ..= from+7` whose weekday index (0 = Sunday) is in
/// `days`. An empty or out-of-range set is malformed and yields `None`.
fn next_custom_day(from: NaiveDate, days: &[u8]) -> Option<NaiveDate> {
    if days.is_empty() || days.iter().any(|&d| d > 6) {
        return None;
    }
    (1..=7)
        .filter_map(|offset| from.checked_add_days(Days::new(offset)))
        .find(|date| days.contains(&(date.weekday().num_days_from_sunday() as u8)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn tz(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    fn at(s: &str, offset_hours: i32) -> DateTime<FixedOffset> {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        tz(offset_hours).from_local_datetime(&naive).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_none_yields_nothing() {
        assert_eq!(next_occurrence(&Recurrence::none(), at("2024-01-01 10:00", 0), None), None);
    }

    #[test]
    fn test_daily_keeps_the_original_time_of_day() {
        // Completing the 2024-01-01T23:59 task produces 2024-01-02T23:59
        let next = next_occurrence(
            &Recurrence::daily(),
            at("2024-01-01 08:15", 0),
            Some(time(23, 59)),
        )
        .unwrap();
        assert_eq!(next.due_date, date("2024-01-02"));
        assert_eq!(next.due_time, time(23, 59));
        assert_eq!(next.deadline, at("2024-01-02 23:59", 0).with_timezone(&Utc));
    }

    #[test]
    fn test_daily_defaults_to_end_of_day() {
        let next = next_occurrence(&Recurrence::daily(), at("2024-01-01 08:15", 0), None).unwrap();
        assert_eq!(next.due_time, time(23, 59));
    }

    #[test]
    fn test_weekdays_skips_the_weekend() {
        // 2024-01-05 is a Friday; the next weekday is Monday the 8th
        let next = next_occurrence(
            &Recurrence::weekdays(),
            at("2024-01-05 17:00", 0),
            Some(time(9, 0)),
        )
        .unwrap();
        assert_eq!(next.due_date, date("2024-01-08"));
        assert_eq!(next.due_date.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_weekdays_completed_midweek_lands_on_the_next_day() {
        // Tuesday -> Wednesday
        let next =
            next_occurrence(&Recurrence::weekdays(), at("2024-01-02 12:00", 0), None).unwrap();
        assert_eq!(next.due_date, date("2024-01-03"));
    }

    #[test]
    fn test_weekly_adds_seven_calendar_days() {
        let next = next_occurrence(
            &Recurrence::weekly(),
            at("2024-02-26 10:00", 0),
            Some(time(10, 30)),
        )
        .unwrap();
        assert_eq!(next.due_date, date("2024-03-04"));
        assert_eq!(next.due_time, time(10, 30));
    }

    #[test]
    fn test_custom_finds_the_next_configured_weekday() {
        // 2024-01-01 is a Monday; configured for Wednesday (3) and Saturday (6)
        let rec = Recurrence::custom(vec![3, 6]);
        let next = next_occurrence(&rec, at("2024-01-01 12:00", 0), None).unwrap();
        assert_eq!(next.due_date, date("2024-01-03"));
        assert_eq!(next.due_date.weekday(), Weekday::Wed);
    }

    #[test]
    fn test_custom_wraps_to_the_following_week() {
        // Completed on Wednesday with only Monday (1) configured
        let rec = Recurrence::custom(vec![1]);
        let next = next_occurrence(&rec, at("2024-01-03 12:00", 0), None).unwrap();
        assert_eq!(next.due_date, date("2024-01-08"));
        assert_eq!(next.due_date.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_custom_same_weekday_lands_a_full_week_out() {
        // Completed on a Monday with only Monday configured: never "today"
        let rec = Recurrence::custom(vec![1]);
        let next = next_occurrence(&rec, at("2024-01-01 12:00", 0), None).unwrap();
        assert_eq!(next.due_date, date("2024-01-08"));
    }

    #[test]
    fn test_malformed_custom_config_fails_closed() {
        assert_eq!(
            next_occurrence(&Recurrence::custom(vec![]), at("2024-01-01 12:00", 0), None),
            None
        );
        assert_eq!(
            next_occurrence(&Recurrence::custom(vec![2, 9]), at("2024-01-01 12:00", 0), None),
            None
        );
    }

    #[test]
    fn test_arithmetic_runs_in_the_configured_zone() {
        // 22:00 in Auckland (+13) is still the previous day in UTC; the next
        // daily occurrence must follow the configured zone's calendar.
        let next = next_occurrence(
            &Recurrence::daily(),
            at("2024-01-01 22:00", 13),
            Some(time(22, 30)),
        )
        .unwrap();
        assert_eq!(next.due_date, date("2024-01-02"));
        assert_eq!(next.deadline, at("2024-01-02 22:30", 13).with_timezone(&Utc));
    }
}
