use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of "now" plus the configured timezone offset.
///
/// Recurrence math and the overdue sweep must not depend on where the host
/// happens to be running, so everything that needs a date or an instant reads
/// it through this trait instead of `Local`.
pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Configured zone, as a fixed offset east of UTC
    fn offset(&self) -> FixedOffset;

    /// Current instant translated into the configured zone
    fn now(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset())
    }

    /// Today's date in the configured zone
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock implementation with a configured offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build from the offset-minutes value stored in config
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Settable clock for tests; `advance` simulates arbitrary wall-clock gaps
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now: Mutex::new(now), offset }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
