use super::enums::{Quadrant, RecurrenceKind, TaskStatus};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurrence schedule attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Recurrence {
    pub kind: RecurrenceKind,
    /// Weekday indices for `Custom` (0 = Sunday .. 6 = Saturday)
    #[serde(default)]
    pub days: Vec<u8>,
}

impl Recurrence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn daily() -> Self {
        Self { kind: RecurrenceKind::Daily, days: Vec::new() }
    }

    pub fn weekdays() -> Self {
        Self { kind: RecurrenceKind::Weekdays, days: Vec::new() }
    }

    pub fn weekly() -> Self {
        Self { kind: RecurrenceKind::Weekly, days: Vec::new() }
    }

    pub fn custom(days: Vec<u8>) -> Self {
        Self { kind: RecurrenceKind::Custom, days }
    }
}

/// Parameters for creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub quadrant: Option<Quadrant>,
    pub deadline: Option<DateTime<Utc>>,
    pub recurring: Option<Recurrence>,
    pub parent_id: Option<Uuid>,
    pub depends_on: Vec<Uuid>,
    pub xp_reward: Option<u32>,
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

/// A task in the matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique ID for internal references
    pub id: Uuid,
    /// Task title
    pub title: String,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Eisenhower bucket
    pub quadrant: Quadrant,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task was completed (if done)
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the task was soft-deleted (set only while in trash)
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Canonical deadline instant
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// Display date in the configured zone; kept consistent with `deadline`
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Display time in the configured zone; kept consistent with `deadline`
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    /// Accumulated worked seconds; grows only through completion
    #[serde(default)]
    pub duration_secs: i64,
    /// Manual sequence among open root tasks
    #[serde(default)]
    pub order: usize,
    /// Parent task, if this is a subtask
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Subtask ids; mirror of the children's `parent_id`
    #[serde(default)]
    pub children: Vec<Uuid>,
    /// Tasks that must be done before this one should start
    #[serde(default)]
    pub depends_on: Vec<Uuid>,
    /// Recurrence schedule
    #[serde(default)]
    pub recurring: Recurrence,
    /// Bonus reward forwarded to the rewards sink on completion; not
    /// interpreted by the core
    #[serde(default)]
    pub xp_reward: Option<u32>,
    /// Collaborator-owned fields (finance record, template linkage, topic
    /// tag, ...) carried through serialization untouched
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(draft: NewTask, now: DateTime<Utc>, tz: FixedOffset) -> Self {
        let mut task = Self {
            id: Uuid::new_v4(),
            title: draft.title,
            status: TaskStatus::Pending,
            quadrant: draft.quadrant.unwrap_or(Quadrant::Schedule),
            created_at: now,
            completed_at: None,
            deleted_at: None,
            deadline: None,
            due_date: None,
            due_time: None,
            duration_secs: 0,
            order: 0,
            parent_id: draft.parent_id,
            children: Vec::new(),
            depends_on: draft.depends_on,
            recurring: draft.recurring.unwrap_or_default(),
            xp_reward: draft.xp_reward,
            extras: draft.extras,
        };
        task.set_deadline(draft.deadline, tz);
        task
    }

    /// Set the canonical deadline and rederive the display date/time pair in
    /// the configured zone. The only mutation path for these three fields.
    pub fn set_deadline(&mut self, instant: Option<DateTime<Utc>>, tz: FixedOffset) {
        self.deadline = instant;
        match instant {
            Some(at) => {
                let local = at.with_timezone(&tz);
                self.due_date = Some(local.date_naive());
                self.due_time = Some(local.time());
            }
            None => {
                self.due_date = None;
                self.due_time = None;
            }
        }
    }

    /// Set the deadline from a display date/time pair in the configured zone
    pub fn set_deadline_local(&mut self, date: NaiveDate, time: NaiveTime, tz: FixedOffset) {
        let instant = tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        self.set_deadline(instant, tz);
    }

    /// The deadline's date in the configured zone, if any
    pub fn deadline_date(&self, tz: FixedOffset) -> Option<NaiveDate> {
        self.deadline.map(|at| at.with_timezone(&tz).date_naive())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
