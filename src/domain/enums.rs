use serde::{Deserialize, Serialize};

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Overdue,
}

impl TaskStatus {
    /// Parse status from a tag like "PENDING"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "DONE" => Some(Self::Done),
            "OVERDUE" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Convert status to a display tag
    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Overdue => "OVERDUE",
        }
    }

    /// Check if a task in this status still counts toward the manual ordering
    /// sequence (pending and in-progress tasks do; done/overdue do not)
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Eisenhower priority bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Urgent and important
    DoFirst,
    /// Important, not urgent
    Schedule,
    /// Urgent, not important
    Delegate,
    /// Neither
    Eliminate,
}

impl Quadrant {
    /// Convert quadrant to a display tag
    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::DoFirst => "DO_FIRST",
            Self::Schedule => "SCHEDULE",
            Self::Delegate => "DELEGATE",
            Self::Eliminate => "ELIMINATE",
        }
    }

    /// Parse quadrant from a tag like "DO_FIRST"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_uppercase().as_str() {
            "DO_FIRST" => Some(Self::DoFirst),
            "SCHEDULE" => Some(Self::Schedule),
            "DELEGATE" => Some(Self::Delegate),
            "ELIMINATE" => Some(Self::Eliminate),
            _ => None,
        }
    }
}

/// Recurrence schedule kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekly,
    Custom,
}

impl RecurrenceKind {
    /// Check if this kind spawns a follow-up task on completion
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Pomodoro phase tracked by the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroPhase {
    #[default]
    None,
    Work,
    Break,
    LongBreak,
}
