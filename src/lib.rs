//! # quadro
//!
//! Eisenhower-matrix task tracker: a task lifecycle manager with a
//! parent/child hierarchy and soft-delete trash, a recurrence calculator
//! that regenerates recurring tasks on completion, and a single global work
//! timer whose elapsed time is derived from wall-clock instants, so it
//! survives suspension, throttled ticking, and process restarts.
//!
//! The core lives in three modules:
//!
//! *   [`board`] is the task collection, state transitions, hierarchy and
//!     dependency bookkeeping, and trash.
//! *   [`timer`] is the singleton countdown/count-up engine with pomodoro
//!     phase signaling.
//! *   [`recurrence`] is pure next-occurrence math.
//!
//! External collaborators are narrow traits: [`store::KvStore`] for JSON
//! snapshots, [`clock::Clock`] for "now in the configured timezone",
//! [`rewards::CompletionSink`] for completion events, and
//! [`wakelock::WakeLock`] as an advisory screen lock.

pub mod board;
pub mod clock;
pub mod config;
pub mod domain;
pub mod recurrence;
pub mod rewards;
pub mod store;
pub mod ticker;
pub mod timer;
pub mod wakelock;

pub use board::{BoardError, TaskBoard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use domain::{
    derive_quadrant, NewTask, PomodoroPhase, Quadrant, Recurrence, RecurrenceKind, Task,
    TaskPatch, TaskStatus,
};
pub use recurrence::{next_occurrence, NextOccurrence};
pub use rewards::{CompletionSink, NoopSink};
pub use store::{FileStore, KvStore, MemoryStore, StoreKey, StoreKind};
pub use timer::{ActiveTimer, PomodoroConfig, TimerEngine, TimerSignal, TimerState};
pub use wakelock::{NoopWakeLock, WakeLock};
