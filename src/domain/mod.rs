pub mod enums;
pub mod patch;
pub mod task;

pub use enums::{PomodoroPhase, Quadrant, RecurrenceKind, TaskStatus};
pub use patch::{derive_quadrant, TaskPatch};
pub use task::{NewTask, Recurrence, Task};
