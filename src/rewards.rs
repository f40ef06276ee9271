use crate::domain::Quadrant;
use chrono::FixedOffset;

/// One-way completion sink owned by the rewards collaborator.
///
/// The board fires this on every completion and ignores the outcome; reward
/// math lives entirely on the other side of this interface.
pub trait CompletionSink {
    fn on_task_completed(
        &self,
        quadrant: Quadrant,
        duration_secs: i64,
        tz: FixedOffset,
        bonus: Option<u32>,
    );
}

impl<T: CompletionSink + ?Sized> CompletionSink for std::sync::Arc<T> {
    fn on_task_completed(
        &self,
        quadrant: Quadrant,
        duration_secs: i64,
        tz: FixedOffset,
        bonus: Option<u32>,
    ) {
        (**self).on_task_completed(quadrant, duration_secs, tz, bonus);
    }
}

/// Default sink that swallows completion events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn on_task_completed(
        &self,
        _quadrant: Quadrant,
        _duration_secs: i64,
        _tz: FixedOffset,
        _bonus: Option<u32>,
    ) {
    }
}
