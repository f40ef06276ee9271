//! The single global work timer.
//!
//! Elapsed time is never accumulated tick by tick: it is rederived on every
//! read from `started_at`, `total_paused_secs`, and one wall-clock instant.
//! That is what keeps the timer correct when the host throttles the tick
//! loop, suspends the process, or kills and relaunches it: the next `tick`
//! lands on the right value no matter how long ago the previous one ran.

use crate::config::AppConfig;
use crate::domain::PomodoroPhase;
use crate::store::{load_json, save_json, KvStore, StoreKey, StoreKind};
use crate::wakelock::{NoopWakeLock, WakeLock};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pomodoro settings the engine needs from config
#[derive(Debug, Clone, Copy)]
pub struct PomodoroConfig {
    pub enabled: bool,
    pub work_secs: i64,
    pub short_break_secs: i64,
    pub long_break_secs: i64,
    pub sessions_before_long_break: u32,
}

impl From<&AppConfig> for PomodoroConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            enabled: config.pomodoro_enabled,
            work_secs: config.work_secs,
            short_break_secs: config.short_break_secs,
            long_break_secs: config.long_break_secs,
            sessions_before_long_break: config.sessions_before_long_break,
        }
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Persisted timer snapshot. `elapsed_secs` is stored for display only; a
/// restored Running timer always rederives it from the wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimerState {
    #[serde(default)]
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_paused_secs: i64,
    #[serde(default)]
    pub elapsed_secs: i64,
    #[serde(default)]
    pub pomodoro_session: u32,
    #[serde(default)]
    pub pomodoro_phase: PomodoroPhase,
    /// Edge-trigger guard: set once the work-boundary signal has fired for
    /// the current phase, persisted so a restart does not refire it
    #[serde(default)]
    pub work_signal_sent: bool,
}

impl TimerState {
    fn is_live(&self) -> bool {
        self.is_running || self.is_paused
    }
}

/// Boundary signal surfaced by `tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// The work phase reached its configured length. The engine does not
    /// change phase or reset the clock; the caller acknowledges through
    /// `advance_phase`.
    WorkPhaseComplete,
}

/// Read-only view of the live timer, for the board's completion bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTimer {
    pub task_id: Uuid,
    pub elapsed_secs: i64,
}

/// State machine: Idle -> Running <-> Paused -> Idle.
///
/// All mutation goes through the methods below; each state-changing call
/// persists the full snapshot through the store collaborator.
pub struct TimerEngine {
    state: TimerState,
    pomodoro: PomodoroConfig,
    wake: Box<dyn WakeLock>,
}

impl TimerEngine {
    pub fn new(pomodoro: PomodoroConfig) -> Self {
        Self { state: TimerState::default(), pomodoro, wake: Box::new(NoopWakeLock) }
    }

    /// Restore the persisted snapshot. A corrupt or missing snapshot falls
    /// back to Idle; a Running snapshot rederives `elapsed_secs` from `now`
    /// so the timer catches up after suspension or relaunch.
    pub fn load(store: &dyn KvStore, now: DateTime<Utc>, pomodoro: PomodoroConfig) -> Self {
        let mut state: TimerState = load_json(store, &timer_key());
        if state.is_live() && state.started_at.is_none() {
            // Half-written snapshot; nothing trustworthy to resume from
            state = TimerState::default();
        }
        let mut engine = Self { state, pomodoro, wake: Box::new(NoopWakeLock) };
        if engine.state.is_live() {
            engine.state.elapsed_secs = engine.derived_elapsed(now);
        }
        if engine.is_running() {
            engine.wake.acquire();
        }
        engine
    }

    /// Replace the advisory wake lock collaborator
    pub fn with_wake_lock(mut self, wake: Box<dyn WakeLock>) -> Self {
        self.wake = wake;
        self
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running && !self.state.is_paused
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    pub fn is_idle(&self) -> bool {
        !self.state.is_live()
    }

    /// The live timer and its current elapsed seconds, if any
    pub fn active(&self) -> Option<ActiveTimer> {
        let task_id = self.state.task_id?;
        if !self.state.is_live() {
            return None;
        }
        Some(ActiveTimer { task_id, elapsed_secs: self.state.elapsed_secs })
    }

    /// Start a timer for `task_id`. Replace-old policy: an already-active
    /// timer is discarded and its task id returned so the caller can demote
    /// that task back to pending. Exactly one timer is live afterwards.
    pub fn start(
        &mut self,
        task_id: Uuid,
        now: DateTime<Utc>,
        store: &dyn KvStore,
    ) -> Result<Option<Uuid>> {
        let replaced = self.state.task_id.filter(|_| self.state.is_live());

        let (phase, session) = if self.pomodoro.enabled {
            (PomodoroPhase::Work, 1)
        } else {
            (PomodoroPhase::None, 0)
        };
        self.state = TimerState {
            task_id: Some(task_id),
            is_running: true,
            is_paused: false,
            started_at: Some(now),
            paused_at: None,
            total_paused_secs: 0,
            elapsed_secs: 0,
            pomodoro_session: session,
            pomodoro_phase: phase,
            work_signal_sent: false,
        };
        self.wake.acquire();
        self.save(store)?;
        Ok(replaced.filter(|id| *id != task_id))
    }

    /// Pause a running timer; no-op in any other state
    pub fn pause(&mut self, now: DateTime<Utc>, store: &dyn KvStore) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.state.paused_at = Some(now);
        self.state.is_paused = true;
        self.state.elapsed_secs = self.derived_elapsed(now);
        self.wake.release();
        self.save(store)
    }

    /// Resume a paused timer; no-op in any other state
    pub fn resume(&mut self, now: DateTime<Utc>, store: &dyn KvStore) -> Result<()> {
        if !self.state.is_paused {
            return Ok(());
        }
        if let Some(paused_at) = self.state.paused_at.take() {
            self.state.total_paused_secs += (now - paused_at).num_seconds().max(0);
        }
        self.state.is_paused = false;
        self.state.elapsed_secs = self.derived_elapsed(now);
        self.wake.acquire();
        self.save(store)
    }

    /// Stop without completing. Returns the task id whose in-progress claim
    /// was released; the caller demotes it back to pending. The persisted
    /// snapshot and any pending boundary signal go away with the state.
    pub fn stop(&mut self, store: &dyn KvStore) -> Result<Option<Uuid>> {
        if !self.state.is_live() {
            return Ok(None);
        }
        let released = self.state.task_id;
        self.reset(store)?;
        Ok(released)
    }

    /// Drop the timer if it points at `task_id`, invoked when that task is
    /// completed or soft-deleted externally. Cancels the pending boundary
    /// signal atomically with the state change; no-op for any other task.
    pub fn detach_task(&mut self, task_id: Uuid, store: &dyn KvStore) -> Result<()> {
        if self.state.task_id == Some(task_id) && self.state.is_live() {
            self.reset(store)?;
        }
        Ok(())
    }

    /// Rederive `elapsed_secs` from the wall clock and persist the snapshot.
    /// Correct whether called every second or once after an arbitrary gap.
    pub fn tick(&mut self, now: DateTime<Utc>, store: &dyn KvStore) -> Result<Option<TimerSignal>> {
        if !self.state.is_live() {
            return Ok(None);
        }
        self.state.elapsed_secs = self.derived_elapsed(now);

        let crossed = self.state.pomodoro_phase == PomodoroPhase::Work
            && self.pomodoro.work_secs > 0
            && self.state.elapsed_secs >= self.pomodoro.work_secs
            && !self.state.work_signal_sent;
        if crossed {
            self.state.work_signal_sent = true;
        }
        self.save(store)?;
        Ok(crossed.then_some(TimerSignal::WorkPhaseComplete))
    }

    /// Caller acknowledgement of a boundary signal: move to the next
    /// pomodoro phase, restart the clock, and re-arm the edge trigger
    pub fn advance_phase(&mut self, now: DateTime<Utc>, store: &dyn KvStore) -> Result<()> {
        if !self.state.is_live() || self.state.pomodoro_phase == PomodoroPhase::None {
            return Ok(());
        }
        let (phase, session) = match self.state.pomodoro_phase {
            PomodoroPhase::Work => {
                if self.state.pomodoro_session >= self.pomodoro.sessions_before_long_break {
                    (PomodoroPhase::LongBreak, self.state.pomodoro_session)
                } else {
                    (PomodoroPhase::Break, self.state.pomodoro_session)
                }
            }
            PomodoroPhase::Break => (PomodoroPhase::Work, self.state.pomodoro_session + 1),
            PomodoroPhase::LongBreak => (PomodoroPhase::Work, 1),
            PomodoroPhase::None => (PomodoroPhase::None, 0),
        };
        self.state.pomodoro_phase = phase;
        self.state.pomodoro_session = session;
        self.state.started_at = Some(now);
        self.state.paused_at = None;
        self.state.is_paused = false;
        self.state.total_paused_secs = 0;
        self.state.elapsed_secs = 0;
        self.state.work_signal_sent = false;
        self.save(store)
    }

    /// elapsed = max(0, (now − started_at) − total_paused_secs), with an
    /// ongoing pause frozen at `paused_at`
    fn derived_elapsed(&self, now: DateTime<Utc>) -> i64 {
        let Some(started_at) = self.state.started_at else {
            return 0;
        };
        let effective_now = match (self.state.is_paused, self.state.paused_at) {
            (true, Some(paused_at)) => paused_at,
            _ => now,
        };
        ((effective_now - started_at).num_seconds() - self.state.total_paused_secs).max(0)
    }

    fn reset(&mut self, store: &dyn KvStore) -> Result<()> {
        self.state = TimerState::default();
        self.wake.release();
        store.remove(&timer_key())
    }

    fn save(&self, store: &dyn KvStore) -> Result<()> {
        save_json(store, &timer_key(), &self.state)
    }
}

fn timer_key() -> StoreKey {
    StoreKey::new(StoreKind::Timer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wakelock::testing::CountingWakeLock;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap().and_utc()
    }

    fn t0() -> DateTime<Utc> {
        utc("2024-03-05 10:00:00")
    }

    fn engine(enabled: bool) -> TimerEngine {
        let pomodoro = PomodoroConfig { enabled, ..PomodoroConfig::default() };
        TimerEngine::new(pomodoro)
    }

    #[test]
    fn test_elapsed_is_derived_not_accumulated() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let task = Uuid::new_v4();

        timer.start(task, t0(), &store).unwrap();

        // One tick after 3 seconds, then nothing for an hour: a single late
        // tick still lands on the exact wall-clock value.
        timer.tick(t0() + chrono::Duration::seconds(3), &store).unwrap();
        assert_eq!(timer.state().elapsed_secs, 3);

        timer.tick(t0() + chrono::Duration::seconds(3600), &store).unwrap();
        assert_eq!(timer.state().elapsed_secs, 3600);
    }

    #[test]
    fn test_pause_excludes_paused_time_from_elapsed() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();

        // Run 60s, pause 300s, resume, run 40s
        timer.pause(t0() + chrono::Duration::seconds(60), &store).unwrap();
        assert_eq!(timer.state().elapsed_secs, 60);

        // Ticks while paused do not move elapsed
        timer.tick(t0() + chrono::Duration::seconds(200), &store).unwrap();
        assert_eq!(timer.state().elapsed_secs, 60);

        timer.resume(t0() + chrono::Duration::seconds(360), &store).unwrap();
        assert_eq!(timer.state().total_paused_secs, 300);

        timer.tick(t0() + chrono::Duration::seconds(400), &store).unwrap();
        assert_eq!(timer.state().elapsed_secs, 100);
    }

    #[test]
    fn test_out_of_state_calls_are_noops() {
        let store = MemoryStore::new();
        let mut timer = engine(false);

        // Nothing started yet
        timer.pause(t0(), &store).unwrap();
        timer.resume(t0(), &store).unwrap();
        assert_eq!(timer.stop(&store).unwrap(), None);
        assert_eq!(timer.tick(t0(), &store).unwrap(), None);
        assert!(timer.is_idle());

        // Resume while running, pause while paused
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();
        timer.resume(t0() + chrono::Duration::seconds(5), &store).unwrap();
        assert_eq!(timer.state().total_paused_secs, 0);

        timer.pause(t0() + chrono::Duration::seconds(10), &store).unwrap();
        timer.pause(t0() + chrono::Duration::seconds(20), &store).unwrap();
        assert_eq!(timer.state().paused_at, Some(t0() + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_start_replaces_the_active_timer() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        timer.start(a, t0(), &store).unwrap();
        let replaced = timer.start(b, t0() + chrono::Duration::seconds(30), &store).unwrap();

        assert_eq!(replaced, Some(a));
        assert_eq!(timer.state().task_id, Some(b));
        assert_eq!(timer.state().elapsed_secs, 0);
        assert!(timer.is_running());
    }

    #[test]
    fn test_restarting_the_same_task_reports_no_replacement() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let a = Uuid::new_v4();

        timer.start(a, t0(), &store).unwrap();
        let replaced = timer.start(a, t0() + chrono::Duration::seconds(30), &store).unwrap();
        assert_eq!(replaced, None);
    }

    #[test]
    fn test_stop_releases_the_task_and_clears_the_snapshot() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let task = Uuid::new_v4();

        timer.start(task, t0(), &store).unwrap();
        assert!(store.get(&timer_key()).unwrap().is_some());

        assert_eq!(timer.stop(&store).unwrap(), Some(task));
        assert!(timer.is_idle());
        assert!(store.get(&timer_key()).unwrap().is_none());
    }

    #[test]
    fn test_boundary_signal_fires_exactly_once() {
        let store = MemoryStore::new();
        let mut timer = engine(true);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();

        let work = PomodoroConfig::default().work_secs;
        let crossing = t0() + chrono::Duration::seconds(work);

        assert_eq!(
            timer.tick(crossing, &store).unwrap(),
            Some(TimerSignal::WorkPhaseComplete)
        );
        // Fifty more ticks past the threshold: no refire
        for i in 1..=50 {
            let now = crossing + chrono::Duration::seconds(i);
            assert_eq!(timer.tick(now, &store).unwrap(), None);
        }
    }

    #[test]
    fn test_advance_phase_walks_work_break_cycle() {
        let store = MemoryStore::new();
        let mut timer = engine(true);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::Work);
        assert_eq!(timer.state().pomodoro_session, 1);

        timer.advance_phase(t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::Break);

        timer.advance_phase(t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::Work);
        assert_eq!(timer.state().pomodoro_session, 2);

        // Sessions 2, 3 cycle through short breaks; session 4 earns the long one
        for _ in 0..2 {
            timer.advance_phase(t0(), &store).unwrap();
            timer.advance_phase(t0(), &store).unwrap();
        }
        assert_eq!(timer.state().pomodoro_session, 4);
        timer.advance_phase(t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::LongBreak);

        timer.advance_phase(t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::Work);
        assert_eq!(timer.state().pomodoro_session, 1);
    }

    #[test]
    fn test_advance_phase_rearms_the_boundary_signal() {
        let store = MemoryStore::new();
        let mut timer = engine(true);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();

        let work = PomodoroConfig::default().work_secs;
        let first = t0() + chrono::Duration::seconds(work);
        assert!(timer.tick(first, &store).unwrap().is_some());

        timer.advance_phase(first, &store).unwrap(); // -> Break
        timer.advance_phase(first, &store).unwrap(); // -> Work, clock restarted

        let second = first + chrono::Duration::seconds(work);
        assert_eq!(
            timer.tick(second, &store).unwrap(),
            Some(TimerSignal::WorkPhaseComplete)
        );
    }

    #[test]
    fn test_detach_task_cancels_pending_signal() {
        let store = MemoryStore::new();
        let mut timer = engine(true);
        let task = Uuid::new_v4();
        timer.start(task, t0(), &store).unwrap();

        // Past the boundary but not yet ticked: the signal is pending
        let late = t0() + chrono::Duration::seconds(PomodoroConfig::default().work_secs + 10);
        timer.detach_task(task, &store).unwrap();

        assert!(timer.is_idle());
        assert_eq!(timer.tick(late, &store).unwrap(), None);
    }

    #[test]
    fn test_detach_other_task_is_a_noop() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let task = Uuid::new_v4();
        timer.start(task, t0(), &store).unwrap();

        timer.detach_task(Uuid::new_v4(), &store).unwrap();
        assert!(timer.is_running());
        assert_eq!(timer.state().task_id, Some(task));
    }

    #[test]
    fn test_restore_recomputes_elapsed_from_the_current_clock() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        let task = Uuid::new_v4();

        timer.start(task, t0(), &store).unwrap();
        timer.tick(t0() + chrono::Duration::seconds(10), &store).unwrap();
        drop(timer);

        // Relaunch two hours later: the stored elapsed (10s) is stale and
        // must not be trusted.
        let relaunch = t0() + chrono::Duration::seconds(7200);
        let restored = TimerEngine::load(&store, relaunch, PomodoroConfig::default());
        assert!(restored.is_running());
        assert_eq!(restored.state().task_id, Some(task));
        assert_eq!(restored.state().elapsed_secs, 7200);
    }

    #[test]
    fn test_restore_of_paused_timer_keeps_elapsed_frozen() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();
        timer.pause(t0() + chrono::Duration::seconds(45), &store).unwrap();
        drop(timer);

        let relaunch = t0() + chrono::Duration::seconds(5000);
        let restored = TimerEngine::load(&store, relaunch, PomodoroConfig::default());
        assert!(restored.is_paused());
        assert_eq!(restored.state().elapsed_secs, 45);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_idle() {
        let store = MemoryStore::new();
        store.set(&timer_key(), "{\"task_id\": 17, nonsense").unwrap();

        let timer = TimerEngine::load(&store, t0(), PomodoroConfig::default());
        assert!(timer.is_idle());
        assert_eq!(timer.state(), &TimerState::default());
    }

    #[test]
    fn test_running_snapshot_without_start_instant_falls_back_to_idle() {
        let store = MemoryStore::new();
        store
            .set(&timer_key(), r#"{"is_running": true, "elapsed_secs": 900}"#)
            .unwrap();

        let timer = TimerEngine::load(&store, t0(), PomodoroConfig::default());
        assert!(timer.is_idle());
    }

    #[test]
    fn test_wake_lock_follows_run_state() {
        let store = MemoryStore::new();
        let lock = CountingWakeLock::default();
        let (acquired, released) = lock.counters();
        let mut timer = engine(false).with_wake_lock(Box::new(lock));

        timer.start(Uuid::new_v4(), t0(), &store).unwrap();
        timer.pause(t0() + chrono::Duration::seconds(1), &store).unwrap();
        timer.resume(t0() + chrono::Duration::seconds(2), &store).unwrap();
        timer.stop(&store).unwrap();

        use std::sync::atomic::Ordering;
        assert_eq!(acquired.load(Ordering::SeqCst), 2); // start + resume
        assert_eq!(released.load(Ordering::SeqCst), 2); // pause + stop
    }

    #[test]
    fn test_pomodoro_disabled_never_signals() {
        let store = MemoryStore::new();
        let mut timer = engine(false);
        timer.start(Uuid::new_v4(), t0(), &store).unwrap();
        assert_eq!(timer.state().pomodoro_phase, PomodoroPhase::None);

        let far = t0() + chrono::Duration::seconds(10 * 3600);
        assert_eq!(timer.tick(far, &store).unwrap(), None);
    }
}
