//! The task board: single state container for the live task arena and the
//! trash set.
//!
//! Hierarchy and dependencies are stored as id references and every
//! traversal walks the arena by id, so a soft-deleted subtree can never
//! leave a dangling reference behind. All mutation goes through the methods
//! here; callers never touch task fields directly.

use crate::clock::Clock;
use crate::domain::{derive_quadrant, NewTask, Task, TaskPatch, TaskStatus};
use crate::recurrence::next_occurrence;
use crate::rewards::{CompletionSink, NoopSink};
use crate::store::{load_json, save_json, KvStore, StoreKey, StoreKind};
use crate::timer::ActiveTimer;
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("unknown task id {0}")]
    UnknownTask(Uuid),
    #[error("dependency would create a cycle")]
    DependencyCycle,
}

/// Task collection + trash, with a `dirty` flag so callers persist only
/// after something actually changed
pub struct TaskBoard {
    tasks: HashMap<Uuid, Task>,
    trash: HashMap<Uuid, Task>,
    scope: Option<String>,
    sink: Box<dyn CompletionSink>,
    dirty: bool,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            trash: HashMap::new(),
            scope: None,
            sink: Box::new(NoopSink),
            dirty: false,
        }
    }

    /// Load the task and trash snapshots. Missing or corrupt snapshots are
    /// "nothing saved" and yield an empty board.
    pub fn load(store: &dyn KvStore, scope: Option<&str>) -> Self {
        let tasks: Vec<Task> = load_json(store, &key(StoreKind::Tasks, scope));
        let trash: Vec<Task> = load_json(store, &key(StoreKind::Trash, scope));
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            trash: trash.into_iter().map(|t| (t.id, t)).collect(),
            scope: scope.map(String::from),
            sink: Box::new(NoopSink),
            dirty: false,
        }
    }

    /// Replace the rewards collaborator
    pub fn with_sink(mut self, sink: Box<dyn CompletionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn save(&mut self, store: &dyn KvStore) -> Result<()> {
        let scope = self.scope.as_deref();
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| (t.order, t.created_at, t.id));
        let mut trash: Vec<&Task> = self.trash.values().collect();
        trash.sort_by_key(|t| (t.deleted_at, t.id));

        save_json(store, &key(StoreKind::Tasks, scope), &tasks)?;
        save_json(store, &key(StoreKind::Trash, scope), &trash)?;
        self.dirty = false;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // --- queries -----------------------------------------------------------

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Root tasks sorted by manual order
    pub fn root_tasks(&self) -> Vec<&Task> {
        let mut roots: Vec<&Task> = self.tasks.values().filter(|t| t.is_root()).collect();
        roots.sort_by_key(|t| (t.order, t.created_at, t.id));
        roots
    }

    pub fn children_of(&self, id: Uuid) -> Vec<&Task> {
        let Some(parent) = self.tasks.get(&id) else {
            return Vec::new();
        };
        parent.children.iter().filter_map(|child| self.tasks.get(child)).collect()
    }

    /// Trash entries, oldest deletion first
    pub fn trash_entries(&self) -> Vec<&Task> {
        let mut entries: Vec<&Task> = self.trash.values().collect();
        entries.sort_by_key(|t| (t.deleted_at, t.id));
        entries
    }

    pub fn trash_len(&self) -> usize {
        self.trash.len()
    }

    /// True iff the task has no unfinished dependencies. Advisory: gates UI
    /// affordances, never the mutation layer.
    pub fn can_start_task(&self, id: Uuid) -> bool {
        let Some(task) = self.tasks.get(&id) else {
            return false;
        };
        task.depends_on
            .iter()
            .all(|dep| self.tasks.get(dep).map_or(true, |t| t.status == TaskStatus::Done))
    }

    // --- mutation ----------------------------------------------------------

    /// Create a task. `order` is the current count of pending/in-progress
    /// tasks across the whole board (global, not per-quadrant).
    pub fn add_task(&mut self, draft: NewTask, clock: &dyn Clock) -> Uuid {
        let mut task = Task::new(draft, clock.now_utc(), clock.offset());
        task.order = self.open_count();

        if let Some(parent_id) = task.parent_id {
            match self.tasks.get_mut(&parent_id) {
                Some(parent) => parent.children.push(task.id),
                None => task.parent_id = None,
            }
        }

        let id = task.id;
        self.tasks.insert(id, task);
        self.dirty = true;
        id
    }

    /// Apply a field patch. The quadrant comes from `derive_quadrant`, which
    /// demotes a `do_first` task whose deadline no longer falls on today.
    /// Unknown ids are a no-op.
    pub fn update_task(&mut self, id: Uuid, patch: TaskPatch, clock: &dyn Clock) {
        let today = clock.today();
        let tz = clock.offset();
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };

        task.quadrant = derive_quadrant(task, &patch, today, tz);
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(recurring) = patch.recurring {
            task.recurring = recurring;
        }
        if let Some(xp_reward) = patch.xp_reward {
            task.xp_reward = xp_reward;
        }
        if let Some(deadline) = patch.deadline {
            task.set_deadline(deadline, tz);
        }
        self.dirty = true;
    }

    /// Pending/overdue -> in-progress (timer start or manual start)
    pub fn begin_task(&mut self, id: Uuid) {
        if let Some(task) = self.tasks.get_mut(&id) {
            if matches!(task.status, TaskStatus::Pending | TaskStatus::Overdue) {
                task.status = TaskStatus::InProgress;
                self.dirty = true;
            }
        }
    }

    /// In-progress -> pending (timer stopped without completing)
    pub fn release_task(&mut self, id: Uuid) {
        if let Some(task) = self.tasks.get_mut(&id) {
            if task.status == TaskStatus::InProgress {
                task.status = TaskStatus::Pending;
                self.dirty = true;
            }
        }
    }

    /// Complete a task. Worked time grows by the largest of the active
    /// timer's elapsed seconds (when the timer points at this task) and the
    /// explicit override. A recurring task spawns exactly one pending
    /// follow-up carrying title, quadrant, schedule, and collaborator-owned
    /// fields; the rewards sink is notified fire-and-forget.
    ///
    /// The caller detaches the timer from `id` itself; the board only reads
    /// the `active` view. Returns the id of the spawned follow-up, if any.
    pub fn complete_task(
        &mut self,
        id: Uuid,
        duration_override: Option<i64>,
        active: Option<ActiveTimer>,
        clock: &dyn Clock,
    ) -> Option<Uuid> {
        let now = clock.now_utc();
        let tz = clock.offset();
        let task = self.tasks.get_mut(&id)?;
        if task.status == TaskStatus::Done {
            return None;
        }

        let timer_elapsed = active
            .filter(|a| a.task_id == id)
            .map(|a| a.elapsed_secs)
            .unwrap_or(0);
        let gained = timer_elapsed.max(duration_override.unwrap_or(0)).max(0);

        task.status = TaskStatus::Done;
        task.completed_at = Some(now);
        task.duration_secs += gained;
        self.dirty = true;

        let completed = task.clone();
        self.sink.on_task_completed(
            completed.quadrant,
            completed.duration_secs,
            tz,
            completed.xp_reward,
        );

        if !completed.recurring.kind.is_recurring() {
            return None;
        }
        let next = next_occurrence(&completed.recurring, clock.now(), completed.due_time)?;

        let mut follow_up = Task::new(
            NewTask {
                title: completed.title,
                quadrant: Some(completed.quadrant),
                deadline: Some(next.deadline),
                recurring: Some(completed.recurring),
                parent_id: None,
                depends_on: Vec::new(),
                xp_reward: completed.xp_reward,
                extras: completed.extras,
            },
            now,
            tz,
        );
        follow_up.order = self.open_count();
        let follow_up_id = follow_up.id;
        self.tasks.insert(follow_up_id, follow_up);
        Some(follow_up_id)
    }

    /// Done -> pending again
    pub fn restore_completed(&mut self, id: Uuid) {
        let fresh_order = self.open_count();
        if let Some(task) = self.tasks.get_mut(&id) {
            if task.status == TaskStatus::Done {
                task.status = TaskStatus::Pending;
                task.completed_at = None;
                task.order = fresh_order;
                self.dirty = true;
            }
        }
    }

    /// Soft delete: the task and every descendant move to trash, stamped
    /// with the deletion instant. Survivors' `depends_on` and `children`
    /// lists are stripped of every removed id. Unknown ids are a no-op.
    pub fn remove_task(&mut self, id: Uuid, clock: &dyn Clock) {
        if !self.tasks.contains_key(&id) {
            return;
        }
        let now = clock.now_utc();
        let removed = self.subtree_ids(id);

        for member in &removed {
            if let Some(mut task) = self.tasks.remove(member) {
                if task.status == TaskStatus::InProgress {
                    task.status = TaskStatus::Pending;
                }
                task.deleted_at = Some(now);
                self.trash.insert(task.id, task);
            }
        }
        for task in self.tasks.values_mut() {
            task.depends_on.retain(|dep| !removed.contains(dep));
            task.children.retain(|child| !removed.contains(child));
        }
        self.dirty = true;
    }

    /// Move a trashed task back to the live set. Restore does not cascade:
    /// descendants come back one by one. The task re-links to its former
    /// parent only when that parent is live; otherwise it becomes a root
    /// task with a fresh order.
    pub fn restore_from_trash(&mut self, id: Uuid) {
        let Some(mut task) = self.trash.remove(&id) else {
            return;
        };
        task.deleted_at = None;
        task.children.retain(|child| self.tasks.contains_key(child));

        let mut relinked = false;
        if let Some(parent_id) = task.parent_id {
            if let Some(parent) = self.tasks.get_mut(&parent_id) {
                if !parent.children.contains(&task.id) {
                    parent.children.push(task.id);
                }
                relinked = true;
            }
        }
        if !relinked {
            task.parent_id = None;
            task.order = self.open_count();
        }

        // Relink live children that still point at the restored parent
        let restored_id = task.id;
        let mut children = task.children.clone();
        for child in self.tasks.values() {
            if child.parent_id == Some(restored_id) && !children.contains(&child.id) {
                children.push(child.id);
            }
        }
        task.children = children;

        self.tasks.insert(restored_id, task);
        self.dirty = true;
    }

    /// Drop a trash entry for good
    pub fn delete_permanently(&mut self, id: Uuid) {
        if self.trash.remove(&id).is_some() {
            self.dirty = true;
        }
    }

    pub fn clear_trash(&mut self) {
        if !self.trash.is_empty() {
            self.trash.clear();
            self.dirty = true;
        }
    }

    /// Re-sequence manual order among root pending/in-progress tasks:
    /// remove the task at `from` and reinsert it at `to`. Afterwards that
    /// subset's `order` values are exactly 0..n-1; nothing else is touched.
    /// Out-of-range indices are a no-op.
    pub fn reorder_tasks(&mut self, from: usize, to: usize) {
        let mut sequence: Vec<Uuid> = {
            let mut open_roots: Vec<&Task> = self
                .tasks
                .values()
                .filter(|t| t.is_root() && t.status.is_open())
                .collect();
            open_roots.sort_by_key(|t| (t.order, t.created_at, t.id));
            open_roots.iter().map(|t| t.id).collect()
        };
        if from >= sequence.len() || to >= sequence.len() {
            return;
        }

        let moved = sequence.remove(from);
        sequence.insert(to, moved);

        for (index, id) in sequence.iter().enumerate() {
            if let Some(task) = self.tasks.get_mut(id) {
                task.order = index;
            }
        }
        self.dirty = true;
    }

    /// Add a dependency edge `id -> on`. The edge is rejected when either
    /// end is unknown, when it is a self-edge, or when it would close a
    /// cycle: a cyclic graph would leave every member permanently
    /// unstartable, so it can never be built through this API.
    pub fn add_dependency(&mut self, id: Uuid, on: Uuid) -> Result<(), BoardError> {
        if !self.tasks.contains_key(&id) {
            return Err(BoardError::UnknownTask(id));
        }
        if !self.tasks.contains_key(&on) {
            return Err(BoardError::UnknownTask(on));
        }
        if id == on || self.depends_transitively(on, id) {
            return Err(BoardError::DependencyCycle);
        }

        if let Some(task) = self.tasks.get_mut(&id) {
            if !task.depends_on.contains(&on) {
                task.depends_on.push(on);
                self.dirty = true;
            }
        }
        Ok(())
    }

    /// Idempotent sweep: every pending task whose deadline has passed goes
    /// overdue. Returns whether anything changed, so callers persist only
    /// then.
    pub fn mark_overdue(&mut self, clock: &dyn Clock) -> bool {
        let now = clock.now_utc();
        let mut changed = false;
        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Pending
                && task.deadline.is_some_and(|deadline| deadline < now)
            {
                task.status = TaskStatus::Overdue;
                changed = true;
            }
        }
        if changed {
            self.dirty = true;
        }
        changed
    }

    // --- internals ---------------------------------------------------------

    fn open_count(&self) -> usize {
        self.tasks.values().filter(|t| t.status.is_open()).count()
    }

    /// Transitive closure of `id` and its descendants, walking `children`
    /// ids over the arena
    fn subtree_ids(&self, id: Uuid) -> Vec<Uuid> {
        let mut seen = vec![id];
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(task) = self.tasks.get(&current) else {
                continue;
            };
            for child in &task.children {
                if self.tasks.contains_key(child) && !seen.contains(child) {
                    seen.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        seen
    }

    /// True iff `from` reaches `target` through `depends_on` edges
    fn depends_transitively(&self, from: Uuid, target: Uuid) -> bool {
        let mut seen = vec![from];
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            let Some(task) = self.tasks.get(&current) else {
                continue;
            };
            for dep in &task.depends_on {
                if !seen.contains(dep) {
                    seen.push(*dep);
                    queue.push_back(*dep);
                }
            }
        }
        false
    }
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn key(kind: StoreKind, scope: Option<&str>) -> StoreKey {
    match scope {
        Some(scope) => StoreKey::scoped(kind, scope),
        None => StoreKey::new(kind),
    }
}
