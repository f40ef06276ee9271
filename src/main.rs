use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use quadro::{
    AppConfig, Clock, FileStore, NewTask, PomodoroConfig, Quadrant, Recurrence, SystemClock,
    Task, TaskBoard, TaskPatch, TimerEngine, TimerSignal,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "quadro")]
#[command(about = "Eisenhower-matrix task tracker with a suspension-proof work timer", long_about = None)]
struct Cli {
    /// Optional user scope for the task snapshots
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        title: String,
        /// Priority bucket: do_first, schedule, delegate, eliminate
        #[arg(short, long)]
        quadrant: Option<String>,
        /// Deadline as "YYYY-MM-DD" or "YYYY-MM-DD HH:MM" in the configured zone
        #[arg(long)]
        due: Option<String>,
        /// Recurrence: daily, weekdays, weekly, or custom:0,3,5 (0 = Sunday)
        #[arg(long)]
        recur: Option<String>,
        /// Parent task id (creates a subtask)
        #[arg(long)]
        parent: Option<Uuid>,
        /// Bonus reward forwarded to the rewards collaborator on completion
        #[arg(long)]
        xp: Option<u32>,
    },
    /// List tasks
    List,
    /// Update a task's fields
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        /// New deadline; see `add --due` for the format
        #[arg(long)]
        due: Option<String>,
        /// Clear the deadline (may demote a do_first task to schedule)
        #[arg(long)]
        clear_due: bool,
        #[arg(short, long)]
        quadrant: Option<String>,
    },
    /// Start the work timer for a task (replaces any active timer)
    Start { id: Uuid },
    /// Pause the running timer
    Pause,
    /// Resume the paused timer
    Resume,
    /// Stop the timer without completing the task
    Stop,
    /// Tick the timer and show its state
    Status,
    /// Complete a task
    Done {
        id: Uuid,
        /// Worked minutes to record when no timer ran
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Reopen a completed task
    Reopen { id: Uuid },
    /// Move a task and its subtasks to trash
    Rm { id: Uuid },
    /// Re-sequence a root task among the open roots
    Reorder { from: usize, to: usize },
    /// Require `on` to be done before `id` can start
    Depend { id: Uuid, on: Uuid },
    /// Manage the trash
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },
    /// Show or change configuration
    Config {
        /// Timezone offset, minutes east of UTC
        #[arg(long)]
        tz_offset_minutes: Option<i32>,
        /// Enable or disable pomodoro phases
        #[arg(long)]
        pomodoro: Option<bool>,
        /// Work phase length in minutes
        #[arg(long)]
        work_minutes: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TrashCommands {
    /// List trash entries
    List,
    /// Restore a trashed task
    Restore { id: Uuid },
    /// Delete a trashed task for good
    Rm { id: Uuid },
    /// Empty the trash
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = FileStore::open_default()?;
    let mut config = AppConfig::load(&store);
    let clock = SystemClock::from_offset_minutes(config.tz_offset_minutes);
    let scope = cli.user.as_deref();
    let mut board = TaskBoard::load(&store, scope);
    let mut timer = TimerEngine::load(&store, clock.now_utc(), PomodoroConfig::from(&config));

    // Deadline sweep runs on every invocation
    if board.mark_overdue(&clock) {
        eprintln!("Marked overdue tasks");
    }

    match cli.command {
        Commands::Add { title, quadrant, due, recur, parent, xp } => {
            let mut draft = NewTask::titled(title);
            draft.quadrant = quadrant.as_deref().map(parse_quadrant).transpose()?;
            draft.deadline = due.as_deref().map(|s| parse_due(s, &clock)).transpose()?;
            draft.recurring = recur.as_deref().map(parse_recurrence).transpose()?;
            draft.parent_id = parent;
            draft.xp_reward = xp;
            let id = board.add_task(draft, &clock);
            println!("Added task {id}");
        }
        Commands::List => {
            print_board(&board);
        }
        Commands::Update { id, title, due, clear_due, quadrant } => {
            if board.task(id).is_none() {
                return Err(anyhow!("no task with id {id}"));
            }
            let mut patch = TaskPatch { title, ..TaskPatch::default() };
            patch.quadrant = quadrant.as_deref().map(parse_quadrant).transpose()?;
            patch.deadline = if clear_due {
                Some(None)
            } else {
                due.as_deref().map(|s| parse_due(s, &clock)).transpose()?.map(Some)
            };
            board.update_task(id, patch, &clock);
            if let Some(task) = board.task(id) {
                println!("{}  [{}] [{}]  {}", task.id, task.status.to_tag(), task.quadrant.to_tag(), task.title);
            }
        }
        Commands::Start { id } => {
            if board.task(id).is_none() {
                return Err(anyhow!("no task with id {id}"));
            }
            if !board.can_start_task(id) {
                eprintln!("Note: task has unfinished dependencies");
            }
            if let Some(replaced) = timer.start(id, clock.now_utc(), &store)? {
                board.release_task(replaced);
                println!("Stopped timer for {replaced}");
            }
            board.begin_task(id);
            println!("Timer running for {id}");
        }
        Commands::Pause => {
            timer.pause(clock.now_utc(), &store)?;
            print_timer(&timer);
        }
        Commands::Resume => {
            timer.resume(clock.now_utc(), &store)?;
            print_timer(&timer);
        }
        Commands::Stop => {
            if let Some(released) = timer.stop(&store)? {
                board.release_task(released);
                println!("Stopped timer for {released}");
            } else {
                println!("No timer running");
            }
        }
        Commands::Status => {
            if let Some(signal) = timer.tick(clock.now_utc(), &store)? {
                match signal {
                    TimerSignal::WorkPhaseComplete => {
                        println!("Work phase complete - moving to break");
                        timer.advance_phase(clock.now_utc(), &store)?;
                    }
                }
            }
            print_timer(&timer);
        }
        Commands::Done { id, minutes } => {
            let active = timer.active();
            let spawned =
                board.complete_task(id, minutes.map(|m| m * 60), active, &clock);
            timer.detach_task(id, &store)?;
            match board.task(id) {
                Some(task) => println!("Completed \"{}\"", task.title),
                None => return Err(anyhow!("no task with id {id}")),
            }
            if let Some(next) = spawned {
                println!("Recurring follow-up created: {next}");
            }
        }
        Commands::Reopen { id } => {
            board.restore_completed(id);
            println!("Task {id} is pending again");
        }
        Commands::Rm { id } => {
            board.remove_task(id, &clock);
            if let Some(active) = timer.active() {
                if board.task(active.task_id).is_none() {
                    timer.detach_task(active.task_id, &store)?;
                }
            }
            println!("Moved to trash");
        }
        Commands::Reorder { from, to } => {
            board.reorder_tasks(from, to);
            print_board(&board);
        }
        Commands::Depend { id, on } => {
            board.add_dependency(id, on)?;
            println!("Task {id} now depends on {on}");
        }
        Commands::Trash { command } => match command {
            TrashCommands::List => {
                for entry in board.trash_entries() {
                    let deleted = entry
                        .deleted_at
                        .map(|at| at.with_timezone(&clock.offset()).format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!("{}  {}  (deleted {})", entry.id, entry.title, deleted);
                }
            }
            TrashCommands::Restore { id } => {
                board.restore_from_trash(id);
                println!("Restored {id}");
            }
            TrashCommands::Rm { id } => {
                board.delete_permanently(id);
                println!("Deleted permanently");
            }
            TrashCommands::Clear => {
                board.clear_trash();
                println!("Trash emptied");
            }
        },
        Commands::Config { tz_offset_minutes, pomodoro, work_minutes } => {
            if let Some(minutes) = tz_offset_minutes {
                config.tz_offset_minutes = minutes;
            }
            if let Some(enabled) = pomodoro {
                config.pomodoro_enabled = enabled;
            }
            if let Some(minutes) = work_minutes {
                config.work_secs = minutes * 60;
            }
            config.save(&store)?;
            println!(
                "tz offset: {} min, pomodoro: {}, work phase: {} min",
                config.tz_offset_minutes,
                config.pomodoro_enabled,
                config.work_secs / 60
            );
        }
    }

    if board.is_dirty() {
        board.save(&store)?;
    }
    Ok(())
}

fn parse_quadrant(s: &str) -> Result<Quadrant> {
    Quadrant::from_tag(s).ok_or_else(|| {
        anyhow!("unknown quadrant '{s}' (expected do_first, schedule, delegate, eliminate)")
    })
}

fn parse_due(s: &str, clock: &impl Clock) -> Result<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").or_else(|_| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|date| date.and_time(quadro::recurrence::default_due_time()))
    })?;
    clock
        .offset()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("deadline does not exist in the configured zone"))
}

fn parse_recurrence(s: &str) -> Result<Recurrence> {
    match s.to_lowercase().as_str() {
        "daily" => Ok(Recurrence::daily()),
        "weekdays" => Ok(Recurrence::weekdays()),
        "weekly" => Ok(Recurrence::weekly()),
        custom if custom.starts_with("custom:") => {
            let days = custom["custom:".len()..]
                .split(',')
                .map(|d| d.trim().parse::<u8>())
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map_err(|e| anyhow!("bad custom day list: {e}"))?;
            Ok(Recurrence::custom(days))
        }
        _ => Err(anyhow!(
            "unknown recurrence '{s}' (expected daily, weekdays, weekly, custom:0,3,5)"
        )),
    }
}

fn print_board(board: &TaskBoard) {
    if board.is_empty() {
        println!("No tasks");
        return;
    }
    for task in board.root_tasks() {
        print_task(task, 0, board);
    }
}

fn print_task(task: &Task, depth: usize, board: &TaskBoard) {
    let indent = "  ".repeat(depth);
    let due = task
        .due_date
        .map(|d| match task.due_time {
            Some(t) => format!("  due {} {}", d, t.format("%H:%M")),
            None => format!("  due {d}"),
        })
        .unwrap_or_default();
    let blocked = if board.can_start_task(task.id) { "" } else { "  [blocked]" };
    println!(
        "{indent}{}  [{}] [{}]  {}{due}{blocked}",
        task.id,
        task.status.to_tag(),
        task.quadrant.to_tag(),
        task.title,
    );
    for child in board.children_of(task.id) {
        print_task(child, depth + 1, board);
    }
}

fn print_timer(timer: &TimerEngine) {
    let state = timer.state();
    match state.task_id {
        Some(task_id) if !timer.is_idle() => {
            let mode = if timer.is_paused() { "paused" } else { "running" };
            let minutes = state.elapsed_secs / 60;
            let seconds = state.elapsed_secs % 60;
            print!("Timer {mode} for {task_id}: {minutes}m {seconds:02}s");
            if state.pomodoro_phase != quadro::PomodoroPhase::None {
                print!("  (session {}, {:?})", state.pomodoro_session, state.pomodoro_phase);
            }
            println!();
        }
        _ => println!("Timer idle"),
    }
}
