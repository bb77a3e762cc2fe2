// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, error, info};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run these tasks.
    DispatchTasks(Vec<TaskName>),
    /// Nothing is running or queued and the runtime was asked to exit when
    /// idle.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger.
///
/// - An idle task is dispatched immediately.
/// - A running task has the trigger recorded in the queue, which either
///   coalesces it into one pending re-run or drops it.
pub fn handle_task_trigger(
    running: &mut BTreeSet<TaskName>,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if running.contains(&task) {
        if queue.record_trigger(&task) {
            debug!(task = %task, ?reason, pending = queue.len(), "task busy; re-run queued");
        } else {
            info!(
                task = %task,
                behaviour = ?queue.behaviour(),
                dropped = queue.dropped(),
                "task busy; trigger dropped"
            );
        }
        return CoreStep::continue_with(Vec::new());
    }

    debug!(task = %task, ?reason, "dispatching triggered task");
    running.insert(task.clone());
    CoreStep::continue_with(vec![CoreCommand::DispatchTasks(vec![task])])
}

/// Handle a task completion.
///
/// A failure is reported and otherwise ignored: watching continues. A
/// pending re-run for the task is dispatched right away.
pub fn handle_task_completion(
    running: &mut BTreeSet<TaskName>,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    running.remove(&task);

    match &outcome {
        TaskOutcome::Success => info!(task = %task, "rebuild finished"),
        TaskOutcome::Failed(reason) => {
            error!(task = %task, error = %reason, "rebuild failed; still watching")
        }
    }

    let mut commands = Vec::new();
    if queue.take(&task) {
        debug!(task = %task, "starting queued re-run");
        running.insert(task.clone());
        commands.push(CoreCommand::DispatchTasks(vec![task]));
    }

    let mut keep_running = true;
    if options.exit_when_idle && running.is_empty() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
