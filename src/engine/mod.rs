// src/engine/mod.rs

//! Watch-mode engine.
//!
//! Once the initial build is done, the engine reacts to:
//! - file-watch triggers naming a registered task
//! - task completion reports from the executor
//! - shutdown signals
//!
//! The pure state machine lives in [`core`]; the async shell that reads
//! events and hands tasks to an executor is [`runtime`].

pub use crate::pipeline::TaskName;

/// Result of one task run as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task failed; the string is the rendered failure.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested directly, e.g. by a test or a future CLI command.
    Manual,
    /// A watched source file changed.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once nothing is running and nothing is queued.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the executor and the
/// signal handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
