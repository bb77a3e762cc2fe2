// src/exec/task_runner.rs

//! Running one registered task on behalf of the watch runtime.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{RuntimeEvent, TaskName, TaskOutcome};
use crate::pipeline::Task;

/// Run `task` to completion and report a `TaskCompleted` event.
///
/// A failing task is logged; it never stops the caller.
pub async fn run_task(task: Task, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let name = task.name().to_string();
    let outcome = match task.run().await {
        Ok(()) => TaskOutcome::Success,
        Err(failure) => {
            let rendered = failure.to_string();
            debug!(task = %name, error = %rendered, "reporting failed run");
            TaskOutcome::Failed(rendered)
        }
    };

    if let Err(err) = report(&runtime_tx, name.clone(), outcome).await {
        info!(task = %name, error = %err, "runtime gone; dropping completion");
    }
}

/// Report a task that could not even be started (e.g. unknown name).
pub async fn report_unrunnable(
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    task: TaskName,
    reason: String,
) {
    error!(task = %task, error = %reason, "could not start task");
    if let Err(err) = report(runtime_tx, task.clone(), TaskOutcome::Failed(reason)).await {
        info!(task = %task, error = %err, "runtime gone; dropping completion");
    }
}

async fn report(
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    task: TaskName,
    outcome: TaskOutcome,
) -> Result<()> {
    runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.clone(),
            outcome,
        })
        .await
        .with_context(|| format!("sending TaskCompleted event for task '{task}' to runtime"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;
    use crate::pipeline::{define_task, from_fn};

    #[tokio::test]
    async fn failure_is_reported_with_its_cause() {
        let task = define_task(
            "preprocessor",
            from_fn(|| async { Err(PipelineError::ConfigError("unbalanced braces".into())) }),
        );
        let (tx, mut rx) = mpsc::channel(4);
        run_task(task, tx).await;

        match rx.recv().await {
            Some(RuntimeEvent::TaskCompleted {
                task,
                outcome: TaskOutcome::Failed(reason),
            }) => {
                assert_eq!(task, "preprocessor");
                assert!(reason.contains("unbalanced braces"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_is_reported() {
        let task = define_task("assets", from_fn(|| async { Ok(()) }));
        let (tx, mut rx) = mpsc::channel(4);
        run_task(task, tx).await;
        assert!(matches!(
            rx.recv().await,
            Some(RuntimeEvent::TaskCompleted { outcome: TaskOutcome::Success, .. })
        ));
    }
}
