// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself, so tests can swap in a fake that records dispatches and replies
//! with scripted completions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, TaskName};
use crate::errors::Result;
use crate::pipeline::TaskRegistry;

use super::task_runner::{report_unrunnable, run_task};

/// How dispatched tasks get executed.
pub trait ExecutorBackend: Send {
    /// Start the named tasks. Must not wait for them to finish; completion is
    /// reported through `RuntimeEvent::TaskCompleted`.
    fn spawn_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs tasks from a [`TaskRegistry`] on the Tokio runtime.
pub struct RealExecutorBackend {
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(registry: Arc<TaskRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for name in tasks {
                match self.registry.get(&name) {
                    Ok(task) => {
                        tokio::spawn(run_task(task.clone(), self.runtime_tx.clone()));
                    }
                    Err(err) => {
                        let tx = self.runtime_tx.clone();
                        let reason = err.to_string();
                        tokio::spawn(async move { report_unrunnable(&tx, name, reason).await });
                    }
                }
            }
            Ok(())
        })
    }
}
