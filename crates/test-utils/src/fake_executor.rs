use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use sitepipe::engine::{RuntimeEvent, TaskName, TaskOutcome};
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - reports `TaskCompleted` for each one right away, failing the names in
///   `failing`
///
/// A fake built with [`FakeExecutor::holding`] never reports completions;
/// the test sends them itself, which keeps tasks "running" for as long as
/// it needs.
pub struct FakeExecutor {
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    executed: Arc<Mutex<Vec<TaskName>>>,
    failing: HashSet<TaskName>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<TaskName>>>,
    ) -> Self {
        Self {
            runtime_tx: Some(runtime_tx),
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn holding(executed: Arc<Mutex<Vec<TaskName>>>) -> Self {
        Self {
            runtime_tx: None,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for task in tasks {
                executed.lock().unwrap().push(task.clone());

                let Some(tx) = tx.as_ref() else { continue };
                let outcome = if self.failing.contains(&task) {
                    TaskOutcome::Failed(format!("{task} failed on purpose"))
                } else {
                    TaskOutcome::Success
                };
                tx.send(RuntimeEvent::TaskCompleted { task, outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
