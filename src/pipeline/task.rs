// src/pipeline/task.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::errors::{PipelineError, Result, TaskFailure};
use crate::pipeline::TaskName;
use crate::pipeline::combinator::{run_parallel, run_sequence};
use crate::types::ParallelFailurePolicy;

/// Future returned by a unit of work.
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Future returned by [`Task::run`].
pub type TaskFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<(), TaskFailure>> + Send + 'a>>;

/// A unit of work a leaf task performs.
///
/// Failure is reported through the returned `Result`; implementations must
/// not swallow it. Work is re-invoked on every build and watch trigger, so
/// it must not keep state between runs.
pub trait Work: Send + Sync {
    fn run(&self) -> WorkFuture<'_>;
}

/// Adapter turning an async closure into [`Work`].
pub struct FnWork<F> {
    f: F,
}

impl<F, Fut> Work for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> WorkFuture<'_> {
        Box::pin((self.f)())
    }
}

/// Wrap a closure returning a future as [`Work`].
pub fn from_fn<F, Fut>(f: F) -> FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnWork { f }
}

/// Shape of a task.
#[derive(Clone)]
pub enum TaskKind {
    Leaf {
        work: Arc<dyn Work>,
        timeout: Option<Duration>,
    },
    Sequence(Vec<Task>),
    Parallel {
        members: Vec<Task>,
        policy: ParallelFailurePolicy,
    },
}

/// A named, invokable unit: either a leaf wrapping [`Work`] or a
/// composition of other tasks.
///
/// Tasks are immutable once built and cheap to clone.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    kind: TaskKind,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TaskKind::Leaf { .. } => "leaf",
            TaskKind::Sequence(_) => "sequence",
            TaskKind::Parallel { .. } => "parallel",
        };
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

/// Define a leaf task from a unit of work.
pub fn define_task(name: impl Into<TaskName>, work: impl Work + 'static) -> Task {
    Task {
        name: name.into(),
        kind: TaskKind::Leaf {
            work: Arc::new(work),
            timeout: None,
        },
    }
}

impl Task {
    pub(crate) fn composite(name: impl Into<TaskName>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Bound the running time of this task's leaves.
    ///
    /// On a composite the bound applies to every leaf underneath it, not to
    /// the group as a whole.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        match &mut self.kind {
            TaskKind::Leaf { timeout, .. } => *timeout = Some(limit),
            TaskKind::Sequence(members) | TaskKind::Parallel { members, .. } => {
                for member in members.iter_mut() {
                    *member = member.clone().with_timeout(limit);
                }
            }
        }
        self
    }

    /// Names of every leaf task in execution order.
    pub fn leaf_names(&self) -> Vec<&str> {
        match &self.kind {
            TaskKind::Leaf { .. } => vec![self.name.as_str()],
            TaskKind::Sequence(members) | TaskKind::Parallel { members, .. } => {
                members.iter().flat_map(|m| m.leaf_names()).collect()
            }
        }
    }

    /// Run the task to completion.
    ///
    /// Composite tasks propagate the failing leaf's [`TaskFailure`]
    /// unchanged.
    pub fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            match &self.kind {
                TaskKind::Leaf { work, timeout } => {
                    run_leaf(&self.name, work.as_ref(), *timeout).await
                }
                TaskKind::Sequence(members) => run_sequence(&self.name, members).await,
                TaskKind::Parallel { members, policy } => {
                    run_parallel(&self.name, members, *policy).await
                }
            }
        })
    }

    /// Render the task tree, one node per line, for `--dry-run`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match &self.kind {
            TaskKind::Leaf { timeout, .. } => {
                out.push_str(&format!("{indent}- {}", self.name));
                if let Some(t) = timeout {
                    out.push_str(&format!(" (timeout {:?})", t));
                }
                out.push('\n');
            }
            TaskKind::Sequence(members) => {
                out.push_str(&format!("{indent}- {} [sequence]\n", self.name));
                for m in members {
                    m.describe_into(out, depth + 1);
                }
            }
            TaskKind::Parallel { members, policy } => {
                out.push_str(&format!("{indent}- {} [parallel, {:?}]\n", self.name, policy));
                for m in members {
                    m.describe_into(out, depth + 1);
                }
            }
        }
    }
}

async fn run_leaf(
    name: &str,
    work: &dyn Work,
    timeout: Option<Duration>,
) -> std::result::Result<(), TaskFailure> {
    info!(task = %name, "task started");
    let started = Instant::now();

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work.run()).await {
            Ok(res) => res,
            Err(_elapsed) => Err(PipelineError::Timeout(limit)),
        },
        None => work.run().await,
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => {
            info!(task = %name, elapsed_ms, "task finished");
            Ok(())
        }
        Err(cause) => {
            warn!(task = %name, elapsed_ms, error = %cause, "task failed");
            Err(TaskFailure::new(name, cause))
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
