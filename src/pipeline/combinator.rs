// src/pipeline/combinator.rs

//! `Sequence` and `Parallel` composition.
//!
//! - A sequence starts member k+1 only after member k succeeded. The first
//!   failure ends the sequence and is returned unchanged.
//! - A parallel group starts every member at once on the Tokio runtime and
//!   succeeds when all of them do. What happens to the other members after a
//!   failure is decided by [`ParallelFailurePolicy`].

use std::collections::HashMap;

use tokio::task::{Id, JoinSet};
use tracing::{debug, warn};

use crate::errors::{PipelineError, TaskFailure};
use crate::pipeline::task::{Task, TaskKind};
use crate::pipeline::TaskName;
use crate::types::ParallelFailurePolicy;

/// Compose tasks to run strictly one after another.
pub fn sequence(name: impl Into<TaskName>, tasks: Vec<Task>) -> Task {
    Task::composite(name, TaskKind::Sequence(tasks))
}

/// Compose independent tasks to run concurrently, letting every member run
/// to completion even when one fails.
pub fn parallel(name: impl Into<TaskName>, tasks: Vec<Task>) -> Task {
    parallel_with_policy(name, ParallelFailurePolicy::default(), tasks)
}

/// Like [`parallel`], with an explicit failure policy.
pub fn parallel_with_policy(
    name: impl Into<TaskName>,
    policy: ParallelFailurePolicy,
    tasks: Vec<Task>,
) -> Task {
    Task::composite(
        name,
        TaskKind::Parallel {
            members: tasks,
            policy,
        },
    )
}

pub(crate) async fn run_sequence(name: &str, members: &[Task]) -> Result<(), TaskFailure> {
    debug!(group = %name, members = members.len(), "sequence started");

    for (idx, member) in members.iter().enumerate() {
        if let Err(failure) = member.run().await {
            let skipped: Vec<&str> = members[idx + 1..].iter().map(|t| t.name()).collect();
            debug!(
                group = %name,
                failed = %failure.task,
                ?skipped,
                "sequence aborted"
            );
            return Err(failure);
        }
    }

    debug!(group = %name, "sequence finished");
    Ok(())
}

pub(crate) async fn run_parallel(
    name: &str,
    members: &[Task],
    policy: ParallelFailurePolicy,
) -> Result<(), TaskFailure> {
    debug!(group = %name, members = members.len(), ?policy, "parallel group started");

    let mut set = JoinSet::new();
    let mut names: HashMap<Id, TaskName> = HashMap::with_capacity(members.len());
    for member in members {
        let member = member.clone();
        let member_name = member.name().to_string();
        let handle = set.spawn(async move { member.run().await });
        names.insert(handle.id(), member_name);
    }

    let mut first_failure: Option<TaskFailure> = None;

    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(failure)) => failure,
            Err(join_err) if join_err.is_cancelled() => continue,
            Err(join_err) => {
                let member = names
                    .get(&join_err.id())
                    .map(String::as_str)
                    .unwrap_or(name);
                TaskFailure::new(
                    member,
                    PipelineError::Other(anyhow::anyhow!("task panicked: {join_err}")),
                )
            }
        };

        if first_failure.is_some() {
            warn!(
                group = %name,
                task = %failure.task,
                error = %failure.cause,
                "additional failure in parallel group"
            );
            continue;
        }

        if policy == ParallelFailurePolicy::CancelSiblings {
            debug!(group = %name, failed = %failure.task, "cancelling remaining members");
            set.abort_all();
        }
        first_failure = Some(failure);
    }

    match first_failure {
        Some(failure) => Err(failure),
        None => {
            debug!(group = %name, "parallel group finished");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::pipeline::{define_task, from_fn};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(name: &'static str, log: &Log, fail: bool) -> Task {
        let log = Arc::clone(log);
        define_task(
            name,
            from_fn(move || {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(name.to_string());
                    if fail {
                        Err(PipelineError::ConfigError(format!("{name} broke")))
                    } else {
                        Ok(())
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn sequence_stops_at_first_failure() {
        let log: Log = Arc::default();
        let seq = sequence(
            "seq",
            vec![
                recording("a", &log, false),
                recording("b", &log, true),
                recording("c", &log, false),
            ],
        );

        let err = seq.run().await.unwrap_err();
        assert_eq!(err.task, "b");
        assert_eq!(err.cause.to_string(), "Configuration error: b broke");
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn nested_failure_keeps_leaf_identity() {
        let log: Log = Arc::default();
        let tree = sequence(
            "outer",
            vec![sequence("inner", vec![recording("leaf", &log, true)])],
        );
        let err = tree.run().await.unwrap_err();
        assert_eq!(err.task, "leaf");
    }

    #[tokio::test]
    async fn parallel_runs_every_member_by_default() {
        let log: Log = Arc::default();
        let group = parallel(
            "group",
            vec![
                recording("a", &log, true),
                recording("b", &log, false),
                recording("c", &log, false),
            ],
        );

        let err = group.run().await.unwrap_err();
        assert_eq!(err.task, "a");
        let mut ran = log.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn cancel_siblings_aborts_slow_members() {
        let finished = Arc::new(AtomicUsize::new(0));
        let slow = {
            let finished = Arc::clone(&finished);
            define_task(
                "slow",
                from_fn(move || {
                    let finished = Arc::clone(&finished);
                    async move {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
        };
        let fast_fail = define_task(
            "fast",
            from_fn(|| async { Err(PipelineError::ConfigError("nope".into())) }),
        );

        let group = parallel_with_policy(
            "group",
            ParallelFailurePolicy::CancelSiblings,
            vec![slow, fast_fail],
        );

        let err = tokio::time::timeout(Duration::from_secs(5), group.run())
            .await
            .expect("cancelled group must not wait for the slow member")
            .unwrap_err();
        assert_eq!(err.task, "fast");
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_member_is_reported_under_its_own_name() {
        let log: Log = Arc::default();
        let boom = define_task(
            "style",
            from_fn(|| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            }),
        );
        let group = parallel("transforms", vec![boom, recording("script", &log, false)]);

        let err = group.run().await.unwrap_err();
        assert_eq!(err.task, "style");
        assert!(err.cause.to_string().contains("kaboom"), "{}", err.cause);
        assert_eq!(*log.lock().unwrap(), vec!["script"]);
    }

    #[tokio::test]
    async fn empty_groups_succeed() {
        assert!(sequence("s", vec![]).run().await.is_ok());
        assert!(parallel("p", vec![]).run().await.is_ok());
    }
}
