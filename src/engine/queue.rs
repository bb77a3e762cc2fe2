// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived for tasks which were still running.
///
/// Semantics:
/// - Every entry is a task name that should run again once its current run
///   completes.
/// - Repeated triggers for the same task coalesce: however many changes
///   land during one run, the task re-runs exactly once afterwards.
/// - In `Drop` mode nothing is recorded; dropped triggers are only counted.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: BTreeSet<TaskName>,
    dropped: usize,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: BTreeSet::new(),
            dropped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Triggers discarded so far in `Drop` mode.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Record that `task` was triggered while running.
    ///
    /// Returns `true` if the trigger will lead to a re-run.
    pub fn record_trigger(&mut self, task: &str) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if !self.pending.insert(task.to_string()) {
                    debug!(task = %task, "re-run already pending; coalesced");
                }
                true
            }
            TriggerWhileRunningBehaviour::Drop => {
                self.dropped += 1;
                false
            }
        }
    }

    /// Remove and report the pending re-run for `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        self.pending.remove(task)
    }

    /// Names with a pending re-run, sorted.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_coalesce_into_one_rerun() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue);
        assert!(q.record_trigger("style"));
        assert!(q.record_trigger("style"));
        assert!(q.record_trigger("markup"));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pending().collect::<Vec<_>>(), vec!["markup", "style"]);

        assert!(q.take("style"));
        assert!(!q.take("style"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn drop_mode_never_records() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Drop);
        assert!(!q.record_trigger("style"));
        assert!(!q.record_trigger("style"));
        assert!(q.is_empty());
        assert_eq!(q.dropped(), 2);
        assert!(!q.take("style"));
    }
}
