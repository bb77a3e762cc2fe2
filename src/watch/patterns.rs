// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::pipeline::TaskName;
use crate::watch::path_utils::to_slash;

/// Glob patterns (relative to the source root) whose changes re-run a task.
///
/// Several bindings may name the same task; a change matching any of them
/// triggers the task once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub task: TaskName,
    pub patterns: Vec<String>,
}

impl WatchBinding {
    pub fn new(task: impl Into<TaskName>, patterns: Vec<String>) -> Self {
        Self {
            task: task.into(),
            patterns,
        }
    }
}

/// Compiled patterns of every binding for one task.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    patterns: Vec<String>,
    watch_set: GlobSet,
    use_hash: bool,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether triggers are suppressed while the watched content is unchanged.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// `rel_path` is relative to the source root, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
    }
}

/// Compile bindings into one profile per task, in first-seen order.
///
/// `*` does not cross directory separators, the same as for build sources.
pub fn build_watch_profiles(
    bindings: &[WatchBinding],
    use_hash: bool,
) -> Result<Vec<TaskWatchProfile>> {
    let mut grouped: Vec<(TaskName, Vec<String>)> = Vec::new();
    for binding in bindings {
        match grouped.iter_mut().find(|(name, _)| *name == binding.task) {
            Some((_, patterns)) => patterns.extend(binding.patterns.iter().cloned()),
            None => grouped.push((binding.task.clone(), binding.patterns.clone())),
        }
    }

    grouped
        .into_iter()
        .map(|(name, patterns)| {
            let watch_set = build_globset(&patterns)
                .with_context(|| format!("building watch globset for task {name}"))?;
            Ok(TaskWatchProfile {
                name,
                patterns,
                watch_set,
                use_hash,
            })
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Every file under `root` a profile matches, sorted.
///
/// Used to hash a task's watched content when `use_hash` is on.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &TaskWatchProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = to_slash(rel);
                    if profile.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
