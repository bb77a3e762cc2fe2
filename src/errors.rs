// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::TaskName;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A transform could not process one of its input files.
    #[error("transform failed for {path:?}: {reason}")]
    TransformFailure { path: PathBuf, reason: String },

    /// The output directory could not be removed.
    #[error("could not clean {path:?}: {reason}")]
    CleanFailure { path: PathBuf, reason: String },

    #[error("dev server failed to start on {addr}: {reason}")]
    ServerStartFailure { addr: String, reason: String },

    #[error("watch subscription failed for {path:?}: {reason}")]
    WatchSubscriptionFailure { path: PathBuf, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Task(Box<TaskFailure>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a named task, as surfaced by the combinators.
///
/// Composite tasks never wrap a member's failure: the `task` field always
/// names the leaf that actually failed.
#[derive(Error, Debug)]
#[error("task '{task}' failed: {cause}")]
pub struct TaskFailure {
    pub task: TaskName,
    #[source]
    pub cause: PipelineError,
}

impl TaskFailure {
    pub fn new(task: impl Into<TaskName>, cause: PipelineError) -> Self {
        Self {
            task: task.into(),
            cause,
        }
    }
}

impl From<TaskFailure> for PipelineError {
    fn from(failure: TaskFailure) -> Self {
        PipelineError::Task(Box::new(failure))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
