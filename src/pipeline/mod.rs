// src/pipeline/mod.rs

//! Task model and structural composition.
//!
//! - [`task`] defines [`Task`], the [`Work`] trait and `define_task`.
//! - [`combinator`] executes `Sequence` and `Parallel` groups.
//! - [`registry`] maps task names to tasks for the watcher and CLI.
//! - [`fileset`] resolves a source glob into the files a transform reads.
//!
//! Pipelines are plain values built once at startup and passed around
//! explicitly; there is no global registry.

pub mod combinator;
pub mod fileset;
pub mod registry;
pub mod task;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

pub use combinator::{parallel, parallel_with_policy, sequence};
pub use fileset::{FileSelector, FileSet, SourcePath};
pub use registry::TaskRegistry;
pub use task::{FnWork, Task, TaskKind, Work, WorkFuture, define_task, from_fn};
