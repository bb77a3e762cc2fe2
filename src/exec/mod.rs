// src/exec/mod.rs

//! Task execution layer for watch mode.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` the runtime uses in production; tests replace it
//!   with a fake.
//! - [`task_runner`] runs one registered task and reports its outcome as a
//!   `RuntimeEvent`.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use task_runner::run_task;
