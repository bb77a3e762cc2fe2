// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling each task's [`WatchBinding`]s into a glob set.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally hashing watched content so saves that change nothing do not
//!   re-run tasks.
//!
//! It only turns filesystem changes into task-level triggers; running the
//! tasks is the engine's job.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{is_content_event, matching_profiles};
pub use hash::{HashStore, MemoryHashStore, compute_aggregate_hash};
pub use patterns::{TaskWatchProfile, WatchBinding, build_watch_profiles};
pub use watcher::{WatcherHandle, spawn_watcher};
