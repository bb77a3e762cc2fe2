// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model with its defaults (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate globs, destinations and server settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ConfigSection, IncludeSection, MarkupOptions, MarkupSection, PathsSection,
    RawConfigFile, ServerSection, TransformKind, TransformSection, TransformTarget, WatchSection,
};
pub use validate::validate_config;
