// src/config/validate.rs

use std::path::Path;

use globset::GlobBuilder;

use crate::config::model::{ConfigFile, RawConfigFile, TransformKind, resolve_target};
use crate::errors::{PipelineError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let task_timeout = match raw.config.task_timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                PipelineError::ConfigError(format!("[config].task_timeout: {e}"))
            })?),
            None => None,
        };
        Ok(ConfigFile::new_unchecked(raw, task_timeout))
    }
}

/// Validate an already-built config (e.g. one assembled in tests).
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    for target in &cfg.targets {
        validate_glob(target.kind.task_name(), "src", &target.src)?;
        for pattern in &target.watch {
            validate_glob(target.kind.task_name(), "watch", pattern)?;
        }
    }
    let dests: Vec<(&str, &str)> = cfg
        .targets
        .iter()
        .map(|t| (t.kind.task_name(), t.dest.as_str()))
        .collect();
    validate_disjoint_destinations(&dests)?;
    if cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_targets(cfg)?;
    validate_include(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // Behaviour enums are validated during deserialization.
    if let Some(ref s) = cfg.config.task_timeout {
        let timeout = parse_duration(s)
            .map_err(|e| PipelineError::ConfigError(format!("[config].task_timeout: {e}")))?;
        if timeout.is_zero() {
            return Err(PipelineError::ConfigError(
                "[config].task_timeout must be greater than zero".to_string(),
            ));
        }
    }
    if cfg.paths.source_root == cfg.paths.output_root {
        return Err(PipelineError::ConfigError(format!(
            "[paths].source_root and output_root must differ (both {:?})",
            cfg.paths.source_root
        )));
    }
    if cfg.paths.source_root.starts_with(&cfg.paths.output_root) {
        return Err(PipelineError::ConfigError(format!(
            "[paths].source_root {:?} lies inside output_root {:?}; clean would delete sources",
            cfg.paths.source_root, cfg.paths.output_root
        )));
    }
    Ok(())
}

fn validate_targets(cfg: &RawConfigFile) -> Result<()> {
    let mut dests = Vec::new();
    for kind in TransformKind::ALL {
        let target = resolve_target(kind, cfg);
        let name = kind.task_name();

        validate_glob(name, "src", &target.src)?;
        for pattern in &target.watch {
            validate_glob(name, "watch", pattern)?;
        }
        if Path::new(&target.dest).is_absolute() || target.dest.split('/').any(|c| c == "..") {
            return Err(PipelineError::ConfigError(format!(
                "[{name}].dest must stay inside the output root (got '{}')",
                target.dest
            )));
        }
        dests.push((name, target.dest));
    }

    let borrowed: Vec<(&str, &str)> = dests.iter().map(|(n, d)| (*n, d.as_str())).collect();
    validate_disjoint_destinations(&borrowed)
}

/// Parallel transforms must never write into each other's directories.
fn validate_disjoint_destinations(dests: &[(&str, &str)]) -> Result<()> {
    for (i, (name_a, dest_a)) in dests.iter().enumerate() {
        for (name_b, dest_b) in dests.iter().skip(i + 1) {
            let a = Path::new(dest_a.trim_end_matches('/'));
            let b = Path::new(dest_b.trim_end_matches('/'));
            if a.starts_with(b) || b.starts_with(a) {
                return Err(PipelineError::ConfigError(format!(
                    "destinations of '{name_a}' ('{dest_a}') and '{name_b}' ('{dest_b}') overlap"
                )));
            }
        }
    }
    Ok(())
}

fn validate_include(cfg: &RawConfigFile) -> Result<()> {
    if cfg.markup.include.prefix.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[markup.include].prefix must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_glob(task: &str, field: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "[{task}].{field} must not be empty"
        )));
    }
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| {
            PipelineError::ConfigError(format!(
                "[{task}].{field}: invalid glob pattern '{pattern}': {e}"
            ))
        })?;
    Ok(())
}
