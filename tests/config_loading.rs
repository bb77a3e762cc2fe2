// tests/config_loading.rs

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use sitepipe::cli::PipelineName;
use sitepipe::config::{TransformKind, load_and_validate, load_or_default};
use sitepipe::errors::PipelineError;
use sitepipe::fs::RealFileSystem;
use sitepipe::orchestrator::Orchestrator;
use sitepipe::types::{ParallelFailurePolicy, TriggerWhileRunningBehaviour};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn relative_roots_resolve_next_to_the_config_file() {
    let file = config_file(
        r#"
[paths]
source_root = "web"
output_root = "/tmp/sitepipe-out"

[config]
triggered_while_running_behaviour = "drop"
parallel_failure = "cancel_siblings"
task_timeout = "30s"

[style]
src = "styles/**/*.css"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let dir = file.path().parent().unwrap();

    assert_eq!(cfg.paths.source_root, dir.join("web"));
    assert_eq!(cfg.paths.output_root, Path::new("/tmp/sitepipe-out"));
    assert_eq!(
        cfg.config.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Drop
    );
    assert_eq!(cfg.config.parallel_failure, ParallelFailurePolicy::CancelSiblings);
    assert_eq!(cfg.task_timeout, Some(Duration::from_secs(30)));
    assert_eq!(cfg.target(TransformKind::Style).src, "styles/**/*.css");
    assert_eq!(cfg.target(TransformKind::Style).watch, vec!["styles/**/*.css"]);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Sitepipe.toml");

    match load_or_default(Some(missing.as_path())) {
        Err(PipelineError::ConfigError(msg)) => assert!(msg.contains("does not exist")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn invalid_glob_names_the_section() {
    let file = config_file("[script]\nsrc = \"js/[\"\n");
    match load_and_validate(file.path()) {
        Err(PipelineError::ConfigError(msg)) => {
            assert!(msg.contains("[script].src"), "{msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn bad_duration_is_rejected() {
    let file = config_file("[config]\ntask_timeout = \"soon\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::ConfigError(msg)) if msg.contains("task_timeout")
    ));
}

#[test]
fn unknown_behaviour_is_a_toml_error() {
    let file = config_file("[config]\ntriggered_while_running_behaviour = \"cancel\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::TomlError(_))
    ));
}

#[test]
fn dry_run_plan_reflects_configured_timeout() {
    let file = config_file("[config]\ntask_timeout = \"2m\"\n");
    let cfg = load_and_validate(file.path()).unwrap();
    let orch = Orchestrator::from_config(cfg, Arc::new(RealFileSystem)).unwrap();

    let plan = orch.describe(PipelineName::Build);
    assert!(plan.contains("- build [sequence]"), "{plan}");
    assert!(plan.contains("- clean (timeout 120s)"), "{plan}");
    assert!(plan.contains("- transforms [parallel, RunToCompletion]"), "{plan}");
    assert!(plan.contains("- assets (timeout 120s)"), "{plan}");
}
