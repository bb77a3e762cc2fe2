// tests/watch_triggers.rs

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};

use sitepipe::engine::{RuntimeEvent, TriggerReason};
use sitepipe::errors::PipelineError;
use sitepipe::fs::RealFileSystem;
use sitepipe::orchestrator::Orchestrator;
use sitepipe::watch::{WatchBinding, build_watch_profiles, matching_profiles, spawn_watcher};
use sitepipe_test_utils::builders::SiteBuilder;
use sitepipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn one_css_change_matches_only_style() -> TestResult {
    init_tracing();

    let site = SiteBuilder::new().build()?;
    let orch = Orchestrator::from_config(site.config().clone(), Arc::new(RealFileSystem))?;
    let profiles = build_watch_profiles(&orch.watch_bindings(), false)?;

    let root = site.source_root();
    let hits = matching_profiles(root, &[root.join("css/site.css")], &profiles);
    let names: Vec<&str> = hits.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["style"]);

    let hits = matching_profiles(root, &[root.join("components/header.html")], &profiles);
    let names: Vec<&str> = hits.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["markup"]);

    let hits = matching_profiles(root, &[root.join("notes/todo.txt")], &profiles);
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn modifying_a_css_file_triggers_style() -> TestResult {
    init_tracing();

    let site = SiteBuilder::new()
        .file("src/css/site.css", "a { color: red; }")
        .file("src/js/app.js", "let a = 1;")
        .build()?;

    let profiles = build_watch_profiles(
        &[
            WatchBinding::new("style", vec!["css/*".into()]),
            WatchBinding::new("script", vec!["js/*.js".into()]),
        ],
        false,
    )?;

    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);
    let _watcher = spawn_watcher(site.source_root(), profiles, tx)?;

    // Give the OS watcher a moment to register.
    sleep(Duration::from_millis(200)).await;
    site.write_source("css/site.css", "a { color: blue; }")?;

    let first = timeout(Duration::from_secs(5), rx.recv()).await?;
    match first {
        Some(RuntimeEvent::TaskTriggered { task, reason }) => {
            assert_eq!(task, "style");
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Platforms may split one save into several events; none of them may
    // name another task.
    while let Ok(Some(event)) = timeout(Duration::from_millis(300), rx.recv()).await {
        match event {
            RuntimeEvent::TaskTriggered { task, .. } => assert_eq!(task, "style"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn missing_source_root_is_a_subscription_failure() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let missing: PathBuf = dir.path().join("nope");
    let (tx, _rx) = mpsc::channel::<RuntimeEvent>(4);

    match spawn_watcher(&missing, Vec::new(), tx) {
        Err(PipelineError::WatchSubscriptionFailure { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected WatchSubscriptionFailure, got {other:?}"),
    }
    Ok(())
}
