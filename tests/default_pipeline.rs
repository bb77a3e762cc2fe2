// tests/default_pipeline.rs

use std::error::Error;
use std::net::TcpListener as StdListener;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::{Duration, sleep, timeout};

use sitepipe::errors::PipelineError;
use sitepipe::fs::RealFileSystem;
use sitepipe::orchestrator::Orchestrator;
use sitepipe_test_utils::builders::SiteBuilder;
use sitepipe_test_utils::{eventually, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

fn free_port() -> std::io::Result<u16> {
    let listener = StdListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[tokio::test]
async fn source_change_is_rebuilt_while_serving() -> TestResult {
    init_tracing();

    let port = free_port()?;
    let site = SiteBuilder::new()
        .file("src/css/site.css", "a { color: red; }\n")
        .config(&format!("[server]\nhost = \"127.0.0.1\"\nport = {port}\n"))
        .build()?;
    let orch = Orchestrator::from_config(site.config().clone(), Arc::new(RealFileSystem))?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = orch.run_default_until(false, async move {
        let _ = stop_rx.await;
    });

    let driver = async {
        let built = eventually(|| site.read_output("css/site.css").is_ok_and(|c| c == "a{color:red}")).await;

        // Let the watcher settle before editing.
        sleep(Duration::from_millis(300)).await;
        site.write_source("css/site.css", "a { color: blue; }\n")?;
        let rebuilt = eventually(|| site.read_output("css/site.css").is_ok_and(|c| c == "a{color:blue}")).await;

        let _ = stop_tx.send(());
        Ok::<_, anyhow::Error>((built, rebuilt))
    };

    let (run_result, driven) = timeout(Duration::from_secs(15), async { tokio::join!(run, driver) }).await?;
    run_result?;
    let (built, rebuilt) = driven?;
    assert!(built, "initial build output missing");
    assert!(rebuilt, "watched change was not rebuilt");
    Ok(())
}

#[tokio::test]
async fn failed_build_never_starts_serving() -> TestResult {
    init_tracing();

    let port = free_port()?;
    let site = SiteBuilder::new()
        .file("src/less/broken.less", ".a { color: @missing; }\n")
        .config(&format!("[server]\nhost = \"127.0.0.1\"\nport = {port}\n"))
        .build()?;
    let orch = Orchestrator::from_config(site.config().clone(), Arc::new(RealFileSystem))?;

    let err = timeout(
        Duration::from_secs(5),
        orch.run_default_until(false, std::future::pending::<()>()),
    )
    .await?
    .unwrap_err();

    assert!(matches!(err, PipelineError::Task(ref f) if f.task == "preprocessor"), "{err}");
    // Nothing was bound to the port.
    assert!(StdListener::bind(("127.0.0.1", port)).is_ok());
    Ok(())
}
