// src/orchestrator.rs

//! Wiring of the named pipelines.
//!
//! [`Orchestrator::from_config`] turns a validated [`ConfigFile`] into a
//! [`TaskRegistry`] holding the clean step and the five transforms, plus the
//! `build` pipeline composed from them. `default` is `build` followed by the
//! dev server and the watch loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::PipelineName;
use crate::config::{ConfigFile, TransformKind};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{PipelineError, Result};
use crate::exec::RealExecutorBackend;
use crate::fs::FileSystem;
use crate::pipeline::{
    FileSelector, Task, TaskRegistry, define_task, parallel_with_policy, sequence,
};
use crate::server::{DevServer, ServerHandle};
use crate::transform::{
    AssetCopy, Chain, CleanTask, CssMinifier, FileInclude, HtmlMinifier, LessCompiler,
    ScriptMinifier, StylePrefixer, TransformTask,
};
use crate::watch::{WatchBinding, build_watch_profiles, spawn_watcher};

pub const CLEAN_TASK: &str = "clean";
pub const BUILD_PIPELINE: &str = "build";
const TRANSFORMS_GROUP: &str = "transforms";

/// Upper bound on waiting for open connections when the dev server stops.
const SERVER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct Orchestrator {
    config: ConfigFile,
    registry: Arc<TaskRegistry>,
    build: Task,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.registry.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Build every task and the `build` pipeline from `config`.
    ///
    /// All file access goes through `fs`.
    pub fn from_config(config: ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let limit = config.task_timeout;
        let bounded = |task: Task| match limit {
            Some(limit) => task.with_timeout(limit),
            None => task,
        };

        let clean = bounded(define_task(
            CLEAN_TASK,
            CleanTask::new(&config.paths.output_root, Arc::clone(&fs)),
        ));

        let mut transforms = Vec::with_capacity(TransformKind::ALL.len());
        for kind in TransformKind::ALL {
            let chain = chain_for(kind, &config, Arc::clone(&fs))?;
            transforms.push(bounded(transform_task(kind, chain, &config, Arc::clone(&fs))?));
        }

        let mut registry = TaskRegistry::new();
        registry.insert(clean.clone())?;
        for task in &transforms {
            registry.insert(task.clone())?;
        }

        let build = sequence(
            BUILD_PIPELINE,
            vec![
                clean,
                parallel_with_policy(TRANSFORMS_GROUP, config.config.parallel_failure, transforms),
            ],
        );
        registry.insert(build.clone())?;

        Ok(Self {
            config,
            registry: Arc::new(registry),
            build,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn build_pipeline(&self) -> &Task {
        &self.build
    }

    /// Which source changes re-run which transform.
    ///
    /// Patterns are relative to the source root. Pages are also rebuilt
    /// when an included component changes.
    pub fn watch_bindings(&self) -> Vec<WatchBinding> {
        self.config
            .targets
            .iter()
            .map(|t| WatchBinding::new(t.kind.task_name(), t.watch.clone()))
            .collect()
    }

    /// Render a pipeline for `--dry-run`.
    pub fn describe(&self, pipeline: PipelineName) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "source root: {}\noutput root: {}\n\n",
            self.config.paths.source_root.display(),
            self.config.paths.output_root.display()
        ));

        match pipeline {
            PipelineName::Build => out.push_str(&self.build.describe()),
            PipelineName::Default => {
                out.push_str("- default [sequence]\n");
                for line in self.build.describe().lines() {
                    out.push_str(&format!("  {line}\n"));
                }
                let server = &self.config.server;
                out.push_str(&format!(
                    "  - serve {}:{} (live reload {})\n",
                    server.host,
                    server.port,
                    if server.live_reload { "on" } else { "off" }
                ));
                out.push_str(&format!(
                    "  - watch ({:?})\n",
                    self.config.config.triggered_while_running_behaviour
                ));
                for binding in self.watch_bindings() {
                    out.push_str(&format!(
                        "    - {} <- {}\n",
                        binding.task,
                        binding.patterns.join(", ")
                    ));
                }
            }
        }
        out
    }

    /// Clean the output root, then run every transform.
    pub async fn run_build(&self) -> Result<()> {
        info!(pipeline = BUILD_PIPELINE, "running pipeline");
        self.build.run().await.map_err(PipelineError::from)?;
        info!(pipeline = BUILD_PIPELINE, output = ?self.config.paths.output_root, "build complete");
        Ok(())
    }

    /// Build, serve and watch until Ctrl-C.
    pub async fn run_default(&self, open_browser: bool) -> Result<()> {
        self.run_default_until(open_browser, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Build, serve and watch until `shutdown` resolves.
    ///
    /// A failing build stops here, before anything is served.
    pub async fn run_default_until<F>(&self, open_browser: bool, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.run_build().await?;

        let server = DevServer::new(&self.config.paths.output_root, self.config.server.clone())
            .open_browser(open_browser)
            .serve()
            .await?;

        let result = self.watch_until(shutdown).await;
        stop_server(server).await;
        result
    }

    async fn watch_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let profiles = build_watch_profiles(&self.watch_bindings(), self.config.watch.use_hash)?;
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

        let _watcher = spawn_watcher(&self.config.paths.source_root, profiles, rt_tx.clone())?;

        {
            let tx = rt_tx.clone();
            tokio::spawn(async move {
                shutdown.await;
                info!("shutdown requested");
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        let core = CoreRuntime::new(
            self.config.config.triggered_while_running_behaviour,
            RuntimeOptions::default(),
        );
        let executor = RealExecutorBackend::new(Arc::clone(&self.registry), rt_tx);
        Runtime::new(core, rt_rx, executor).run().await
    }
}

async fn stop_server(server: ServerHandle) {
    if tokio::time::timeout(SERVER_SHUTDOWN_GRACE, server.shutdown())
        .await
        .is_err()
    {
        warn!("dev server did not stop within {:?}", SERVER_SHUTDOWN_GRACE);
    }
}

fn chain_for(kind: TransformKind, config: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Chain> {
    let chain = match kind {
        TransformKind::Style => Chain::new().pipe(StylePrefixer::new()?).pipe(CssMinifier),
        TransformKind::Preprocessor => Chain::new()
            .pipe(LessCompiler::new()?)
            .pipe(StylePrefixer::new()?)
            .pipe(CssMinifier),
        TransformKind::Script => Chain::new().pipe(ScriptMinifier),
        TransformKind::Markup => Chain::new()
            .pipe(FileInclude::new(&config.include.prefix, config.include_base(), fs)?)
            .pipe(HtmlMinifier::new(config.markup)),
        TransformKind::Assets => Chain::new().pipe(AssetCopy),
    };
    Ok(chain)
}

fn transform_task(
    kind: TransformKind,
    chain: Chain,
    config: &ConfigFile,
    fs: Arc<dyn FileSystem>,
) -> Result<Task> {
    let target = config.target(kind);
    let selector = FileSelector::new(&config.paths.source_root, &target.src)?;
    let dest = config.paths.output_root.join(&target.dest);
    Ok(define_task(
        kind.task_name(),
        TransformTask::new(selector, dest, chain, fs),
    ))
}
