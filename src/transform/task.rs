// src/transform/task.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{Chain, SourceFile, Transform};
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{FileSelector, Work, WorkFuture};

/// Reads every file a selector matches, runs it through a chain and writes
/// the result under `dest`, keeping the path relative to the glob base.
///
/// The file set is resolved on every run, so files added or removed between
/// runs are picked up. An empty set succeeds without touching `dest`.
#[derive(Clone)]
pub struct TransformTask {
    selector: FileSelector,
    dest: PathBuf,
    chain: Arc<Chain>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for TransformTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformTask")
            .field("src", &self.selector)
            .field("dest", &self.dest)
            .field("chain", &self.chain)
            .finish()
    }
}

impl TransformTask {
    pub fn new(
        selector: FileSelector,
        dest: impl Into<PathBuf>,
        chain: Chain,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            selector,
            dest: dest.into(),
            chain: Arc::new(chain),
            fs,
        }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Process the current file set synchronously. Returns the number of
    /// files written.
    pub fn run_blocking(&self) -> Result<usize> {
        let fs = self.fs.as_ref();
        let set = self
            .selector
            .resolve(fs)
            .map_err(|e| PipelineError::TransformFailure {
                path: self.selector.base_dir(),
                reason: format!("{e:#}"),
            })?;

        for source in &set.files {
            let failure = |e: anyhow::Error| PipelineError::TransformFailure {
                path: source.path.clone(),
                reason: format!("{e:#}"),
            };

            let contents = fs.read(&source.path).map_err(failure)?;
            let output = self
                .chain
                .apply(SourceFile::new(source.relative.clone(), contents))
                .map_err(failure)?;
            fs.write(&self.dest.join(&output.relative), &output.contents)
                .map_err(failure)?;
        }

        debug!(
            pattern = self.selector.pattern(),
            dest = ?self.dest,
            files = set.len(),
            "transform wrote files"
        );
        Ok(set.len())
    }
}

impl Work for TransformTask {
    fn run(&self) -> WorkFuture<'_> {
        let task = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || task.run_blocking())
                .await
                .map_err(|e| PipelineError::Other(anyhow::anyhow!("transform worker failed: {e}")))?
                .map(|_| ())
        })
    }
}
