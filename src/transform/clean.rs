// src/transform/clean.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{Work, WorkFuture};

/// Removes the output root and everything below it.
///
/// A target that does not exist counts as already clean.
#[derive(Debug, Clone)]
pub struct CleanTask {
    target: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl CleanTask {
    pub fn new(target: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            target: target.into(),
            fs,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Work for CleanTask {
    fn run(&self) -> WorkFuture<'_> {
        let target = self.target.clone();
        let fs = Arc::clone(&self.fs);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || clean(fs.as_ref(), &target))
                .await
                .map_err(|e| PipelineError::Other(anyhow::anyhow!("clean worker failed: {e}")))?
        })
    }
}

fn clean(fs: &dyn FileSystem, target: &Path) -> Result<()> {
    if !fs.exists(target) {
        debug!(?target, "nothing to clean");
        return Ok(());
    }

    fs.remove_dir_all(target)
        .map_err(|e| PipelineError::CleanFailure {
            path: target.to_path_buf(),
            reason: format!("{e:#}"),
        })?;
    info!(?target, "removed output directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn removes_the_whole_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/css/a.css", "a{}");
        fs.add_file("dist/pages/index.html", "<p>");
        fs.add_file("src/css/a.css", "a {}");

        let task = CleanTask::new("dist", Arc::new(fs.clone()));
        task.run().await.unwrap();

        let left: Vec<PathBuf> = fs.files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(left, vec![PathBuf::from("src/css/a.css")]);
    }

    #[tokio::test]
    async fn missing_target_is_success_and_repeatable() {
        let fs = MockFileSystem::new();
        let task = CleanTask::new("dist", Arc::new(fs));
        task.run().await.unwrap();
        task.run().await.unwrap();
    }
}
