// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{PipelineError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::event_handler::{SharedHashStore, prime_hashes, process_event};
use crate::watch::hash::{HashStore, MemoryHashStore};
use crate::watch::patterns::TaskWatchProfile;

/// Handle for the filesystem watcher.
///
/// Dropping it stops file watching.
pub struct WatcherHandle {
    root: PathBuf,
    _inner: RecommendedWatcher,
}

impl WatcherHandle {
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Watch `root` (the source root) recursively and send
/// `RuntimeEvent::TaskTriggered` for profiles matching a changed path.
///
/// A missing root, or an OS refusing another watch, is a
/// [`PipelineError::WatchSubscriptionFailure`].
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let subscription_failure = |reason: String| PipelineError::WatchSubscriptionFailure {
        path: root.clone(),
        reason,
    };

    // Canonicalize once so event paths strip cleanly.
    let root = root
        .canonicalize()
        .map_err(|e| subscription_failure(e.to_string()))?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut store: Box<dyn HashStore> = Box::new(MemoryHashStore::new());
    prime_hashes(fs.as_ref(), &root, &profiles, store.as_mut());
    let hash_store: SharedHashStore = Arc::new(Mutex::new(store));

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    warn!("failed to forward notify event: {err}");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .map_err(|e| subscription_failure(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| subscription_failure(e.to_string()))?;

    info!(?root, tasks = profiles.len(), "file watcher started");

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            let open = process_event(
                Arc::clone(&fs),
                &async_root,
                &event.kind,
                &event.paths,
                &profiles,
                &runtime_tx,
                Arc::clone(&hash_store),
            )
            .await;
            if !open {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        root,
        _inner: watcher,
    })
}
