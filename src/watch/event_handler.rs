// src/watch/event_handler.rs

//! Turning filesystem events into task triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::event::{EventKind, ModifyKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::{HashStore, compute_aggregate_hash};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{TaskWatchProfile, collect_matching_files};

pub(crate) type SharedHashStore = Arc<Mutex<Box<dyn HashStore>>>;

/// Create, content-modify and remove events. Access and metadata-only
/// events never trigger tasks.
pub fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Profiles interested in any of `paths`, each at most once, in profile
/// order.
pub fn matching_profiles<'a>(
    root: &Path,
    paths: &[PathBuf],
    profiles: &'a [TaskWatchProfile],
) -> Vec<&'a TaskWatchProfile> {
    let rel_paths: Vec<String> = paths
        .iter()
        .filter_map(|path| {
            let rel = relative_str(root, path);
            if rel.is_none() {
                warn!(?path, ?root, "could not relativize event path");
            }
            rel
        })
        .collect();

    profiles
        .iter()
        .filter(|profile| rel_paths.iter().any(|rel| profile.matches(rel)))
        .collect()
}

/// Handle one notify event: send one `TaskTriggered` per distinct matching
/// task.
///
/// Returns `false` once the runtime channel is closed.
pub(crate) async fn process_event(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    kind: &EventKind,
    paths: &[PathBuf],
    profiles: &[TaskWatchProfile],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    hash_store: SharedHashStore,
) -> bool {
    if !is_content_event(kind) {
        return true;
    }

    for profile in matching_profiles(root, paths, profiles) {
        if profile.use_hash()
            && !content_changed(Arc::clone(&fs), root, profile, Arc::clone(&hash_store)).await
        {
            continue;
        }

        debug!(task = %profile.name(), ?paths, "watch match -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task: profile.name().to_string(),
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

/// Record the current content hash of every hashing profile so the first
/// no-op save after startup is already recognised.
pub(crate) fn prime_hashes(
    fs: &dyn FileSystem,
    root: &Path,
    profiles: &[TaskWatchProfile],
    store: &mut dyn HashStore,
) {
    for profile in profiles.iter().filter(|p| p.use_hash()) {
        match watched_hash(fs, root, profile) {
            Ok(hash) => store.save(profile.name(), &hash),
            Err(err) => warn!(task = %profile.name(), error = %err, "could not hash watched files"),
        }
    }
}

fn watched_hash(fs: &dyn FileSystem, root: &Path, profile: &TaskWatchProfile) -> anyhow::Result<String> {
    let files = collect_matching_files(fs, root, profile)?;
    compute_aggregate_hash(fs, &files)
}

/// Whether the watched content of `profile` differs from the last recorded
/// hash. Errors err on the side of triggering.
async fn content_changed(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    profile: &TaskWatchProfile,
    hash_store: SharedHashStore,
) -> bool {
    let root = root.to_path_buf();
    let profile = profile.clone();

    tokio::task::spawn_blocking(move || {
        let task = profile.name();
        let new_hash = match watched_hash(fs.as_ref(), &root, &profile) {
            Ok(h) => h,
            Err(err) => {
                warn!(task = %task, error = %err, "failed to hash watched files; triggering anyway");
                return true;
            }
        };

        let Ok(mut store) = hash_store.lock() else {
            warn!(task = %task, "hash store mutex poisoned; triggering anyway");
            return true;
        };

        if store.load(task).as_deref() == Some(new_hash.as_str()) {
            info!(task = %task, "watched content unchanged; skipping trigger");
            return false;
        }
        store.save(task, &new_hash);
        true
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::watch::hash::MemoryHashStore;
    use crate::watch::patterns::{WatchBinding, build_watch_profiles};
    use notify::event::{AccessKind, CreateKind, DataChange};

    fn profiles(use_hash: bool) -> Vec<TaskWatchProfile> {
        build_watch_profiles(
            &[
                WatchBinding::new("style", vec!["css/*".into()]),
                WatchBinding::new("markup", vec!["pages/*.html".into(), "components/*.html".into()]),
            ],
            use_hash,
        )
        .unwrap()
    }

    fn store() -> SharedHashStore {
        Arc::new(Mutex::new(Box::new(MemoryHashStore::new())))
    }

    async fn drain(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(RuntimeEvent::TaskTriggered { task, .. }) = rx.try_recv() {
            names.push(task);
        }
        names
    }

    #[test]
    fn access_and_metadata_events_are_ignored() {
        assert!(!is_content_event(&EventKind::Access(AccessKind::Any)));
        assert!(!is_content_event(&EventKind::Modify(ModifyKind::Metadata(
            notify::event::MetadataKind::Any
        ))));
        assert!(is_content_event(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_content_event(&EventKind::Create(CreateKind::File)));
    }

    #[tokio::test]
    async fn one_trigger_per_task_per_event() {
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let (tx, mut rx) = mpsc::channel(16);
        let paths = vec![
            PathBuf::from("/site/src/pages/index.html"),
            PathBuf::from("/site/src/components/header.html"),
            PathBuf::from("/site/src/css/a.css"),
            PathBuf::from("/site/src/css/b.css"),
        ];

        let open = process_event(
            fs,
            Path::new("/site/src"),
            &EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &paths,
            &profiles(false),
            &tx,
            store(),
        )
        .await;

        assert!(open);
        assert_eq!(drain(&mut rx).await, vec!["style", "markup"]);
    }

    #[tokio::test]
    async fn unchanged_content_is_skipped_with_use_hash() {
        let mock = MockFileSystem::new();
        mock.add_file("src/css/a.css", "a{}");
        let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());
        let profiles = profiles(true);
        let hashes = store();
        {
            let mut guard = hashes.lock().unwrap();
            prime_hashes(fs.as_ref(), Path::new("src"), &profiles, guard.as_mut());
        }

        let (tx, mut rx) = mpsc::channel(16);
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        let paths = vec![PathBuf::from("src/css/a.css")];

        process_event(Arc::clone(&fs), Path::new("src"), &kind, &paths, &profiles, &tx, Arc::clone(&hashes)).await;
        assert!(drain(&mut rx).await.is_empty());

        mock.add_file("src/css/a.css", "a{color:red}");
        process_event(fs, Path::new("src"), &kind, &paths, &profiles, &tx, hashes).await;
        assert_eq!(drain(&mut rx).await, vec!["style"]);
    }

    #[tokio::test]
    async fn closed_runtime_stops_processing() {
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let open = process_event(
            fs,
            Path::new("src"),
            &EventKind::Create(CreateKind::File),
            &[PathBuf::from("src/css/new.css")],
            &profiles(false),
            &tx,
            store(),
        )
        .await;
        assert!(!open);
    }
}
