// src/watch/hash.rs

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash of one file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let contents = fs.read(path)?;
    Ok(blake3::hash(&contents).to_hex().to_string())
}

/// Hash over a set of files, path names included so a rename changes it.
/// `paths` must already be sorted.
pub fn compute_aggregate_hash<P: AsRef<Path>>(fs: &dyn FileSystem, paths: &[P]) -> Result<String> {
    let mut hasher = Hasher::new();
    for path in paths {
        let path = path.as_ref();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(fs, path)?.as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(files = paths.len(), hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Last seen content hash per task.
pub trait HashStore: Send + Sync {
    fn load(&self, task: &str) -> Option<String>;
    fn save(&mut self, task: &str, hash: &str);
}

/// In-process [`HashStore`]; starts empty on every run.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, task: &str) -> Option<String> {
        self.map.get(task).cloned()
    }

    fn save(&mut self, task: &str, hash: &str) {
        debug!(task = %task, hash = %hash, "stored task hash");
        self.map.insert(task.to_string(), hash.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn aggregate_hash_tracks_content_and_names() {
        let fs = MockFileSystem::new();
        fs.add_file("a.css", "a{}");
        fs.add_file("b.css", "b{}");
        let paths = vec![PathBuf::from("a.css"), PathBuf::from("b.css")];

        let first = compute_aggregate_hash(&fs, &paths).unwrap();
        assert_eq!(first, compute_aggregate_hash(&fs, &paths).unwrap());

        fs.add_file("b.css", "b{color:red}");
        assert_ne!(first, compute_aggregate_hash(&fs, &paths).unwrap());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryHashStore::new();
        assert_eq!(store.load("style"), None);
        store.save("style", "abc");
        assert_eq!(store.load("style").as_deref(), Some("abc"));
    }
}
