// src/watch/path_utils.rs

use std::path::Path;

/// Render a relative path with forward slashes, the form glob patterns are
/// written in.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `path` relative to `root`, with forward slashes.
///
/// Event paths may spell the root differently from the one that was
/// watched (symlinked temp dirs on macOS), so a failed prefix strip is
/// retried on canonical paths. A deleted file cannot be canonicalized; its
/// parent is tried instead.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        return path_canon.strip_prefix(&root_canon).ok().map(to_slash);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let rel_parent = parent.strip_prefix(&root_canon).ok()?;
    Some(to_slash(&rel_parent.join(path.file_name()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/site/src"), Path::new("/site/src/css/a.css")).as_deref(),
            Some("css/a.css")
        );
        assert_eq!(relative_str(Path::new("/site/src"), Path::new("/elsewhere/a.css")), None);
    }

    #[test]
    fn resolves_removed_files_through_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/css")).unwrap();

        // A root spelled differently from the event path defeats the direct strip.
        let root = dir.path().join("src/../src");
        let gone = dir.path().join("src/css/gone.css");
        assert_eq!(relative_str(&root, &gone).as_deref(), Some("css/gone.css"));
    }
}
