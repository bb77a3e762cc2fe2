// src/pipeline/fileset.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;
use crate::watch::path_utils::to_slash;

/// A source glob anchored at a root directory, e.g. root `src` with pattern
/// `css/*.css`.
///
/// The *base* of the pattern is its leading run of literal directories
/// (`css` above). Output paths mirror the matched file's location relative
/// to that base, so `src/css/a.css` lands at `<dest>/a.css`.
#[derive(Clone)]
pub struct FileSelector {
    root: PathBuf,
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

impl fmt::Debug for FileSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSelector")
            .field("root", &self.root)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// One matched source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePath {
    /// Path as handed to the filesystem.
    pub path: PathBuf,
    /// Location relative to the pattern base.
    pub relative: PathBuf,
}

/// The files a selector matched at one point in time.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    pub files: Vec<SourcePath>,
}

impl FileSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl FileSelector {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();

        Ok(Self {
            root: root.into(),
            pattern: pattern.to_string(),
            base: glob_base(pattern),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory the walk starts from (`root` joined with the pattern base).
    pub fn base_dir(&self) -> PathBuf {
        self.root.join(&self.base)
    }

    /// Whether a path relative to the root (forward slashes) is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Resolve the selector against the filesystem as it is right now.
    ///
    /// A missing base directory yields an empty set. Files are returned in
    /// path order so runs are deterministic.
    pub fn resolve(&self, fs: &dyn FileSystem) -> Result<FileSet> {
        let base_dir = self.base_dir();
        let mut files = Vec::new();

        if !fs.is_dir(&base_dir) {
            return Ok(FileSet { files });
        }

        let mut stack = vec![base_dir.clone()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    let Ok(rel_to_root) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let rel_str = to_slash(rel_to_root);
                    if !self.matches(&rel_str) {
                        continue;
                    }
                    let relative = path
                        .strip_prefix(&base_dir)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| rel_to_root.to_path_buf());
                    files.push(SourcePath { path, relative });
                }
            }
        }

        files.sort();
        Ok(FileSet { files })
    }
}

/// Leading literal directories of a glob pattern.
fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    // The last component names files, never the base.
    for comp in &components[..components.len().saturating_sub(1)] {
        if comp.chars().any(|c| matches!(c, '*' | '?' | '[' | '{')) {
            break;
        }
        base.push(comp);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("css/*.css"), PathBuf::from("css"));
        assert_eq!(glob_base("assets/**/*"), PathBuf::from("assets"));
        assert_eq!(glob_base("a/b/{x,y}/*.js"), PathBuf::from("a/b"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("pages/index.html"), PathBuf::from("pages"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("src/css/a.css", "a{}");
        fs.add_file("src/css/vendor/b.css", "b{}");
        fs.add_file("src/css/readme.txt", "hi");

        let sel = FileSelector::new("src", "css/*.css").unwrap();
        let set = sel.resolve(&fs).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.files[0].path, PathBuf::from("src/css/a.css"));
        assert_eq!(set.files[0].relative, PathBuf::from("a.css"));
    }

    #[test]
    fn double_star_keeps_nested_structure() {
        let fs = MockFileSystem::new();
        fs.add_file("src/assets/logo.png", vec![1u8, 2, 3]);
        fs.add_file("src/assets/fonts/a.woff", vec![4u8]);

        let sel = FileSelector::new("src", "assets/**/*").unwrap();
        let set = sel.resolve(&fs).unwrap();

        let rels: Vec<PathBuf> = set.files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("fonts/a.woff"), PathBuf::from("logo.png")]
        );
    }

    #[test]
    fn missing_base_directory_is_empty() {
        let fs = MockFileSystem::new();
        let sel = FileSelector::new("src", "assets/**/*").unwrap();
        assert!(sel.resolve(&fs).unwrap().is_empty());
    }

    #[test]
    fn empty_base_directory_is_empty() {
        let fs = MockFileSystem::new();
        fs.add_dir("src/assets/icons");
        let sel = FileSelector::new("src", "assets/**/*").unwrap();
        assert!(sel.resolve(&fs).unwrap().is_empty());
    }

    #[test]
    fn set_is_recomputed_on_every_resolve() {
        let fs = MockFileSystem::new();
        fs.add_file("src/js/a.js", "a");
        let sel = FileSelector::new("src", "js/*.js").unwrap();
        assert_eq!(sel.resolve(&fs).unwrap().len(), 1);

        fs.add_file("src/js/b.js", "b");
        assert_eq!(sel.resolve(&fs).unwrap().len(), 2);
    }
}
