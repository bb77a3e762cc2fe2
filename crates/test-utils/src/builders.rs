#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sitepipe::config::{load_and_validate, ConfigFile};
use tempfile::TempDir;

/// Builder for a throwaway project directory with a `Sitepipe.toml`.
///
/// ```ignore
/// let site = SiteBuilder::new()
///     .file("src/css/site.css", "a { color: red; }")
///     .config("[server]\nport = 9000\n")
///     .build()?;
/// ```
pub struct SiteBuilder {
    files: Vec<(PathBuf, Vec<u8>)>,
    dirs: Vec<PathBuf>,
    config: String,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            dirs: Vec::new(),
            config: String::new(),
        }
    }

    /// Add a file, relative to the project root.
    pub fn file(mut self, rel: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((PathBuf::from(rel), contents.into()));
        self
    }

    /// Add an empty directory, relative to the project root.
    pub fn dir(mut self, rel: &str) -> Self {
        self.dirs.push(PathBuf::from(rel));
        self
    }

    /// Contents of `Sitepipe.toml`. Defaults to an empty file.
    pub fn config(mut self, toml_src: &str) -> Self {
        self.config = toml_src.to_string();
        self
    }

    pub fn build(self) -> Result<Site> {
        let dir = tempfile::tempdir().context("creating temp project dir")?;
        for rel in &self.dirs {
            fs::create_dir_all(dir.path().join(rel))?;
        }
        for (rel, contents) in &self.files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents).with_context(|| format!("writing {path:?}"))?;
        }

        let config_path = dir.path().join("Sitepipe.toml");
        fs::write(&config_path, &self.config)?;
        let config = load_and_validate(&config_path)?;

        Ok(Site { dir, config })
    }
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A project on disk plus its loaded config. The directory is removed on
/// drop.
pub struct Site {
    dir: TempDir,
    config: ConfigFile,
}

impl Site {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn source_root(&self) -> &Path {
        &self.config.paths.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.config.paths.output_root
    }

    pub fn write_source(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.source_root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn read_output(&self, rel: &str) -> Result<String> {
        let path = self.output_root().join(rel);
        fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))
    }

    /// Every file under the output root, keyed by its relative path.
    pub fn output_tree(&self) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let mut tree = BTreeMap::new();
        let root = self.output_root();
        if !root.exists() {
            return Ok(tree);
        }
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(root)?.to_path_buf();
                    tree.insert(rel, fs::read(&path)?);
                }
            }
        }
        Ok(tree)
    }
}
