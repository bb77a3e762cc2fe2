// src/transform/mod.rs

//! File transforms and the tasks that drive them.
//!
//! A [`Transform`] turns one [`SourceFile`] into another; a [`Chain`] pipes
//! several of them together. [`TransformTask`] binds a chain to a source
//! glob and a destination directory, and [`CleanTask`] removes the output
//! root before a build.
//!
//! The concrete transforms cover the subset of each language a static site
//! needs, not the full semantics of dedicated tools.

pub mod assets;
pub mod clean;
pub mod include;
pub mod less;
pub mod markup;
pub mod script;
pub mod style;
pub mod task;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use assets::AssetCopy;
pub use clean::CleanTask;
pub use include::FileInclude;
pub use less::LessCompiler;
pub use markup::HtmlMinifier;
pub use script::ScriptMinifier;
pub use style::{CssMinifier, StylePrefixer};
pub use task::TransformTask;

/// A file flowing through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the destination directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative: relative.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{:?} is not valid UTF-8", self.relative))
    }

    /// Replace the contents with new text.
    pub fn with_text(mut self, text: String) -> Self {
        self.contents = text.into_bytes();
        self
    }

    /// Change the file extension of the output path.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.relative.set_extension(ext);
        self
    }
}

/// One processing stage.
pub trait Transform: Send + Sync {
    /// Short stage name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn apply(&self, file: SourceFile) -> Result<SourceFile>;
}

/// Ordered list of transforms applied one after another.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transform>>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn pipe(mut self, stage: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Transform for Chain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        self.stages.iter().try_fold(file, |file, stage| {
            stage
                .apply(file)
                .with_context(|| format!("{} stage", stage.name()))
        })
    }
}
