// src/transform/include.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::{SourceFile, Transform};
use crate::fs::FileSystem;

/// Includes nested deeper than this are treated as a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Expands `<prefix>include('file.html', { "key": "value" })` directives
/// with the named fragment, resolved under `base`.
///
/// Inside a fragment, `<prefix><key>` is replaced with the value passed in
/// the optional context object. Contexts are inherited by nested includes.
/// A fragment that does not exist is an error.
#[derive(Debug, Clone)]
pub struct FileInclude {
    base: PathBuf,
    fs: Arc<dyn FileSystem>,
    directive: Regex,
    variable: Regex,
}

impl FileInclude {
    pub fn new(prefix: &str, base: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let directive = Regex::new(&format!(
            r#"{}include\(\s*['"]([^'"]+)['"]\s*(?:,\s*(\{{[^}}]*\}}))?\s*\)"#,
            regex::escape(prefix)
        ))
        .with_context(|| format!("building include pattern for prefix {prefix:?}"))?;
        let variable = Regex::new(&format!(r"{}([A-Za-z_]\w*)", regex::escape(prefix)))
            .with_context(|| format!("building variable pattern for prefix {prefix:?}"))?;

        Ok(Self {
            base: base.into(),
            fs,
            directive,
            variable,
        })
    }

    /// Expand every include directive in `text`.
    pub fn expand(&self, text: &str) -> Result<String> {
        self.expand_with(text, &Map::new(), 0)
    }

    fn expand_with(&self, text: &str, context: &Map<String, Value>, depth: usize) -> Result<String> {
        if depth > MAX_INCLUDE_DEPTH {
            bail!("includes nest deeper than {MAX_INCLUDE_DEPTH} levels; is there a cycle?");
        }

        let text = self.substitute(text, context);

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.directive.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.include_one(&caps, context, depth)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn include_one(
        &self,
        caps: &Captures<'_>,
        parent: &Map<String, Value>,
        depth: usize,
    ) -> Result<String> {
        let name = &caps[1];
        let path = self.base.join(name);
        if !self.fs.is_file(&path) {
            bail!("included file {name:?} not found under {:?}", self.base);
        }
        let fragment = self.fs.read_to_string(&path)?;

        let mut context = parent.clone();
        if let Some(raw) = caps.get(2) {
            let own: Map<String, Value> = serde_json::from_str(raw.as_str())
                .with_context(|| format!("invalid context for include {name:?}"))?;
            context.extend(own);
        }

        self.expand_with(&fragment, &context, depth + 1)
            .with_context(|| format!("in included file {name:?}"))
    }

    /// Replace `<prefix><key>` with its context value. Only whole keys
    /// match, and a directive is never a variable reference.
    fn substitute(&self, text: &str, context: &Map<String, Value>) -> String {
        if context.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.variable.captures_iter(text) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let is_directive =
                key.as_str() == "include" && text[whole.end()..].trim_start().starts_with('(');
            let Some(value) = context.get(key.as_str()).filter(|_| !is_directive) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

impl Transform for FileInclude {
    fn name(&self) -> &'static str {
        "fileinclude"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let html = self.expand(file.text()?)?;
        Ok(file.with_text(html))
    }
}
