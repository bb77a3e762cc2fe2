// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ParallelFailurePolicy, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source_root = "src"
/// output_root = "dist"
///
/// [config]
/// triggered_while_running_behaviour = "queue"
/// parallel_failure = "run_to_completion"
/// task_timeout = "5m"
///
/// [style]
/// src = "css/*.css"
/// dest = "css"
///
/// [markup.include]
/// prefix = "@-@"
/// basepath = "components"
///
/// [server]
/// port = 8080
/// ```
///
/// Every section is optional; omitted values fall back to the stock
/// `src/` -> `dist/` layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub style: TransformSection,

    #[serde(default)]
    pub preprocessor: TransformSection,

    #[serde(default)]
    pub script: TransformSection,

    #[serde(default)]
    pub markup: MarkupSection,

    #[serde(default)]
    pub assets: TransformSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[config]` section: orchestration behaviour.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"drop"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// `"run_to_completion"` (default) or `"cancel_siblings"`.
    #[serde(default)]
    pub parallel_failure: ParallelFailurePolicy,

    /// Optional upper bound for a single leaf task, e.g. `"5m"`.
    #[serde(default)]
    pub task_timeout: Option<String>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
        }
    }
}

impl PathsSection {
    /// Resolve relative roots against `base` (the config file's directory).
    pub fn rebased(&self, base: &Path) -> Self {
        let rebase = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };
        Self {
            source_root: rebase(&self.source_root),
            output_root: rebase(&self.output_root),
        }
    }
}

/// Generic transform section (`[style]`, `[preprocessor]`, `[script]`,
/// `[assets]`).
///
/// `src` is a glob relative to `paths.source_root`; `dest` a directory
/// relative to `paths.output_root`. Both fall back to per-transform defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransformSection {
    #[serde(default)]
    pub src: Option<String>,

    #[serde(default)]
    pub dest: Option<String>,

    /// Extra globs that re-run this transform when they change. Defaults to
    /// `[src]`.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
}

/// `[markup]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarkupSection {
    #[serde(flatten)]
    pub target: TransformSection,

    #[serde(default)]
    pub include: IncludeSection,

    #[serde(default)]
    pub minify: MarkupOptions,
}

/// `[markup.include]`: fragment inclusion syntax.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludeSection {
    /// Marker placed before `include('...')`.
    #[serde(default = "default_include_prefix")]
    pub prefix: String,

    /// Directory (relative to the source root) fragments are resolved from.
    #[serde(default = "default_include_basepath")]
    pub basepath: String,
}

fn default_include_prefix() -> String {
    "@-@".to_string()
}

fn default_include_basepath() -> String {
    "components".to_string()
}

impl Default for IncludeSection {
    fn default() -> Self {
        Self {
            prefix: default_include_prefix(),
            basepath: default_include_basepath(),
        }
    }
}

/// `[markup.minify]`: one toggle per normalisation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarkupOptions {
    pub remove_comments: bool,
    pub collapse_whitespace: bool,
    pub remove_empty_attributes: bool,
    pub collapse_boolean_attributes: bool,
    pub remove_attribute_quotes: bool,
    pub minify_css: bool,
    pub minify_js: bool,
    pub remove_style_link_type_attributes: bool,
    pub remove_script_type_attributes: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            remove_comments: true,
            collapse_whitespace: true,
            remove_empty_attributes: true,
            collapse_boolean_attributes: true,
            remove_attribute_quotes: true,
            minify_css: true,
            minify_js: true,
            remove_style_link_type_attributes: true,
            remove_script_type_attributes: true,
        }
    }
}

impl MarkupOptions {
    /// All rules switched off; the minifier becomes a pass-through.
    pub fn none() -> Self {
        Self {
            remove_comments: false,
            collapse_whitespace: false,
            remove_empty_attributes: false,
            collapse_boolean_attributes: false,
            remove_attribute_quotes: false,
            minify_css: false,
            minify_js: false,
            remove_style_link_type_attributes: false,
            remove_script_type_attributes: false,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_live_reload")]
    pub live_reload: bool,

    /// Path under the output root to open in a browser, e.g.
    /// `"pages/index.html"`. Empty or absent disables opening.
    #[serde(default = "default_open")]
    pub open: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_live_reload() -> bool {
    true
}

fn default_open() -> Option<String> {
    Some("pages/index.html".to_string())
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            live_reload: default_live_reload(),
            open: default_open(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchSection {
    /// Only re-run a task when the content of its watched files changed.
    #[serde(default)]
    pub use_hash: bool,
}

/// The five build transforms, used to look up per-transform defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformKind {
    Style,
    Preprocessor,
    Script,
    Markup,
    Assets,
}

impl TransformKind {
    pub const ALL: [TransformKind; 5] = [
        TransformKind::Style,
        TransformKind::Preprocessor,
        TransformKind::Script,
        TransformKind::Markup,
        TransformKind::Assets,
    ];

    /// Task name used in the registry, logs and error messages.
    pub fn task_name(self) -> &'static str {
        match self {
            TransformKind::Style => "style",
            TransformKind::Preprocessor => "preprocessor",
            TransformKind::Script => "script",
            TransformKind::Markup => "markup",
            TransformKind::Assets => "assets",
        }
    }

    fn default_src(self) -> &'static str {
        match self {
            TransformKind::Style => "css/*.css",
            TransformKind::Preprocessor => "less/*.less",
            TransformKind::Script => "js/*.js",
            TransformKind::Markup => "pages/*.html",
            TransformKind::Assets => "assets/**/*",
        }
    }

    fn default_dest(self) -> &'static str {
        match self {
            TransformKind::Style => "css",
            TransformKind::Preprocessor => "less",
            TransformKind::Script => "js",
            TransformKind::Markup => "pages",
            TransformKind::Assets => "assets",
        }
    }
}

/// Effective source/destination for one transform after defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformTarget {
    pub kind: TransformKind,
    /// Glob relative to the source root.
    pub src: String,
    /// Directory relative to the output root.
    pub dest: String,
    /// Globs (relative to the source root) that re-run this transform.
    pub watch: Vec<String>,
}

impl TransformTarget {
    pub fn resolve(kind: TransformKind, section: &TransformSection) -> Self {
        let src = section
            .src
            .clone()
            .unwrap_or_else(|| kind.default_src().to_string());
        let dest = section
            .dest
            .clone()
            .unwrap_or_else(|| kind.default_dest().to_string());
        let watch = section.watch.clone().unwrap_or_else(|| vec![src.clone()]);
        Self {
            kind,
            src,
            dest,
            watch,
        }
    }
}

/// Validated configuration with every default resolved.
///
/// Build it with `ConfigFile::try_from(raw)`; see `validate.rs`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub targets: Vec<TransformTarget>,
    pub include: IncludeSection,
    pub markup: MarkupOptions,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub task_timeout: Option<Duration>,
}

impl ConfigFile {
    /// Resolve defaults without validation. Used by `TryFrom` after checks
    /// pass.
    pub(crate) fn new_unchecked(raw: RawConfigFile, task_timeout: Option<Duration>) -> Self {
        let targets = TransformKind::ALL
            .iter()
            .map(|&kind| resolve_target(kind, &raw))
            .collect();

        Self {
            config: raw.config,
            paths: raw.paths,
            targets,
            include: raw.markup.include,
            markup: raw.markup.minify,
            server: raw.server,
            watch: raw.watch,
            task_timeout,
        }
    }

    /// Effective target for the given transform.
    pub fn target(&self, kind: TransformKind) -> &TransformTarget {
        // `targets` always holds one entry per kind, in `ALL` order.
        &self.targets[kind as usize]
    }

    /// Absolute-or-cwd-relative directory fragments are resolved from.
    pub fn include_base(&self) -> PathBuf {
        self.paths.source_root.join(&self.include.basepath)
    }
}

pub(crate) fn resolve_target(kind: TransformKind, raw: &RawConfigFile) -> TransformTarget {
    match kind {
        TransformKind::Style => TransformTarget::resolve(kind, &raw.style),
        TransformKind::Preprocessor => TransformTarget::resolve(kind, &raw.preprocessor),
        TransformKind::Script => TransformTarget::resolve(kind, &raw.script),
        TransformKind::Assets => TransformTarget::resolve(kind, &raw.assets),
        TransformKind::Markup => {
            let mut target = TransformTarget::resolve(kind, &raw.markup.target);
            if raw.markup.target.watch.is_none() {
                // Pages are rebuilt when an included fragment changes too.
                let base = raw.markup.include.basepath.trim_end_matches('/');
                target.watch.push(format!("{base}/*.html"));
            }
            target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_stock_layout() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        let cfg = ConfigFile::new_unchecked(raw, None);

        assert_eq!(cfg.paths.source_root, PathBuf::from("src"));
        assert_eq!(cfg.paths.output_root, PathBuf::from("dist"));
        assert_eq!(cfg.target(TransformKind::Style).src, "css/*.css");
        assert_eq!(cfg.target(TransformKind::Preprocessor).dest, "less");
        assert_eq!(cfg.target(TransformKind::Assets).src, "assets/**/*");
        assert_eq!(
            cfg.target(TransformKind::Markup).watch,
            vec!["pages/*.html".to_string(), "components/*.html".to_string()]
        );
        assert_eq!(cfg.include.prefix, "@-@");
        assert_eq!(cfg.markup, MarkupOptions::default());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.open.as_deref(), Some("pages/index.html"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[preprocessor]
dest = "styles"

[markup]
src = "views/*.html"

[markup.minify]
remove_attribute_quotes = false
"#,
        )
        .unwrap();
        let cfg = ConfigFile::new_unchecked(raw, None);

        let pre = cfg.target(TransformKind::Preprocessor);
        assert_eq!(pre.src, "less/*.less");
        assert_eq!(pre.dest, "styles");

        let markup = cfg.target(TransformKind::Markup);
        assert_eq!(markup.src, "views/*.html");
        assert_eq!(markup.dest, "pages");
        assert!(!cfg.markup.remove_attribute_quotes);
        assert!(cfg.markup.remove_comments);
    }

    #[test]
    fn rebased_paths_only_touch_relative_roots() {
        let paths = PathsSection {
            source_root: PathBuf::from("src"),
            output_root: PathBuf::from("/tmp/out"),
        };
        let rebased = paths.rebased(Path::new("/project"));
        assert_eq!(rebased.source_root, PathBuf::from("/project/src"));
        assert_eq!(rebased.output_root, PathBuf::from("/tmp/out"));
    }
}
