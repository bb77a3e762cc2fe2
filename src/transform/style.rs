// src/transform/style.rs

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::{SourceFile, Transform};

/// Properties that still need vendor-prefixed copies, with their prefixes.
const PREFIXED_PROPERTIES: &[(&str, &[&str])] = &[
    ("user-select", &["-webkit-", "-moz-", "-ms-"]),
    ("appearance", &["-webkit-", "-moz-"]),
    ("backdrop-filter", &["-webkit-"]),
    ("text-size-adjust", &["-webkit-", "-moz-", "-ms-"]),
    ("hyphens", &["-webkit-", "-ms-"]),
];

/// Adds vendor-prefixed declarations in front of properties listed in
/// [`PREFIXED_PROPERTIES`]. Already-prefixed declarations are left alone.
#[derive(Debug, Clone)]
pub struct StylePrefixer {
    declaration: Regex,
}

impl StylePrefixer {
    pub fn new() -> Result<Self> {
        let names: Vec<&str> = PREFIXED_PROPERTIES.iter().map(|(n, _)| *n).collect();
        let declaration = Regex::new(&format!(
            r"(^|[{{;\s])({})\s*:\s*([^;}}]+)",
            names.join("|")
        ))
        .context("building prefix table pattern")?;
        Ok(Self { declaration })
    }

    pub fn prefix(&self, css: &str) -> String {
        self.declaration
            .replace_all(css, |caps: &Captures| {
                let lead = &caps[1];
                let prop = &caps[2];
                let value = caps[3].trim_end();
                let prefixes = PREFIXED_PROPERTIES
                    .iter()
                    .find(|(name, _)| *name == prop)
                    .map(|(_, p)| *p)
                    .unwrap_or_default();

                let mut out = String::from(lead);
                for prefix in prefixes {
                    out.push_str(&format!("{prefix}{prop}: {value}; "));
                }
                out.push_str(&format!("{prop}: {value}"));
                out
            })
            .into_owned()
    }
}

impl Transform for StylePrefixer {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let css = self.prefix(file.text()?);
        Ok(file.with_text(css))
    }
}

/// Whitespace and comment stripping for style sheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl Transform for CssMinifier {
    fn name(&self) -> &'static str {
        "cssmin"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let css = minify_css(file.text()?);
        Ok(file.with_text(css))
    }
}

/// Minify a style sheet.
///
/// - removes `/* ... */` comments
/// - collapses whitespace and drops it around `{ } ; , >`
/// - drops whitespace after `:` inside blocks
/// - drops the last `;` of a block
///
/// String literals are copied verbatim.
pub fn minify_css(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut depth: usize = 0;
    let mut pending_space = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
            pending_space = true;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }

        if pending_space && needs_space(out.chars().last(), c, depth) {
            out.push(' ');
        }
        pending_space = false;

        match c {
            '"' | '\'' => {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let s = chars[i];
                    out.push(s);
                    i += 1;
                    if s == '\\' {
                        if let Some(&escaped) = chars.get(i) {
                            out.push(escaped);
                            i += 1;
                        }
                    } else if s == quote {
                        break;
                    }
                }
                continue;
            }
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if out.ends_with(';') {
                    out.pop();
                }
            }
            _ => {}
        }

        out.push(c);
        i += 1;
    }

    out.trim().to_string()
}

fn needs_space(prev: Option<char>, next: char, depth: usize) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    const TIGHT: &[char] = &['{', '}', ';', ',', '>'];
    if TIGHT.contains(&prev) || TIGHT.contains(&next) {
        return false;
    }
    !(depth > 0 && prev == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minifies_rules_and_comments() {
        let css = "/* header */\n.a ,\n.b > p {\n  color: red;\n  margin: 0 auto;\n}\n\n";
        assert_eq!(minify_css(css), ".a,.b>p{color:red;margin:0 auto}");
    }

    #[test]
    fn keeps_strings_and_media_queries() {
        let css = "@media (min-width: 600px) {\n  a::after { content: \"a ; b\"; }\n}";
        assert_eq!(
            minify_css(css),
            "@media (min-width: 600px){a::after{content:\"a ; b\"}}"
        );
    }

    #[test]
    fn prefixes_known_properties_once() {
        let css = ".x { user-select: none; -webkit-appearance: none; color: red }";
        let out = StylePrefixer::new().unwrap().prefix(css);
        assert_eq!(
            out,
            ".x { -webkit-user-select: none; -moz-user-select: none; -ms-user-select: none; user-select: none; -webkit-appearance: none; color: red }"
        );
    }

    #[test]
    fn prefix_then_minify_pipeline() {
        let out = minify_css(&StylePrefixer::new().unwrap().prefix(".m{backdrop-filter: blur(2px)}"));
        assert_eq!(out, ".m{-webkit-backdrop-filter:blur(2px);backdrop-filter:blur(2px)}");
    }
}
