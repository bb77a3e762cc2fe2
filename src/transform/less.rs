// src/transform/less.rs

//! A compiler for the subset of Less that plain style sheets lean on:
//! variables, nested rules with `&` parent references, nested at-rules and
//! `//` line comments. Mixins, guards and operations are not supported and
//! pass through as ordinary text.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use regex::Regex;

use super::{SourceFile, Transform};

/// Maximum depth of variable-to-variable references.
const MAX_VARIABLE_DEPTH: usize = 16;

#[derive(Debug)]
enum Node {
    /// A declaration or statement terminated by `;`.
    Decl(String),
    /// `prelude { body }`, either a selector rule or an at-rule.
    Block { prelude: String, body: Vec<Node> },
}

#[derive(Debug, Clone)]
pub struct LessCompiler {
    variable_def: Regex,
    variable_ref: Regex,
}

impl LessCompiler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            variable_def: Regex::new(r"(?s)^@([A-Za-z_][\w-]*)\s*:(.*)$")
                .context("building variable definition pattern")?,
            variable_ref: Regex::new(r"@([A-Za-z_][\w-]*)")
                .context("building variable reference pattern")?,
        })
    }

    /// Compile Less source to plain CSS.
    pub fn compile(&self, source: &str) -> Result<String> {
        let chars: Vec<char> = strip_comments(source).chars().collect();
        let mut pos = 0;
        let nodes = parse_nodes(&chars, &mut pos, false)?;

        let mut out = String::new();
        self.emit(&nodes, &[], &HashMap::new(), &mut out)?;
        Ok(out)
    }

    fn emit(
        &self,
        nodes: &[Node],
        parents: &[String],
        outer: &HashMap<String, String>,
        out: &mut String,
    ) -> Result<()> {
        // Variables are visible to the whole block they are defined in.
        let mut vars = outer.clone();
        for node in nodes {
            let Node::Decl(text) = node else { continue };
            if let Some(caps) = self.variable_def.captures(text) {
                vars.insert(caps[1].to_string(), caps[2].trim().to_string());
            }
        }

        let mut decls = Vec::new();
        for node in nodes {
            let Node::Decl(text) = node else { continue };
            if self.variable_def.is_match(text) {
                continue;
            }
            if text.starts_with('@') {
                // Statement at-rules such as @import or @charset.
                out.push_str(&format!("{};\n", self.resolve_at_prelude(text, &vars)?));
                continue;
            }
            decls.push(self.resolve_declaration(text, &vars)?);
        }

        if !decls.is_empty() {
            let indent = if parents.is_empty() { "" } else { "  " };
            if !parents.is_empty() {
                out.push_str(&format!("{} {{\n", parents.join(", ")));
            }
            for decl in &decls {
                out.push_str(&format!("{indent}{decl};\n"));
            }
            if !parents.is_empty() {
                out.push_str("}\n");
            }
        }

        for node in nodes {
            let Node::Block { prelude, body } = node else { continue };
            if prelude.starts_with('@') {
                let prelude = self.resolve_at_prelude(prelude, &vars)?;
                out.push_str(&format!("{prelude} {{\n"));
                self.emit(body, parents, &vars, out)?;
                out.push_str("}\n");
            } else {
                let selectors = combine_selectors(parents, prelude);
                self.emit(body, &selectors, &vars, out)?;
            }
        }

        Ok(())
    }

    fn resolve_declaration(&self, text: &str, vars: &HashMap<String, String>) -> Result<String> {
        match text.split_once(':') {
            Some((prop, value)) => Ok(format!(
                "{}: {}",
                prop.trim(),
                self.resolve(value.trim(), vars, 0)?
            )),
            None => Ok(text.to_string()),
        }
    }

    /// Substitute variables in an at-rule prelude, leaving the keyword alone.
    fn resolve_at_prelude(&self, text: &str, vars: &HashMap<String, String>) -> Result<String> {
        match text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => Ok(format!(
                "{keyword} {}",
                self.resolve(rest.trim(), vars, 0)?
            )),
            None => Ok(text.to_string()),
        }
    }

    fn resolve(&self, value: &str, vars: &HashMap<String, String>, depth: usize) -> Result<String> {
        if depth > MAX_VARIABLE_DEPTH {
            bail!("variable references nest deeper than {MAX_VARIABLE_DEPTH} levels");
        }

        let mut out = String::with_capacity(value.len());
        let mut last = 0;
        for caps in self.variable_ref.captures_iter(value) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            let Some(raw) = vars.get(name) else {
                bail!("undefined variable @{name}");
            };
            out.push_str(&value[last..whole.start()]);
            out.push_str(&self.resolve(raw, vars, depth + 1)?);
            last = whole.end();
        }
        out.push_str(&value[last..]);
        Ok(out)
    }
}

impl Transform for LessCompiler {
    fn name(&self) -> &'static str {
        "less"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let css = self.compile(file.text()?)?;
        Ok(file.with_text(css).with_extension("css"))
    }
}

/// Remove `/* */` and `//` comments outside string literals. A `//`
/// directly after `:` is part of a URL and kept.
fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    // `//` inside `url(...)` and other open parens is not a comment.
    let mut parens = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' | ')' => {
                parens = if c == '(' { parens + 1 } else { parens.saturating_sub(1) };
                out.push(c);
                i += 1;
            }
            '"' | '\'' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '/' if chars.get(i + 1) == Some(&'/')
                && parens == 0
                && out.chars().last() != Some(':') =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn parse_nodes(chars: &[char], pos: &mut usize, nested: bool) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut buf = String::new();
    let mut parens = 0usize;

    while *pos < chars.len() {
        let c = chars[*pos];
        *pos += 1;
        match c {
            '"' | '\'' => {
                buf.push(c);
                while *pos < chars.len() {
                    let s = chars[*pos];
                    buf.push(s);
                    *pos += 1;
                    if s == '\\' && *pos < chars.len() {
                        buf.push(chars[*pos]);
                        *pos += 1;
                    } else if s == c {
                        break;
                    }
                }
            }
            '(' => {
                parens += 1;
                buf.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                buf.push(c);
            }
            ';' if parens == 0 => push_decl(&mut nodes, &mut buf),
            '{' if parens == 0 => {
                let prelude = buf.trim().to_string();
                buf.clear();
                let body = parse_nodes(chars, pos, true)?;
                nodes.push(Node::Block { prelude, body });
            }
            '}' if parens == 0 => {
                if !nested {
                    bail!("unexpected '}}' on line {}", line_of(chars, *pos - 1));
                }
                push_decl(&mut nodes, &mut buf);
                return Ok(nodes);
            }
            _ => buf.push(c),
        }
    }

    if nested {
        bail!("unclosed block at end of input");
    }
    push_decl(&mut nodes, &mut buf);
    Ok(nodes)
}

fn push_decl(nodes: &mut Vec<Node>, buf: &mut String) {
    let text = buf.trim();
    if !text.is_empty() {
        nodes.push(Node::Decl(text.to_string()));
    }
    buf.clear();
}

fn line_of(chars: &[char], pos: usize) -> usize {
    chars[..pos].iter().filter(|&&c| c == '\n').count() + 1
}

/// Expand a nested selector list against its parents.
///
/// `&` is replaced by the parent selector; selectors without `&` become
/// descendants of it.
fn combine_selectors(parents: &[String], prelude: &str) -> Vec<String> {
    let own: Vec<&str> = prelude
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parents.is_empty() {
        return own.iter().map(|s| s.to_string()).collect();
    }

    let mut combined = Vec::with_capacity(parents.len() * own.len());
    for parent in parents {
        for sel in &own {
            if sel.contains('&') {
                combined.push(sel.replace('&', parent));
            } else {
                combined.push(format!("{parent} {sel}"));
            }
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Result<String> {
        LessCompiler::new().unwrap().compile(src)
    }

    #[test]
    fn flattens_nesting_and_substitutes_variables() {
        let src = "@primary: #336699;\n@pad: 4px;\n// nav bar\n.nav {\n  color: @primary;\n  a { padding: @pad; &:hover { color: red; } }\n  margin: 0;\n}\n";
        assert_eq!(
            compile(src).unwrap(),
            ".nav {\n  color: #336699;\n  margin: 0;\n}\n.nav a {\n  padding: 4px;\n}\n.nav a:hover {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn variables_may_reference_variables_and_media_nests() {
        let src = "@base: 10px;\n@double: @base;\n.box { width: @double; @media (min-width: 600px) { width: 20px; } }";
        assert_eq!(
            compile(src).unwrap(),
            ".box {\n  width: 10px;\n}\n@media (min-width: 600px) {\n.box {\n  width: 20px;\n}\n}\n"
        );
    }

    #[test]
    fn selector_lists_multiply() {
        let src = ".a, .b { .c, &.d { x: 1 } }";
        assert_eq!(compile(src).unwrap(), ".a .c, .a.d, .b .c, .b.d {\n  x: 1;\n}\n");
    }

    #[test]
    fn urls_survive_comment_stripping() {
        let src = ".a { background: url(http://x.org/a.png); /* note */ }";
        assert_eq!(
            compile(src).unwrap(),
            ".a {\n  background: url(http://x.org/a.png);\n}\n"
        );
    }

    #[test]
    fn protocol_relative_urls_are_not_comments() {
        let src = ".a { background: url(//cdn.example.com/a.png); color: red; } // trailing";
        assert_eq!(
            compile(src).unwrap(),
            ".a {\n  background: url(//cdn.example.com/a.png);\n  color: red;\n}\n"
        );
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = compile(".a { color: @nope; }").unwrap_err();
        assert!(err.to_string().contains("@nope"));
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert!(compile(".a { color: red;").is_err());
        let err = compile(".a { }\n}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn self_referencing_variable_is_an_error() {
        assert!(compile("@a: @a;\n.x { y: @a; }").is_err());
    }

    #[test]
    fn output_is_renamed_to_css() {
        let out = LessCompiler::new()
            .unwrap()
            .apply(SourceFile::new("theme.less", "@c: red;\np { color: @c }"))
            .unwrap();
        assert_eq!(out.relative, std::path::PathBuf::from("theme.css"));
        assert_eq!(out.text().unwrap(), "p {\n  color: red;\n}\n");
    }
}
