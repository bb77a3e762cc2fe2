// src/transform/script.rs

use anyhow::Result;

use super::{SourceFile, Transform};

/// Keywords after which a `/` starts a regular expression literal rather
/// than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "case",
    "do",
    "else",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "yield",
    "await",
];

/// Conservative script minifier: strips comments and redundant whitespace
/// but never renames, reorders or rewrites tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMinifier;

impl Transform for ScriptMinifier {
    fn name(&self) -> &'static str {
        "uglify"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let js = minify_js(file.text()?);
        Ok(file.with_text(js))
    }
}

/// Minify script source.
///
/// String, template and regular expression literals are copied verbatim.
/// Outside of them comments are dropped, runs of blanks collapse to one
/// space, lines are trimmed and blank lines removed. Line breaks are kept so
/// automatic semicolon insertion behaves as before.
pub fn minify_js(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '"' | '\'' | '`' => i = copy_literal(&chars, i, &mut out),
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let mut spans_lines = false;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    spans_lines |= chars[i] == '\n';
                    i += 1;
                }
                i += 2;
                if spans_lines {
                    push_newline(&mut out);
                } else {
                    push_space(&mut out);
                }
            }
            '/' if regex_allowed(&out) => i = copy_regex(&chars, i, &mut out),
            '\n' | '\r' => {
                push_newline(&mut out);
                i += 1;
            }
            c if c.is_whitespace() => {
                push_space(&mut out);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out.trim_end().to_string()
}

fn push_space(out: &mut String) {
    if !(out.is_empty() || out.ends_with(' ') || out.ends_with('\n')) {
        out.push(' ');
    }
}

fn push_newline(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Copy a quoted literal starting at `start`; returns the index after it.
fn copy_literal(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
        } else if c == quote {
            break;
        }
    }
    i
}

/// Copy a regular expression body starting at the opening `/`. Flags are
/// left for the main loop.
fn copy_regex(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            break;
        }
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                if let Some(&escaped) = chars.get(i) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            _ => {}
        }
    }
    i
}

fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return true;
    };

    if last.is_alphanumeric() || last == '_' || last == '$' {
        let word: String = trimmed
            .chars()
            .rev()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return REGEX_KEYWORDS.contains(&word.as_str());
    }

    !matches!(last, ')' | ']' | '}' | '"' | '\'' | '`')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_blank_lines() {
        let js = "// header\nfunction add(a, b) {\n    /* sum */\n    return a + b;\n}\n\n\nconst url = \"http://x//y\";\n";
        assert_eq!(
            minify_js(js),
            "function add(a, b) {\nreturn a + b;\n}\nconst url = \"http://x//y\";"
        );
    }

    #[test]
    fn regex_literals_are_not_comments() {
        let js = "const re = /\\/\\/[a-z/]+/g; // trailing\nx = a / b / c;";
        assert_eq!(minify_js(js), "const re = /\\/\\/[a-z/]+/g;\nx = a / b / c;");
    }

    #[test]
    fn template_literals_keep_their_layout() {
        let js = "const t = `line one\n    // not a comment\n`;\n";
        assert_eq!(minify_js(js), "const t = `line one\n    // not a comment\n`;");
    }

    #[test]
    fn multi_line_block_comment_keeps_statements_apart() {
        let js = "a = 1 /* one\n two */ b = 2";
        assert_eq!(minify_js(js), "a = 1\nb = 2");
    }
}
