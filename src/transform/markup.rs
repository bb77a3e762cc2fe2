// src/transform/markup.rs

//! HTML minification.
//!
//! The document is scanned once, token by token (comments, declarations,
//! tags, text and the raw content of `script`, `style`, `pre` and
//! `textarea`). Each rule in [`MarkupOptions`] can be switched on its own;
//! with every rule off the output is byte-identical to the input.

use anyhow::Result;

use super::script::minify_js;
use super::style::minify_css;
use super::{SourceFile, Transform};
use crate::config::MarkupOptions;

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

/// Elements around which whitespace is significant.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "dfn", "em", "i",
    "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span",
    "strong", "sub", "sup", "textarea", "time", "u", "var", "wbr",
];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// Attributes that carry no meaning when empty.
const DROPPABLE_WHEN_EMPTY: &[&str] = &["class", "id", "style", "title", "lang", "dir"];

#[derive(Debug, Clone)]
struct Attr<'a> {
    name: &'a str,
    key: String,
    value: Option<&'a str>,
    quote: Option<char>,
}

#[derive(Debug, Clone)]
struct Tag<'a> {
    raw: &'a str,
    raw_name: &'a str,
    name: String,
    closing: bool,
    self_closing: bool,
    attrs: Vec<Attr<'a>>,
}

impl Tag<'_> {
    fn attr(&self, key: &str) -> Option<&Attr<'_>> {
        self.attrs.iter().find(|a| a.key == key)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HtmlMinifier {
    options: MarkupOptions,
}

impl HtmlMinifier {
    pub fn new(options: MarkupOptions) -> Self {
        Self { options }
    }

    pub fn minify(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        // Whether the previous token ends a block, so leading whitespace of
        // the following text can go.
        let mut after_block = true;

        while !rest.is_empty() {
            if let Some(body) = rest.strip_prefix("<!--") {
                let len = body.find("-->").map(|i| 4 + i + 3).unwrap_or(rest.len());
                let (comment, tail) = rest.split_at(len);
                if !self.options.remove_comments || comment.starts_with("<!--[if") {
                    out.push_str(comment);
                }
                rest = tail;
                after_block = true;
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                let len = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                after_block = true;
                continue;
            }

            if rest.starts_with('<') {
                if let Some(tag) = parse_tag(rest) {
                    rest = &rest[tag.raw.len()..];
                    self.write_tag(&tag, &mut out);
                    after_block = !is_inline(&tag.name);

                    if !tag.closing
                        && !tag.self_closing
                        && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str())
                    {
                        let (content, tail) = split_raw_text(rest, &tag.name);
                        self.write_raw_text(&tag, content, &mut out);
                        rest = tail;
                    }
                    continue;
                }
            }

            let len = text_len(rest);
            let (text, tail) = rest.split_at(len);
            if self.write_text(text, after_block, boundary_ahead(tail), &mut out) {
                after_block = false;
            }
            rest = tail;
        }

        out
    }

    fn rebuilds_tags(&self) -> bool {
        let o = &self.options;
        o.remove_empty_attributes
            || o.collapse_boolean_attributes
            || o.remove_attribute_quotes
            || o.remove_style_link_type_attributes
            || o.remove_script_type_attributes
            || o.minify_css
    }

    fn write_tag(&self, tag: &Tag<'_>, out: &mut String) {
        if !self.rebuilds_tags() || tag.closing {
            out.push_str(tag.raw);
            return;
        }

        let o = &self.options;
        out.push('<');
        out.push_str(tag.raw_name);

        let mut last_unquoted = false;
        for attr in &tag.attrs {
            if o.remove_script_type_attributes
                && tag.name == "script"
                && attr.key == "type"
                && is_classic_script(attr.value)
            {
                continue;
            }
            if o.remove_style_link_type_attributes
                && (tag.name == "style" || tag.name == "link")
                && attr.key == "type"
                && attr
                    .value
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("text/css"))
            {
                continue;
            }
            if o.remove_empty_attributes
                && attr.value.is_some_and(|v| v.trim().is_empty())
                && (DROPPABLE_WHEN_EMPTY.contains(&attr.key.as_str()) || attr.key.starts_with("on"))
            {
                continue;
            }

            out.push(' ');
            out.push_str(attr.name);
            last_unquoted = false;

            if o.collapse_boolean_attributes && BOOLEAN_ATTRIBUTES.contains(&attr.key.as_str()) {
                continue;
            }
            let Some(raw_value) = attr.value else {
                continue;
            };

            let value = if o.minify_css && attr.key == "style" {
                minify_inline_style(raw_value)
            } else {
                raw_value.to_string()
            };

            out.push('=');
            if o.remove_attribute_quotes && can_unquote(&value) {
                out.push_str(&value);
                last_unquoted = true;
            } else {
                let quote = match attr.quote {
                    Some(q) => q,
                    None if value.contains('"') => '\'',
                    None => '"',
                };
                out.push(quote);
                out.push_str(&value);
                out.push(quote);
            }
        }

        if tag.self_closing {
            out.push_str(if last_unquoted { " />" } else { "/>" });
        } else {
            out.push('>');
        }
    }

    fn write_raw_text(&self, tag: &Tag<'_>, content: &str, out: &mut String) {
        let o = &self.options;
        match tag.name.as_str() {
            "script"
                if o.minify_js
                    && tag.attr("src").is_none()
                    && is_script(tag.attr("type").and_then(|a| a.value)) =>
            {
                out.push_str(&minify_js(content));
            }
            "style" if o.minify_css => out.push_str(&minify_css(content)),
            _ => out.push_str(content),
        }
    }

    /// Returns whether anything was written.
    fn write_text(&self, text: &str, trim_start: bool, trim_end: bool, out: &mut String) -> bool {
        if !self.options.collapse_whitespace {
            out.push_str(text);
            return !text.is_empty();
        }

        let mut collapsed = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_ascii_whitespace() {
                if !collapsed.ends_with(' ') {
                    collapsed.push(' ');
                }
            } else {
                collapsed.push(c);
            }
        }

        let mut slice = collapsed.as_str();
        if trim_start || out.ends_with(' ') {
            slice = slice.trim_start_matches(' ');
        }
        if trim_end {
            slice = slice.trim_end_matches(' ');
        }
        out.push_str(slice);
        !slice.is_empty()
    }
}

impl Transform for HtmlMinifier {
    fn name(&self) -> &'static str {
        "htmlmin"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        let html = self.minify(file.text()?);
        Ok(file.with_text(html))
    }
}

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

/// A `type` that marks a script as plain (non-module) JavaScript.
fn is_classic_script(ty: Option<&str>) -> bool {
    match ty.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "text/javascript" | "application/javascript" | "text/ecmascript" | "application/ecmascript"
        ),
    }
}

fn is_script(ty: Option<&str>) -> bool {
    is_classic_script(ty) || ty.is_some_and(|t| t.trim().eq_ignore_ascii_case("module"))
}

fn can_unquote(value: &str) -> bool {
    !value.is_empty()
        && !value.ends_with('/')
        && !value
            .chars()
            .any(|c| c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'))
}

fn minify_inline_style(declarations: &str) -> String {
    let wrapped = minify_css(&format!("x{{{declarations}}}"));
    wrapped
        .strip_prefix("x{")
        .and_then(|s| s.strip_suffix('}'))
        .map(str::to_string)
        .unwrap_or_else(|| declarations.to_string())
}

/// Length of the text run at the start of `input`, up to the next markup.
fn text_len(input: &str) -> usize {
    let first = input.chars().next().map(char::len_utf8).unwrap_or(0);
    let mut offset = first;
    while let Some(pos) = input[offset..].find('<') {
        let at = offset + pos;
        let next = input[at + 1..].chars().next();
        if next.is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?') {
            return at;
        }
        offset = at + 1;
    }
    input.len()
}

/// Whether text followed by `tail` may lose its trailing whitespace.
fn boundary_ahead(tail: &str) -> bool {
    if tail.is_empty() || tail.starts_with("<!") || tail.starts_with("<?") {
        return true;
    }
    match parse_tag(tail) {
        Some(tag) => !is_inline(&tag.name),
        None => false,
    }
}

fn split_raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let lower = input.to_ascii_lowercase();
    let at = lower.find(&format!("</{name}")).unwrap_or(input.len());
    input.split_at(at)
}

/// Parse a start or end tag at the beginning of `input`. Returns `None`
/// when `input` does not start with a well-formed tag.
fn parse_tag(input: &str) -> Option<Tag<'_>> {
    let bytes = input.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b':')) {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let raw_name = &input[name_start..i];

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>')
            && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
        {
            i += 1;
        }
        let name = &input[attr_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = None;
        let mut quote = None;
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                q @ (b'"' | b'\'') => {
                    let q = *q;
                    let start = i + 1;
                    let len = input[start..].find(q as char)?;
                    value = Some(&input[start..start + len]);
                    quote = Some(q as char);
                    i = start + len + 1;
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = Some(&input[start..i]);
                }
            }
        }

        attrs.push(Attr {
            name,
            key: name.to_ascii_lowercase(),
            value,
            quote,
        });
    }

    Some(Tag {
        raw: &input[..i],
        raw_name,
        name: raw_name.to_ascii_lowercase(),
        closing,
        self_closing,
        attrs,
    })
}
