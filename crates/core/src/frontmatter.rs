//! YAML front matter: detection, parsing, and line-level key edits.
//!
//! A front-matter block is a `---` line, a `key:` line, and a later closing
//! `---` line. The key-line requirement is what tells a front-matter opener
//! apart from a `---` slide separator.

use crate::lines::{lines_from, Line};
use crate::types::Metadata;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// A top-level YAML mapping key at column 0.
static YAML_KEY_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.-]*\s*:(?:\s|$)").unwrap());

/// Location of a front-matter block inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatterSpan {
    /// Offset of the opening `---` line.
    pub start: usize,
    /// Offset just past the closing `---` line (and its newline).
    pub end: usize,
    /// Offset of the first YAML line.
    pub body_start: usize,
    /// Offset of the closing `---` line.
    pub body_end: usize,
    /// Line number of the opening delimiter.
    pub start_line: usize,
    /// Line number of the first line after the block.
    pub end_line: usize,
}

impl FrontMatterSpan {
    /// The YAML text between the delimiters.
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body_start..self.body_end]
    }
}

pub(crate) fn is_dash_delimiter(line: &Line<'_>) -> bool {
    line.trimmed_end() == "---"
}

/// Detect a front-matter block starting at `at` (leading blank lines allowed).
///
/// `stop_at` bounds the search for the closing delimiter.
pub fn detect(text: &str, at: usize, first_line: usize, stop_at: usize) -> Option<FrontMatterSpan> {
    let mut iter = lines_from(text, at, first_line).take_while(|l| l.start < stop_at.max(at + 1));
    let opener = iter.by_ref().find(|l| !l.is_blank())?;
    if !is_dash_delimiter(&opener) {
        return None;
    }
    let first = iter.next()?;
    if !YAML_KEY_LINE_REGEX.is_match(first.text) {
        return None;
    }
    // A `===` run before the closer means this was a separator after all.
    let closer = iter.find(|l| is_dash_delimiter(l) || l.trimmed_end().starts_with("==="))?;
    if !is_dash_delimiter(&closer) {
        return None;
    }
    Some(FrontMatterSpan {
        start: opener.start,
        end: closer.next,
        body_start: first.start,
        body_end: closer.start,
        start_line: opener.number,
        end_line: closer.number + 1,
    })
}

/// Parse a YAML body into metadata. Never fails: bad YAML logs and yields `{}`.
pub fn parse_yaml(body: &str) -> Metadata {
    if body.trim().is_empty() {
        return Metadata::new();
    }
    match serde_yaml::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Metadata::new(),
        Ok(other) => {
            log::warn!("Front matter is not a mapping (got {}), ignoring", type_name(&other));
            Metadata::new()
        }
        Err(e) => {
            log::warn!("Failed to parse YAML front matter: {}", e);
            Metadata::new()
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Render a scalar as a double-quoted YAML string.
pub fn quote_yaml(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Set a top-level key in a YAML body by line surgery.
///
/// The existing entry (its key line plus indented or `- ` continuation lines)
/// is replaced in place; a missing key is appended. Every other line is kept
/// byte for byte. `entry` is the full replacement text, e.g. `key: "v"`.
pub fn set_yaml_entry(body: &str, key: &str, entry: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<&str> = Vec::new();
    let mut replaced = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if !replaced && yaml_key_of(line) == Some(key) {
            out.push(entry);
            replaced = true;
            i = entry_end(&lines, i + 1);
            continue;
        }
        out.push(line);
        i += 1;
    }

    if !replaced {
        while out.last().is_some_and(|l| l.trim().is_empty()) {
            out.pop();
        }
        out.push(entry);
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t') || line.starts_with("- ") || line == "-"
}

/// Index just past an entry's continuation lines, starting at `from`.
///
/// Blank lines belong to the entry only when more continuation lines follow
/// them, as inside a multi-paragraph block scalar.
fn entry_end(lines: &[&str], from: usize) -> usize {
    let mut end = from;
    for (i, line) in lines.iter().enumerate().skip(from) {
        if is_continuation(line) {
            end = i + 1;
        } else if !line.trim().is_empty() {
            break;
        }
    }
    end
}

/// The key of a top-level `key: value` line.
pub fn yaml_key_of(line: &str) -> Option<&str> {
    if !YAML_KEY_LINE_REGEX.is_match(line) {
        return None;
    }
    line.split(':').next().map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_leading_front_matter() {
        let text = "---\ntitle: Deck\n---\n# Hello\n";
        let span = detect(text, 0, 0, text.len()).unwrap();
        assert_eq!(span.start, 0);
        assert_eq!(span.body(text), "title: Deck\n");
        assert_eq!(&text[span.end..], "# Hello\n");
        assert_eq!(span.end_line, 3);
    }

    #[test]
    fn test_detect_skips_blank_lines() {
        let text = "\n\n---\nlayout: grid\n---\nBody";
        let span = detect(text, 0, 10, text.len()).unwrap();
        assert_eq!(span.start, 2);
        assert_eq!(span.start_line, 12);
        assert_eq!(span.end_line, 15);
    }

    #[test]
    fn test_separator_pair_is_not_front_matter() {
        assert!(detect("---\n# Heading\n---\n", 0, 0, 100).is_none());
        assert!(detect("---\n---\n", 0, 0, 100).is_none());
        assert!(detect("---\nkey: v\n===\n---\n", 0, 0, 100).is_none());
        assert!(detect("text\n---\nkey: v\n---\n", 0, 0, 100).is_none());
    }

    #[test]
    fn test_parse_yaml_fallbacks() {
        assert!(parse_yaml("").is_empty());
        assert!(parse_yaml("key: [unclosed").is_empty());
        assert!(parse_yaml("- a\n- b").is_empty());
        let meta = parse_yaml("layout: grid\ncolumns: 3");
        assert_eq!(meta["layout"], "grid");
        assert_eq!(meta["columns"], 3);
    }

    #[test]
    fn test_set_yaml_entry_replaces_in_place() {
        let body = "layout: grid\nbg: red\ntransition: fade\n";
        let out = set_yaml_entry(body, "bg", "bg: \"blue\"");
        assert_eq!(out, "layout: grid\nbg: \"blue\"\ntransition: fade\n");
    }

    #[test]
    fn test_set_yaml_entry_replaces_nested_value() {
        let body = "mesh:\n  colors: [a, b]\n  seed: 4\ntheme: x\n";
        let out = set_yaml_entry(body, "mesh", "mesh: { seed: 1 }");
        assert_eq!(out, "mesh: { seed: 1 }\ntheme: x\n");
    }

    #[test]
    fn test_set_yaml_entry_spans_blank_lines_in_block_scalar() {
        let body = "note: |\n  first para\n\n  second para\n\nlayout: grid\n";
        let out = set_yaml_entry(body, "note", "note: \"x\"");
        assert_eq!(out, "note: \"x\"\n\nlayout: grid\n");
        let meta = parse_yaml(&out);
        assert_eq!(meta["note"], "x");
        assert_eq!(meta["layout"], "grid");
    }

    #[test]
    fn test_set_yaml_entry_appends_missing_key() {
        let out = set_yaml_entry("layout: grid\n", "bgImage", "bgImage: \"new.png\"");
        assert_eq!(out, "layout: grid\nbgImage: \"new.png\"\n");
        assert_eq!(set_yaml_entry("", "a", "a: \"1\""), "a: \"1\"\n");
    }

    #[test]
    fn test_quote_yaml_escapes() {
        assert_eq!(quote_yaml("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
