//! Trailing `{key=value ...}` attribute tags on content lines.

use crate::types::Attributes;
use regex::Regex;
use std::sync::LazyLock;

/// A trailing brace group at the end of a line.
static TRAILING_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{([^{}]*)\}\s*$").unwrap());

/// The whole tag body must be `key=value` pairs.
static TAG_BODY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[A-Za-z_][\w-]*=(?:"[^"]*"|[^\s"]+)\s*)+$"#).unwrap()
});

static PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)=(?:"([^"]*)"|([^\s"]+))"#).unwrap()
});

/// A located attribute tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTag {
    /// Byte offset where the tag (including its leading whitespace) starts.
    pub start: usize,
    /// Pairs in written order.
    pub pairs: Vec<(String, String)>,
}

/// Find a trailing attribute tag on `line`.
pub fn find_tag(line: &str) -> Option<AttributeTag> {
    let caps = TRAILING_TAG_REGEX.captures(line)?;
    let body = caps.get(1)?.as_str();
    if !TAG_BODY_REGEX.is_match(body) {
        return None;
    }
    let pairs = PAIR_REGEX
        .captures_iter(body)
        .map(|c| {
            let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
            (c[1].to_string(), value.to_string())
        })
        .collect();
    Some(AttributeTag {
        start: caps.get(0)?.start(),
        pairs,
    })
}

/// Split a line into its content and parsed attributes.
pub fn split_trailing(line: &str) -> (&str, Attributes) {
    match find_tag(line) {
        Some(tag) => (&line[..tag.start], tag.pairs.into_iter().collect()),
        None => (line, Attributes::new()),
    }
}

/// Render pairs as a `{key=value ...}` tag.
pub fn format_tag(pairs: &[(String, String)]) -> String {
    let body: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            if v.is_empty() || v.contains(char::is_whitespace) {
                format!("{}=\"{}\"", k, v)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect();
    format!("{{{}}}", body.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trailing_tag() {
        let (content, attrs) = split_trailing("# Title {color=#ff0000 size=2}");
        assert_eq!(content, "# Title");
        assert_eq!(attrs.get("color").map(String::as_str), Some("#ff0000"));
        assert_eq!(attrs.get("size").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_quoted_values() {
        let tag = find_tag("text {label=\"two words\" x=1}").unwrap();
        assert_eq!(tag.pairs[0], ("label".to_string(), "two words".to_string()));
        assert_eq!(format_tag(&tag.pairs), "{label=\"two words\" x=1}");
    }

    #[test]
    fn test_non_tag_braces_are_content() {
        assert!(find_tag("a {{badge}}").is_none());
        assert!(find_tag("json {\"a\": 1}").is_none());
        assert!(find_tag("set {x}").is_none());
        let (content, attrs) = split_trailing("plain");
        assert_eq!(content, "plain");
        assert!(attrs.is_empty());
    }
}
