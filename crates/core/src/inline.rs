//! Inline style tokenizer.
//!
//! Splits a text run into flat styled segments. Styles do not nest; the
//! first token that matches at a position wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Alternation order matters: longer delimiters come before their prefixes.
static INLINE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<code>`(?P<code_body>[^`]+)`)",
        r"|(?P<highlight>\[\[(?P<highlight_body>[^\[\]]+)\]\])",
        r"|(?P<link>\[(?P<link_text>[^\[\]]+)\]\((?P<link_url>[^()\s]+)\))",
        r"|(?P<badge>\{\{(?P<badge_body>[^{}]+)\}\})",
        r"|(?P<muted>\(\((?P<muted_body>[^()]+)\)\))",
        r"|(?P<bold>\*\*(?P<bold_body>[^*]+?)\*\*)",
        r"|(?P<underline>__(?P<underline_body>[^_]+?)__)",
        r"|(?P<italic>\*(?P<italic_body>[^*\s][^*]*?)\*)",
        r"|(?P<italic_alt>_(?P<italic_alt_body>[^_\s][^_]*?)_)",
    ))
    .unwrap()
});

/// Style of an inline segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineStyle {
    Text,
    Bold,
    Italic,
    Underline,
    Code,
    Link,
    /// `[[text]]`
    Highlight,
    /// `{{text}}`
    Badge,
    /// `((text))`
    Muted,
}

/// A styled span of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSegment {
    #[serde(rename = "type")]
    pub style: InlineStyle,
    /// Display text.
    pub content: String,
    /// The raw matched substring.
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineSegment {
    fn text(s: &str) -> Self {
        Self {
            style: InlineStyle::Text,
            content: s.to_string(),
            original: s.to_string(),
            url: None,
        }
    }
}

/// Tokenize `text` into styled segments.
pub fn parse_inline(text: &str) -> Vec<InlineSegment> {
    let mut segments: Vec<InlineSegment> = Vec::new();
    let mut last = 0;

    for caps in INLINE_TOKEN_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            push_text(&mut segments, &text[last..whole.start()]);
        }

        let (style, body) = if caps.name("code").is_some() {
            (InlineStyle::Code, caps.name("code_body"))
        } else if caps.name("highlight").is_some() {
            (InlineStyle::Highlight, caps.name("highlight_body"))
        } else if caps.name("link").is_some() {
            (InlineStyle::Link, caps.name("link_text"))
        } else if caps.name("badge").is_some() {
            (InlineStyle::Badge, caps.name("badge_body"))
        } else if caps.name("muted").is_some() {
            (InlineStyle::Muted, caps.name("muted_body"))
        } else if caps.name("bold").is_some() {
            (InlineStyle::Bold, caps.name("bold_body"))
        } else if caps.name("underline").is_some() {
            (InlineStyle::Underline, caps.name("underline_body"))
        } else if caps.name("italic").is_some() {
            (InlineStyle::Italic, caps.name("italic_body"))
        } else {
            (InlineStyle::Italic, caps.name("italic_alt_body"))
        };

        segments.push(InlineSegment {
            style,
            content: body.map_or("", |m| m.as_str()).to_string(),
            original: whole.as_str().to_string(),
            url: caps.name("link_url").map(|m| m.as_str().to_string()),
        });
        last = whole.end();
    }

    if last < text.len() {
        push_text(&mut segments, &text[last..]);
    }
    segments
}

/// Plain display text with all markers removed.
pub fn plain_text(text: &str) -> String {
    parse_inline(text)
        .into_iter()
        .map(|s| s.content)
        .collect::<Vec<_>>()
        .concat()
}

fn push_text(segments: &mut Vec<InlineSegment>, s: &str) {
    if let Some(prev) = segments.last_mut() {
        if prev.style == InlineStyle::Text {
            prev.content.push_str(s);
            prev.original.push_str(s);
            return;
        }
    }
    segments.push(InlineSegment::text(s));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles(text: &str) -> Vec<(InlineStyle, String)> {
        parse_inline(text)
            .into_iter()
            .map(|s| (s.style, s.content))
            .collect()
    }

    #[test]
    fn test_plain_text_is_one_segment() {
        assert_eq!(
            styles("just words"),
            vec![(InlineStyle::Text, "just words".to_string())]
        );
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_standard_styles() {
        let segs = styles("a **b** *c* `d` __e__");
        assert_eq!(segs[1], (InlineStyle::Bold, "b".to_string()));
        assert_eq!(segs[3], (InlineStyle::Italic, "c".to_string()));
        assert_eq!(segs[5], (InlineStyle::Code, "d".to_string()));
        assert_eq!(segs[7], (InlineStyle::Underline, "e".to_string()));
    }

    #[test]
    fn test_link_keeps_url_and_original() {
        let segs = parse_inline("see [docs](https://example.com) now");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[1].style, InlineStyle::Link);
        assert_eq!(segs[1].content, "docs");
        assert_eq!(segs[1].url.as_deref(), Some("https://example.com"));
        assert_eq!(segs[1].original, "[docs](https://example.com)");
    }

    #[test]
    fn test_custom_brackets() {
        let segs = styles("[[hot]] {{new}} ((aside))");
        assert_eq!(segs[0], (InlineStyle::Highlight, "hot".to_string()));
        assert_eq!(segs[2], (InlineStyle::Badge, "new".to_string()));
        assert_eq!(segs[4], (InlineStyle::Muted, "aside".to_string()));
    }

    #[test]
    fn test_code_wins_over_inner_markers() {
        let segs = styles("`**not bold**`");
        assert_eq!(segs, vec![(InlineStyle::Code, "**not bold**".to_string())]);
    }

    #[test]
    fn test_unmatched_delimiters_stay_text() {
        assert_eq!(
            styles("2 * 3 = 6"),
            vec![(InlineStyle::Text, "2 * 3 = 6".to_string())]
        );
        assert_eq!(plain_text("**bold** and [x](y)"), "bold and x");
    }
}
