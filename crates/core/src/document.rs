//! Document parser.
//!
//! Splits raw text into slide sections, extracts global and per-slide YAML
//! front matter, and runs the block parser on each section body with
//! absolute offsets. [`split_sections`] is the single source of slide
//! boundaries: the SOM spans and every slide-indexed text edit use it too.

use crate::blocks::parse_blocks;
use crate::frontmatter::{self, FrontMatterSpan};
use crate::lines::{lines_from, FenceTracker};
use crate::types::{Block, BlockKind, Metadata};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;
use std::sync::LazyLock;

/// A slide separator line: `---` or `===` runs of three or more.
static SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-{3,}|={3,})\s*$").unwrap());

/// Whether `line` is a slide separator (ignoring fence context).
pub fn is_separator(line: &str) -> bool {
    SEPARATOR_REGEX.is_match(line)
}

/// One slide's slice of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideSection {
    pub index: usize,
    /// Offset just past the previous separator line, or 0.
    pub start: usize,
    /// Offset of the terminating separator line, or the end of the text.
    pub end: usize,
    pub start_line: usize,
    /// Document-global front matter; only ever set on section 0.
    pub global: Option<FrontMatterSpan>,
    /// This slide's own front matter.
    pub front_matter: Option<FrontMatterSpan>,
    /// Slide configuration. For section 0 this is the global map with the
    /// local map merged over it.
    pub meta: Metadata,
    /// Where block content starts, past any front matter.
    pub body_start: usize,
    pub body_line: usize,
    /// The separator line ending this section, newline included.
    pub separator: Option<Range<usize>>,
}

impl SlideSection {
    /// Block content of the section.
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body_start..self.end.max(self.body_start)]
    }

    /// Whole section text, front matter included.
    pub fn raw<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The slide's own text: front matter and content, without the blank
    /// lines padding it against its separators. An empty slide gets a
    /// zero-width span at the section start.
    pub fn content_span(&self, text: &str) -> Range<usize> {
        let raw = self.raw(text);
        let lead: usize = raw
            .split_inclusive('\n')
            .take_while(|l| l.trim().is_empty())
            .map(str::len)
            .sum();
        let body = raw[lead..].trim_end();
        if body.is_empty() {
            return self.start..self.start;
        }
        let start = self.start + lead;
        start..start + body.len()
    }

    /// The YAML block an edit to this slide's configuration should touch.
    pub fn yaml_target(&self) -> Option<&FrontMatterSpan> {
        self.front_matter.as_ref().or(self.global.as_ref())
    }
}

/// Split `text` into slide sections. `N` separators always give `N + 1`
/// sections; a trailing separator yields a final empty section.
pub fn split_sections(text: &str) -> Vec<SlideSection> {
    let mut sections = Vec::new();
    let mut cursor = 0;
    let mut line = 0;

    loop {
        let index = sections.len();
        let global = if index == 0 {
            frontmatter::detect(text, 0, 0, text.len())
        } else {
            None
        };

        let (mut body_start, mut body_line) = match &global {
            Some(span) => (span.end, span.end_line),
            None => (cursor, line),
        };

        let front_matter = frontmatter::detect(text, body_start, body_line, text.len());
        if let Some(span) = &front_matter {
            body_start = span.end;
            body_line = span.end_line;
        }

        let mut meta = Metadata::new();
        if let Some(span) = &global {
            meta = frontmatter::parse_yaml(span.body(text));
        }
        if let Some(span) = &front_matter {
            for (key, value) in frontmatter::parse_yaml(span.body(text)) {
                meta.insert(key, value);
            }
        }

        let mut fences = FenceTracker::new();
        let separator = lines_from(text, body_start, body_line)
            .find(|l| !fences.update(l.text) && is_separator(l.text));

        let end = separator.map_or(text.len(), |s| s.start);
        sections.push(SlideSection {
            index,
            start: cursor,
            end,
            start_line: line,
            global,
            front_matter,
            meta,
            body_start: body_start.min(end),
            body_line,
            separator: separator.map(|s| s.start..s.next),
        });

        match separator {
            Some(sep) => {
                cursor = sep.next;
                line = sep.number + 1;
            }
            None => break,
        }
    }

    log::debug!("Split document into {} slide sections", sections.len());
    sections
}

/// Result of parsing a whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    /// Flat block stream; each slide starts with a `SlideSeparator` block.
    pub blocks: Vec<Block>,
    /// Document-global front matter.
    pub meta: Metadata,
}

impl ParsedDocument {
    /// Number of slides in the document.
    pub fn slide_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::SlideSeparator)
            .count()
    }
}

/// Parse a document into its flat block stream.
pub fn parse(text: &str) -> ParsedDocument {
    let sections = split_sections(text);
    let meta = sections
        .first()
        .and_then(|s| s.global.as_ref())
        .map(|span| frontmatter::parse_yaml(span.body(text)))
        .unwrap_or_default();

    let mut blocks = Vec::new();
    for section in &sections {
        let span = section.content_span(text);
        let mut separator =
            Block::new(BlockKind::SlideSeparator, "").at(section.start_line, span.start, span.end);
        separator.metadata = section.meta.clone();

        let mut notes = Vec::new();
        let mut content = Vec::new();
        for block in parse_blocks(section.body(text), section.body_line, section.body_start) {
            if block.kind == BlockKind::SpeakerNote {
                notes.push(block.content);
            } else {
                content.push(block);
            }
        }

        if !notes.is_empty() {
            let joined = notes.join("\n\n");
            let note = match separator.metadata.get("note").and_then(Value::as_str) {
                Some(existing) if !existing.is_empty() => format!("{}\n\n{}", existing, joined),
                _ => joined,
            };
            separator.metadata.insert("note".to_string(), Value::String(note));
        }

        blocks.push(separator);
        blocks.extend(content);
    }

    log::debug!(
        "Parsed {} blocks across {} slides",
        blocks.len(),
        sections.len()
    );
    ParsedDocument { blocks, meta }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(doc: &ParsedDocument) -> Vec<BlockKind> {
        doc.blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_two_slide_scenario() {
        let doc = parse("# Title\n\n===\n\n# Slide 2\nBody text");
        assert_eq!(doc.slide_count(), 2);
        assert_eq!(
            kinds(&doc),
            vec![
                BlockKind::SlideSeparator,
                BlockKind::Heading1,
                BlockKind::SlideSeparator,
                BlockKind::Heading1,
                BlockKind::Paragraph,
            ]
        );
        assert_eq!(doc.blocks[1].content, "Title");
        assert_eq!(doc.blocks[3].content, "Slide 2");
        assert_eq!(doc.blocks[4].content, "Body text");
        assert_eq!(doc.blocks[4].source_line, 5);
    }

    #[test]
    fn test_no_separator_is_one_slide() {
        let doc = parse("Just one paragraph.\n");
        assert_eq!(doc.slide_count(), 1);
        assert_eq!(parse("").slide_count(), 1);
    }

    #[test]
    fn test_separator_count_gives_n_plus_one_slides() {
        let text = "a\n---\nb\n===\n\n=====\nc\n---\n";
        let sections = split_sections(text);
        assert_eq!(sections.len(), 5);
        // Two adjacent separators make an empty slide.
        assert!(sections[2].body(text).trim().is_empty());
        assert_eq!(sections[4].start, text.len());
        assert_eq!(parse(text).slide_count(), 5);
    }

    #[test]
    fn test_sections_partition_the_document() {
        let text = "---\ntitle: Deck\n---\n# A\n\n---\n\nB\n===\nC";
        let sections = split_sections(text);
        let mut rebuilt = String::new();
        for s in &sections {
            rebuilt.push_str(s.raw(text));
            if let Some(sep) = &s.separator {
                rebuilt.push_str(&text[sep.clone()]);
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_content_span_skips_padding() {
        let text = "# A\n\n===\n\n---\nbg: red\n---\n# B\n\n\n===\n\n===\n";
        let sections = split_sections(text);
        assert_eq!(&text[sections[0].content_span(text)], "# A");
        assert_eq!(&text[sections[1].content_span(text)], "---\nbg: red\n---\n# B");
        let empty = sections[2].content_span(text);
        assert!(empty.is_empty());
        assert_eq!(empty.start, sections[2].start);
        assert!(sections[3].content_span(text).is_empty());
    }

    #[test]
    fn test_separator_inside_code_fence_is_content() {
        let doc = parse("```yaml\n---\nkey: v\n```\n");
        assert_eq!(doc.slide_count(), 1);
        assert_eq!(doc.blocks[1].kind, BlockKind::Code);
    }

    #[test]
    fn test_global_and_slide_front_matter() {
        let text = "---\ntitle: Deck\ntheme: dark\n---\n# Intro\n\n===\n\n---\nlayout: grid\nbg: red\n---\n## Two\n";
        let doc = parse(text);
        assert_eq!(doc.meta["title"], "Deck");

        let separators: Vec<&Block> = doc
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::SlideSeparator)
            .collect();
        assert_eq!(separators[0].metadata["theme"], "dark");
        assert_eq!(separators[1].metadata["layout"], "grid");
        // Global metadata only reaches the first slide.
        assert!(separators[1].metadata.get("title").is_none());

        let heading = doc.blocks.iter().find(|b| b.content == "Two").unwrap();
        assert_eq!(heading.source_line, 12);
        assert_eq!(&text[heading.start_index..heading.start_index + 6], "## Two");
    }

    #[test]
    fn test_first_slide_local_yaml_overrides_global() {
        let text = "---\ntheme: dark\nlayout: default\n---\n---\nlayout: impact\n---\n# Big\n";
        let sections = split_sections(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].global.is_some());
        assert!(sections[0].front_matter.is_some());
        assert_eq!(sections[0].meta["layout"], "impact");
        assert_eq!(sections[0].meta["theme"], "dark");
    }

    #[test]
    fn test_malformed_yaml_falls_back_to_empty() {
        let doc = parse("---\nlayout: [broken\n---\n# Still parsed\n");
        assert!(doc.meta.is_empty());
        assert_eq!(doc.blocks[1].content, "Still parsed");
    }

    #[test]
    fn test_speaker_notes_fold_into_separator() {
        let text = "---\nnote: From yaml\n---\n# A\n\n<!-- note:\nSay hi\n-->\n\n<!-- note: And wave -->\n\n===\n\n# B\n";
        let doc = parse(text);
        assert!(doc.blocks.iter().all(|b| b.kind != BlockKind::SpeakerNote));
        assert_eq!(doc.blocks[0].metadata["note"], "From yaml\n\nSay hi\n\nAnd wave");
        let second = doc
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::SlideSeparator)
            .nth(1)
            .unwrap();
        assert!(second.metadata.get("note").is_none());
    }

    #[test]
    fn test_source_lines_are_monotonic() {
        let text = "# A\n\n- one\n- two\n\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n===\n\n> quote\n";
        let doc = parse(text);
        let total = text.lines().count();
        for pair in doc.blocks.windows(2) {
            assert!(pair[0].source_line <= pair[1].source_line);
        }
        assert!(doc.blocks.iter().all(|b| b.source_line <= total));
    }

    #[test]
    fn test_dash_separator_with_heading_is_not_front_matter() {
        let doc = parse("---\n# Heading\n---\nText\n");
        assert_eq!(doc.slide_count(), 3);
        assert!(doc.meta.is_empty());
    }
}
