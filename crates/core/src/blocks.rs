//! Block AST parser.
//!
//! Wraps pulldown-cmark and reinterprets its token stream into slide blocks,
//! stamping each block with absolute line and byte positions. Chart
//! containers (`::: chart-<type>` ... `:::`) are isolated by a line-level
//! pre-pass so the tokenizer never folds the closing fence into a table row.

use crate::attributes;
use crate::lines::{lines, FenceTracker, LineCounter};
use crate::types::{Block, BlockKind, ChatAlignment, Metadata};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};
use regex::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::LazyLock;

type Events<'a> = Vec<(Event<'a>, Range<usize>)>;

/// `::: chart-<subtype> [json]`
static CHART_OPEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:::\s*chart-([A-Za-z]+)(?:\s+(.*))?$").unwrap());

static CHAT_CENTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([^:"\s][^:"]*?)\s*:":\s*(.*)$"#).unwrap());

static CHAT_RIGHT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([^:"\s][^:"]*?)\s*::"\s*(.*)$"#).unwrap());

static CHAT_LEFT_QUOTED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([^:"\s][^:"]*?)\s*"::\s*(.*)$"#).unwrap());

static CHAT_LEFT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([^:"\s][^:"]*?)\s*::\s+(.*)$"#).unwrap());

static IMAGE_ONLY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"([^"]*)")?\s*\)$"#).unwrap()
});

static NOTE_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*note:\s*(.*?)-->").unwrap());

static LIST_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d{1,9}[.)])(?:[ \t]+|$)").unwrap());

static HEADING_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}(?:[ \t]+|$)").unwrap());

static CLOSING_HASHES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+#+\s*$").unwrap());

/// Parse a markdown slice into blocks.
///
/// `line_offset` and `char_offset` are the absolute line number and byte
/// offset of the slice within the whole document.
pub fn parse_blocks(markdown: &str, line_offset: usize, char_offset: usize) -> Vec<Block> {
    let mut builder = BlockBuilder {
        source: markdown,
        line_offset,
        char_offset,
        lines: LineCounter::new(markdown),
        blocks: Vec::new(),
    };

    for segment in segment_containers(markdown) {
        match segment {
            Segment::Markdown(range) => builder.parse_markdown(range),
            Segment::Chart(chart) => builder.parse_chart(chart),
        }
    }

    builder.blocks
}

/// A chart container located by the pre-pass.
#[derive(Debug, Clone)]
struct ChartContainer {
    /// Whole container, opener through closer line.
    span: Range<usize>,
    /// Lines between the fences.
    inner: Range<usize>,
    subtype: String,
    config: Option<String>,
}

#[derive(Debug, Clone)]
enum Segment {
    Markdown(Range<usize>),
    Chart(ChartContainer),
}

/// Split a slice into plain markdown runs and closed chart containers.
fn segment_containers(text: &str) -> Vec<Segment> {
    let all: Vec<_> = lines(text).collect();
    let mut fences = FenceTracker::new();
    let mut segments = Vec::new();
    let mut run_start = 0;
    let mut i = 0;

    while i < all.len() {
        let line = all[i];
        if fences.update(line.text) {
            i += 1;
            continue;
        }
        let Some(caps) = CHART_OPEN_REGEX.captures(line.text.trim()) else {
            i += 1;
            continue;
        };

        let mut inner_fences = FenceTracker::new();
        let closer = all[i + 1..]
            .iter()
            .find(|l| !inner_fences.update(l.text) && l.text.trim() == ":::");
        let Some(closer) = closer else {
            log::warn!(
                "Chart container at line {} has no closing ':::'; leaving it as text",
                line.number
            );
            i += 1;
            continue;
        };

        if run_start < line.start {
            segments.push(Segment::Markdown(run_start..line.start));
        }
        segments.push(Segment::Chart(ChartContainer {
            span: line.start..closer.end,
            inner: line.next..closer.start.max(line.next),
            subtype: caps[1].to_lowercase(),
            config: caps.get(2).map(|m| m.as_str().trim().to_string()),
        }));
        run_start = closer.next;
        i = closer.number + 1;
    }

    if run_start < text.len() {
        segments.push(Segment::Markdown(run_start..text.len()));
    }
    segments
}

struct BlockBuilder<'a> {
    source: &'a str,
    line_offset: usize,
    char_offset: usize,
    lines: LineCounter<'a>,
    blocks: Vec<Block>,
}

impl<'a> BlockBuilder<'a> {
    /// Absolute position of a range relative to the slice.
    fn position(&mut self, range: &Range<usize>) -> (usize, usize, usize) {
        let line = self.line_offset + self.lines.line_at(range.start);
        (
            line,
            self.char_offset + range.start,
            self.char_offset + range.end,
        )
    }

    fn push(&mut self, block: Block, range: &Range<usize>) {
        let (line, start, end) = self.position(range);
        self.blocks.push(block.at(line, start, end));
    }

    fn parse_markdown(&mut self, segment: Range<usize>) {
        let source = self.source;
        let events = tokenize(&source[segment.clone()], segment.start);
        let mut i = 0;

        while i < events.len() {
            let (event, range) = (&events[i].0, events[i].1.clone());
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let depth = *level as usize;
                    i = skip_block(&events, i);
                    self.heading(depth, &range);
                }
                Event::Start(Tag::Paragraph) => {
                    i = skip_block(&events, i);
                    self.paragraph(&range);
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    let end = skip_block(&events, i);
                    let code = collect_text(&events[i + 1..end.saturating_sub(1)]);
                    i = end;
                    self.code(&info, code, &range);
                }
                Event::Start(Tag::BlockQuote(_)) => {
                    i = skip_block(&events, i);
                    self.quote(&range);
                }
                Event::Start(Tag::List(start)) => {
                    let ordered = start.is_some();
                    let first_number = *start;
                    i = self.list(&events, i + 1, ordered, first_number, 0);
                }
                Event::Start(Tag::Table(_)) => {
                    let end = skip_block(&events, i);
                    let rows = collect_table(source, &events[i..end]);
                    i = end;
                    self.push(Block::new(BlockKind::Table, "").with_rows(rows), &range);
                }
                Event::Start(Tag::HtmlBlock) => {
                    let end = skip_block(&events, i);
                    let html = collect_text(&events[i + 1..end.saturating_sub(1)]);
                    i = end;
                    self.html(&html, &range);
                }
                Event::Html(html) => {
                    let html = html.to_string();
                    i += 1;
                    self.html(&html, &range);
                }
                Event::Rule => {
                    i += 1;
                    self.push(Block::new(BlockKind::HorizontalRule, ""), &range);
                }
                Event::Start(tag) => {
                    log::warn!("Skipping unsupported markdown token: {:?}", tag);
                    i = skip_block(&events, i);
                }
                _ => {
                    i += 1;
                }
            }
        }
    }

    fn heading(&mut self, depth: usize, range: &Range<usize>) {
        let source = self.source;
        let raw = source[range.clone()].trim_end();
        let first_line = raw.lines().next().unwrap_or("");
        let without_marker = HEADING_MARKER_REGEX.replace(first_line, "");
        let without_hashes = CLOSING_HASHES_REGEX.replace(&without_marker, "");
        let (content, attrs) = attributes::split_trailing(without_hashes.trim());
        let mut block = Block::new(BlockKind::heading(depth), content.trim());
        block.attributes = attrs;
        self.push(block, range);
    }

    fn paragraph(&mut self, range: &Range<usize>) {
        let source = self.source;
        let raw = &source[range.clone()];
        let text: Vec<&str> = raw.lines().map(str::trim).collect();
        let joined = text.join("\n");
        let joined = joined.trim();

        if joined == "[TOC]" || joined == "[toc]" {
            self.push(Block::new(BlockKind::Toc, ""), range);
            return;
        }
        if joined == ":: right ::" {
            self.push(Block::new(BlockKind::ColumnBreak, ""), range);
            return;
        }
        if self.chat_lines(range) {
            return;
        }

        let (content, attrs) = attributes::split_trailing(joined);
        if let Some(caps) = IMAGE_ONLY_REGEX.captures(content.trim()) {
            let mut block = Block::new(BlockKind::Image, &caps[1]).with_meta("src", &caps[2]);
            if let Some(title) = caps.get(3) {
                block = block.with_meta("title", title.as_str());
            }
            block.attributes = attrs;
            self.push(block, range);
            return;
        }

        let mut block = Block::new(BlockKind::Paragraph, content.trim_end());
        block.attributes = attrs;
        self.push(block, range);
    }

    /// Emit one chat block per line when every line of the paragraph is a
    /// dialogue line. Returns false (emitting nothing) otherwise.
    fn chat_lines(&mut self, range: &Range<usize>) -> bool {
        let source = self.source;
        let raw = &source[range.clone()];
        let mut parsed = Vec::new();
        let mut offset = range.start;
        for line in raw.split_inclusive('\n') {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += line.len();
                continue;
            }
            match parse_chat_line(trimmed) {
                Some(chat) => parsed.push((chat, offset..offset + line.trim_end().len())),
                None => return false,
            }
            offset += line.len();
        }
        if parsed.is_empty() {
            return false;
        }
        for ((role, alignment, text), line_range) in parsed {
            let mut block = Block::new(BlockKind::Chat, text);
            block.role = Some(role);
            block.alignment = Some(alignment);
            self.push(block, &line_range);
        }
        true
    }

    fn code(&mut self, info: &str, mut code: String, range: &Range<usize>) {
        if code.ends_with('\n') {
            code.pop();
        }
        let lang_token = info.split_whitespace().next().unwrap_or("");
        let (language, flag) = match lang_token.split_once(':') {
            Some((base, flag)) => (base.to_string(), Some(flag.to_lowercase())),
            None => (lang_token.to_string(), None),
        };

        if language.eq_ignore_ascii_case("mermaid") {
            self.push(Block::new(BlockKind::Mermaid, code), range);
            return;
        }

        let mut block = Block::new(BlockKind::Code, code);
        if !language.is_empty() {
            block = block.with_meta("language", language);
        }
        match flag.as_deref() {
            Some("ln") | Some("line") | Some("lines") | Some("yes") => {
                block = block.with_meta("lineNumbers", true);
            }
            Some("no-ln") | Some("plain") | Some("no") => {
                block = block.with_meta("lineNumbers", false);
            }
            Some(other) => log::debug!("Ignoring unknown code fence flag ':{}'", other),
            None => {}
        }
        self.push(block, range);
    }

    fn quote(&mut self, range: &Range<usize>) {
        let source = self.source;
        let raw = &source[range.clone()];
        let mut lines: Vec<String> = raw
            .lines()
            .map(|l| {
                let l = l.trim_start();
                let l = l.strip_prefix('>').unwrap_or(l);
                l.strip_prefix(' ').unwrap_or(l).trim_end().to_string()
            })
            .collect();

        let mut kind = BlockKind::Quote;
        if let Some(first) = lines.iter_mut().find(|l| !l.trim().is_empty()) {
            let markers = [
                ("[!TIP]", BlockKind::CalloutTip),
                ("[!WARNING]", BlockKind::CalloutWarning),
                ("[!NOTE]", BlockKind::CalloutNote),
            ];
            let trimmed = first.trim_start();
            let matched = markers.iter().find(|(marker, _)| {
                trimmed
                    .get(..marker.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(marker))
            });
            if let Some((marker, callout)) = matched {
                let rest = trimmed[marker.len()..].trim().to_string();
                kind = *callout;
                *first = rest;
            }
        }

        let content = lines.join("\n");
        self.push(Block::new(kind, content.trim()), range);
    }

    /// Emit one block per list item, recursing into nested lists.
    /// `i` points just past `Start(List)`; returns the index past `End(List)`.
    fn list(
        &mut self,
        events: &Events<'_>,
        mut i: usize,
        ordered: bool,
        first_number: Option<u64>,
        level: usize,
    ) -> usize {
        let kind = if ordered {
            BlockKind::NumberedItem
        } else {
            BlockKind::BulletItem
        };
        let mut first = true;

        while i < events.len() {
            let (event, range) = (&events[i].0, events[i].1.clone());
            match event {
                Event::End(TagEnd::List(_)) => return i + 1,
                Event::Start(Tag::Item) => {
                    let item_end = skip_block(events, i);
                    // Item text stops where a nested list begins.
                    let nested = events[i + 1..item_end]
                        .iter()
                        .position(|(e, _)| matches!(e, Event::Start(Tag::List(_))))
                        .map(|p| i + 1 + p);
                    let text_end = nested.map_or(range.end, |n| events[n].1.start);

                    let source = self.source;
                    let raw = &source[range.start..text_end.max(range.start)];
                    let text: Vec<String> = raw
                        .lines()
                        .enumerate()
                        .map(|(n, l)| {
                            if n == 0 {
                                LIST_MARKER_REGEX.replace(l, "").trim().to_string()
                            } else {
                                l.trim().to_string()
                            }
                        })
                        .filter(|l| !l.is_empty())
                        .collect();
                    let joined = text.join("\n");
                    let (content, attrs) = attributes::split_trailing(&joined);

                    let mut block = Block::new(kind, content.trim_end()).with_meta("level", level);
                    if first && ordered {
                        if let Some(n) = first_number.filter(|&n| n != 1) {
                            block = block.with_meta("start", n);
                        }
                    }
                    block.attributes = attrs;
                    first = false;
                    self.push(block, &(range.start..text_end));

                    if let Some(n) = nested {
                        let mut j = n;
                        while j < item_end {
                            match &events[j].0 {
                                Event::Start(Tag::List(start)) => {
                                    let ordered = start.is_some();
                                    j = self.list(events, j + 1, ordered, *start, level + 1);
                                }
                                _ => j += 1,
                            }
                        }
                    }
                    i = item_end;
                }
                _ => i += 1,
            }
        }
        i
    }

    fn html(&mut self, html: &str, range: &Range<usize>) {
        let mut found = false;
        for caps in NOTE_COMMENT_REGEX.captures_iter(html) {
            found = true;
            self.push(Block::new(BlockKind::SpeakerNote, caps[1].trim()), range);
        }
        if !found {
            log::warn!(
                "Skipping HTML block at byte {}: only note comments are supported",
                self.char_offset + range.start
            );
        }
    }

    fn parse_chart(&mut self, chart: ChartContainer) {
        let source = self.source;
        let events = tokenize(&source[chart.inner.clone()], chart.inner.start);
        let table = events
            .iter()
            .position(|(e, _)| matches!(e, Event::Start(Tag::Table(_))));

        let Some(table_start) = table else {
            log::warn!(
                "Chart container '{}' has no table; leaving it as text",
                chart.subtype
            );
            self.parse_markdown(chart.span.start..chart.inner.end.max(chart.span.end));
            return;
        };

        let table_end = skip_block(&events, table_start);
        let rows = collect_table(source, &events[table_start..table_end]);

        let options = match chart.config.as_deref() {
            Some(json) if !json.is_empty() => match serde_json::from_str::<Value>(json) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    log::warn!("Ignoring invalid chart options: {}", json);
                    Metadata::new()
                }
            },
            _ => Metadata::new(),
        };

        let block = Block::new(BlockKind::Chart, "")
            .with_rows(rows)
            .with_meta("chartType", chart.subtype.clone())
            .with_meta("options", Value::Object(options));
        self.push(block, &chart.span);
    }
}

/// Tokenize `text`, shifting ranges by `base` so they index the whole slice.
fn tokenize(text: &str, base: usize) -> Events<'_> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    CmarkParser::new_ext(text, options)
        .into_offset_iter()
        .map(|(event, range)| (event, range.start + base..range.end + base))
        .collect()
}

/// Index just past the `End` matching the `Start` at `i`.
fn skip_block(events: &Events<'_>, i: usize) -> usize {
    let mut depth = 0usize;
    let mut j = i;
    while j < events.len() {
        match events[j].0 {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return j + 1;
                }
            }
            _ => {
                if depth == 0 {
                    return j + 1;
                }
            }
        }
        j += 1;
    }
    events.len()
}

fn collect_text(events: &[(Event<'_>, Range<usize>)]) -> String {
    let mut out = String::new();
    for (event, _) in events {
        match event {
            Event::Text(t) | Event::Code(t) | Event::Html(t) | Event::InlineHtml(t) => {
                out.push_str(t)
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Collect table rows as raw cell text, header row first.
fn collect_table(source: &str, events: &[(Event<'_>, Range<usize>)]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (event, range) in events {
        match event {
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => rows.push(Vec::new()),
            Event::Start(Tag::TableCell) => {
                let raw = source.get(range.clone()).unwrap_or("");
                let cell = raw.trim().trim_matches('|').trim().to_string();
                match rows.last_mut() {
                    Some(row) => row.push(cell),
                    None => rows.push(vec![cell]),
                }
            }
            _ => {}
        }
    }
    rows
}

/// Parse a single dialogue line into `(role, alignment, text)`.
pub fn parse_chat_line(line: &str) -> Option<(String, ChatAlignment, String)> {
    let patterns: [(&Regex, ChatAlignment); 4] = [
        (&CHAT_CENTER_REGEX, ChatAlignment::Center),
        (&CHAT_RIGHT_REGEX, ChatAlignment::Right),
        (&CHAT_LEFT_QUOTED_REGEX, ChatAlignment::Left),
        (&CHAT_LEFT_REGEX, ChatAlignment::Left),
    ];
    patterns.iter().find_map(|(regex, alignment)| {
        regex.captures(line).map(|caps| {
            (
                caps[1].trim().to_string(),
                *alignment,
                caps[2].trim().to_string(),
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(blocks: &[Block]) -> Vec<BlockKind> {
        blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_headings_collapse_depth() {
        let blocks = parse_blocks("# One\n\n## Two\n\n#### Four ##\n", 0, 0);
        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Heading1, BlockKind::Heading2, BlockKind::Heading3]
        );
        assert_eq!(blocks[0].content, "One");
        assert_eq!(blocks[2].content, "Four");
    }

    #[test]
    fn test_positions_are_absolute() {
        let text = "# Title\n\nBody text\n";
        let blocks = parse_blocks(text, 10, 100);
        assert_eq!(blocks[0].source_line, 10);
        assert_eq!(blocks[0].start_index, 100);
        assert_eq!(blocks[1].source_line, 12);
        assert_eq!(blocks[1].start_index, 109);
        assert_eq!(blocks[1].content, "Body text");
    }

    #[test]
    fn test_toc_and_column_break() {
        let blocks = parse_blocks("[TOC]\n\n:: right ::\n\n[toc]\n", 0, 0);
        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Toc, BlockKind::ColumnBreak, BlockKind::Toc]
        );
    }

    #[test]
    fn test_chat_alignments() {
        let blocks = parse_blocks(
            "Alice :\": Hello\n\nBob ::\" Hi there\n\nCarol \"::  Hey\n\nDave ::  Yo\n",
            0,
            0,
        );
        let got: Vec<_> = blocks
            .iter()
            .map(|b| (b.role.clone().unwrap(), b.alignment.unwrap(), b.content.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Alice".to_string(), ChatAlignment::Center, "Hello".to_string()),
                ("Bob".to_string(), ChatAlignment::Right, "Hi there".to_string()),
                ("Carol".to_string(), ChatAlignment::Left, "Hey".to_string()),
                ("Dave".to_string(), ChatAlignment::Left, "Yo".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_line_dialogue_splits_per_line() {
        let text = "Alice ::  one\nBob ::\" two\n";
        let blocks = parse_blocks(text, 5, 0);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].role.as_deref(), Some("Bob"));
        assert_eq!(blocks[1].source_line, 6);
        assert_eq!(blocks[1].start_index, 14);
    }

    #[test]
    fn test_container_lines_are_not_chat() {
        assert!(parse_chat_line("::: chart-bar").is_none());
        assert!(parse_chat_line(":: right ::").is_none());
        assert!(parse_chat_line("A normal sentence: really").is_none());
    }

    #[test]
    fn test_image_only_paragraph() {
        let blocks = parse_blocks("![Logo](img/logo.png) {width=50%}\n", 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Image);
        assert_eq!(blocks[0].content, "Logo");
        assert_eq!(blocks[0].meta_str("src").as_deref(), Some("img/logo.png"));
        assert_eq!(blocks[0].attributes.get("width").map(String::as_str), Some("50%"));

        let blocks = parse_blocks("Look: ![Logo](logo.png)\n", 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_code_fence_variants() {
        let text = "```mermaid\ngraph TD\n```\n\n```rust:ln\nfn main() {}\n```\n\n```js:plain\nx\n```\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Mermaid);
        assert_eq!(blocks[0].content, "graph TD");
        assert_eq!(blocks[1].kind, BlockKind::Code);
        assert_eq!(blocks[1].meta_str("language").as_deref(), Some("rust"));
        assert_eq!(blocks[1].metadata["lineNumbers"], true);
        assert_eq!(blocks[1].content, "fn main() {}");
        assert_eq!(blocks[2].metadata["lineNumbers"], false);
    }

    #[test]
    fn test_callouts_strip_marker() {
        let blocks = parse_blocks("> [!TIP]\n> Drink water\n\n> plain quote\n", 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::CalloutTip);
        assert_eq!(blocks[0].content, "Drink water");
        assert_eq!(blocks[1].kind, BlockKind::Quote);
        assert_eq!(blocks[1].content, "plain quote");

        let blocks = parse_blocks("> [!WARNING] Careful\n", 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::CalloutWarning);
        assert_eq!(blocks[0].content, "Careful");
    }

    #[test]
    fn test_lists_emit_one_block_per_item() {
        let text = "- a\n- b\n  - nested\n\n3. x\n4. y\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(
            kinds(&blocks),
            vec![
                BlockKind::BulletItem,
                BlockKind::BulletItem,
                BlockKind::BulletItem,
                BlockKind::NumberedItem,
                BlockKind::NumberedItem,
            ]
        );
        assert_eq!(blocks[1].content, "b");
        assert_eq!(blocks[2].content, "nested");
        assert_eq!(blocks[2].list_level(), 1);
        assert_eq!(blocks[3].metadata["start"], 3);
        assert!(blocks[4].metadata.get("start").is_none());
        assert_eq!(blocks[2].source_line, 2);
    }

    #[test]
    fn test_table_rows_verbatim() {
        let text = "| Month | Sales |\n|---|---|\n| Jan | **100** |\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Table);
        assert_eq!(
            blocks[0].table_rows.as_ref().unwrap(),
            &vec![
                vec!["Month".to_string(), "Sales".to_string()],
                vec!["Jan".to_string(), "**100**".to_string()],
            ]
        );
    }

    #[test]
    fn test_speaker_note_comment() {
        let blocks = parse_blocks("Text\n\n<!-- note:\nSay hello\n-->\n", 0, 0);
        assert_eq!(blocks[1].kind, BlockKind::SpeakerNote);
        assert_eq!(blocks[1].content, "Say hello");
    }

    #[test]
    fn test_other_html_is_skipped() {
        let blocks = parse_blocks("<div>raw</div>\n\nAfter\n", 0, 0);
        assert_eq!(kinds(&blocks), vec![BlockKind::Paragraph]);
    }

    #[test]
    fn test_chart_container_merges() {
        let text = "Intro\n\n::: chart-bar {\"stacked\": true}\n| Month | Sales |\n|---|---|\n| Jan | 100 |\n:::\n\nAfter\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Paragraph, BlockKind::Chart, BlockKind::Paragraph]
        );
        let chart = &blocks[1];
        assert_eq!(chart.meta_str("chartType").as_deref(), Some("bar"));
        assert_eq!(chart.metadata["options"]["stacked"], true);
        assert_eq!(chart.table_rows.as_ref().unwrap().len(), 2);
        assert_eq!(chart.source_line, 2);
        assert_eq!(blocks[2].source_line, 8);
    }

    #[test]
    fn test_chart_bad_json_keeps_defaults() {
        let text = "::: chart-pie {not json\n| a | b |\n|---|---|\n| x | 1 |\n:::\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Chart);
        assert_eq!(blocks[0].metadata["options"], serde_json::json!({}));
    }

    #[test]
    fn test_unclosed_chart_stays_inert() {
        let text = "::: chart-line\n\n| a | b |\n|---|---|\n| x | 1 |\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].content, "::: chart-line");
        assert_eq!(blocks[1].kind, BlockKind::Table);
    }

    #[test]
    fn test_chart_without_table_stays_inert() {
        let text = "::: chart-line\n\njust text\n\n:::\n";
        let blocks = parse_blocks(text, 0, 0);
        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Paragraph, BlockKind::Paragraph, BlockKind::Paragraph]
        );
        assert_eq!(blocks[0].content, "::: chart-line");
    }

    #[test]
    fn test_thematic_break_is_divider() {
        let blocks = parse_blocks("a\n\n***\n\nb\n", 0, 0);
        assert_eq!(blocks[1].kind, BlockKind::HorizontalRule);
    }

    #[test]
    fn test_heading_attributes() {
        let blocks = parse_blocks("# Title {color=#ff0000}\n", 0, 0);
        assert_eq!(blocks[0].content, "Title");
        assert_eq!(
            blocks[0].attributes.get("color").map(String::as_str),
            Some("#ff0000")
        );
    }
}
