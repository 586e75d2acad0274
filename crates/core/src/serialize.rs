//! Write a block stream back to the markdown dialect.

use crate::attributes;
use crate::grouping::{group_blocks, RenderUnit};
use crate::types::{Attributes, Block, BlockKind, ChatAlignment, Metadata};
use serde_json::Value;

/// Serialize blocks to markdown. Slides are joined with `===` separators;
/// slide configuration is written as front matter and notes as comments.
pub fn serialize_blocks(blocks: &[Block]) -> String {
    let mut slides: Vec<String> = Vec::new();
    let mut current: Option<SlideWriter<'_>> = None;

    for block in blocks {
        if block.kind == BlockKind::SlideSeparator {
            if let Some(writer) = current.take() {
                slides.push(writer.finish());
            }
            current = Some(SlideWriter::new(&block.metadata));
            continue;
        }
        current
            .get_or_insert_with(|| SlideWriter::new(&Metadata::new()))
            .push(block);
    }
    if let Some(writer) = current {
        slides.push(writer.finish());
    }

    let mut out = slides.join("\n\n===\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

struct SlideWriter<'a> {
    front_matter: Option<String>,
    note: Option<String>,
    blocks: Vec<&'a Block>,
}

impl<'a> SlideWriter<'a> {
    fn new(meta: &Metadata) -> Self {
        let mut config = meta.clone();
        let note = match config.remove("note") {
            Some(Value::String(note)) if !note.trim().is_empty() => Some(note),
            _ => None,
        };
        let front_matter = if config.is_empty() {
            None
        } else {
            match serde_yaml::to_string(&Value::Object(config)) {
                Ok(yaml) => Some(format!("---\n{}---", yaml)),
                Err(e) => {
                    log::warn!("Failed to serialize slide configuration: {}", e);
                    None
                }
            }
        };
        Self {
            front_matter,
            note,
            blocks: Vec::new(),
        }
    }

    fn push(&mut self, block: &'a Block) {
        self.blocks.push(block);
    }

    fn finish(self) -> String {
        let mut parts = Vec::new();
        if let Some(fm) = self.front_matter {
            parts.push(fm);
        }
        // List items of one list are written on consecutive lines.
        for unit in group_blocks(self.blocks.iter().copied()) {
            match unit {
                RenderUnit::Single(block) => parts.push(write_block(block)),
                RenderUnit::List { items, .. } => {
                    let lines: Vec<String> = items.into_iter().map(write_block).collect();
                    parts.push(lines.join("\n"));
                }
            }
        }
        if let Some(note) = self.note {
            parts.push(format!("<!-- note:\n{}\n-->", note.trim()));
        }
        parts.join("\n\n")
    }
}

fn with_attributes(text: &str, attrs: &Attributes) -> String {
    if attrs.is_empty() {
        return text.to_string();
    }
    let pairs: Vec<(String, String)> = attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    format!("{} {}", text, attributes::format_tag(&pairs))
}

fn write_block(block: &Block) -> String {
    match block.kind {
        BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 => {
            let level = block.kind.heading_level().unwrap_or(1) as usize;
            let text = format!("{} {}", "#".repeat(level), block.content);
            with_attributes(&text, &block.attributes)
        }
        BlockKind::Paragraph => with_attributes(&block.content, &block.attributes),
        BlockKind::Code => {
            let mut info = block.meta_str("language").unwrap_or_default();
            match block.metadata.get("lineNumbers").and_then(Value::as_bool) {
                Some(true) => info.push_str(":ln"),
                Some(false) => info.push_str(":no-ln"),
                None => {}
            }
            fenced(&info, &block.content)
        }
        BlockKind::Mermaid => fenced("mermaid", &block.content),
        BlockKind::Quote => quoted(None, &block.content),
        BlockKind::CalloutTip => quoted(Some("[!TIP]"), &block.content),
        BlockKind::CalloutNote => quoted(Some("[!NOTE]"), &block.content),
        BlockKind::CalloutWarning => quoted(Some("[!WARNING]"), &block.content),
        BlockKind::Chat => {
            let role = block.role.as_deref().unwrap_or("");
            let marker = match block.alignment.unwrap_or(ChatAlignment::Left) {
                ChatAlignment::Left => "::",
                ChatAlignment::Center => ":\":",
                ChatAlignment::Right => "::\"",
            };
            format!("{} {}  {}", role, marker, block.content)
        }
        BlockKind::BulletItem | BlockKind::NumberedItem => {
            let indent = "    ".repeat(block.list_level());
            let marker = if block.kind == BlockKind::NumberedItem {
                let start = block
                    .metadata
                    .get("start")
                    .and_then(Value::as_u64)
                    .unwrap_or(1);
                format!("{}.", start)
            } else {
                "-".to_string()
            };
            let text = with_attributes(&block.content, &block.attributes);
            let continuation = format!("\n{}  ", indent);
            format!("{}{} {}", indent, marker, text.replace('\n', &continuation))
        }
        BlockKind::Table => table(block.table_rows.as_deref().unwrap_or(&[])),
        BlockKind::Image => {
            let src = block.meta_str("src").unwrap_or_default();
            let text = match block.meta_str("title") {
                Some(title) => format!("![{}]({} \"{}\")", block.content, src, title),
                None => format!("![{}]({})", block.content, src),
            };
            with_attributes(&text, &block.attributes)
        }
        BlockKind::Chart => {
            let subtype = block.meta_str("chartType").unwrap_or_else(|| "bar".to_string());
            let opener = match block.metadata.get("options") {
                Some(Value::Object(options)) if !options.is_empty() => {
                    format!("::: chart-{} {}", subtype, Value::Object(options.clone()))
                }
                _ => format!("::: chart-{}", subtype),
            };
            let rows = table(block.table_rows.as_deref().unwrap_or(&[]));
            format!("{}\n{}\n:::", opener, rows)
        }
        BlockKind::HorizontalRule => "***".to_string(),
        BlockKind::Toc => "[TOC]".to_string(),
        BlockKind::ColumnBreak => ":: right ::".to_string(),
        BlockKind::SpeakerNote => format!("<!-- note: {} -->", block.content),
        BlockKind::SlideSeparator => String::new(),
    }
}

fn fenced(info: &str, code: &str) -> String {
    let fence = if code.contains("```") { "~~~~" } else { "```" };
    format!("{}{}\n{}\n{}", fence, info, code, fence)
}

fn quoted(marker: Option<&str>, content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(marker) = marker {
        lines.push(format!("> {}", marker));
    }
    for line in content.lines() {
        if line.is_empty() {
            lines.push(">".to_string());
        } else {
            lines.push(format!("> {}", line));
        }
    }
    lines.join("\n")
}

fn table(rows: &[Vec<String>]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    let row = |cells: &[String]| format!("| {} |", cells.join(" | "));
    let mut out = vec![row(header)];
    out.push(format!("|{}|", vec!["---"; header.len().max(1)].join("|")));
    out.extend(rows[1..].iter().map(|r| row(r)));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;

    fn shape(blocks: &[Block]) -> Vec<(BlockKind, String)> {
        blocks
            .iter()
            .map(|b| (b.kind, b.content.trim().to_string()))
            .collect()
    }

    #[test]
    fn test_parse_serialize_parse_is_stable() {
        let text = concat!(
            "---\ntitle: Deck\n---\n",
            "# Title {color=red}\n\nIntro with **bold**.\n\n",
            "- one\n- two\n    - nested\n\n3. three\n4. four\n\n",
            "<!-- note: Say hello -->\n\n",
            "===\n\n",
            "---\nlayout: two-column\n---\n",
            "## Compare\n\n> [!TIP]\n> Hydrate\n\n:: right ::\n\n",
            "```rust:ln\nfn main() {}\n```\n\n",
            "Alice ::  Hi\n\nBob ::\" Hey\n\n",
            "![Logo](logo.png)\n\n",
            "::: chart-bar {\"stacked\":true}\n| Month | Sales |\n|---|---|\n| Jan | 100 |\n:::\n\n",
            "***\n\n[TOC]\n",
        );
        let first = parse(text);
        let written = serialize_blocks(&first.blocks);
        let second = parse(&written);
        assert_eq!(shape(&first.blocks), shape(&second.blocks));
        assert_eq!(first.blocks[0].metadata, second.blocks[0].metadata);
        assert_eq!(second.meta["title"], "Deck");
    }

    #[test]
    fn test_empty_slides_survive() {
        let first = parse("A\n\n===\n===\nB\n");
        let second = parse(&serialize_blocks(&first.blocks));
        assert_eq!(second.slide_count(), 3);
    }

    #[test]
    fn test_write_individual_blocks() {
        let chat = Block {
            role: Some("Ann".into()),
            alignment: Some(ChatAlignment::Center),
            ..Block::new(BlockKind::Chat, "Hello")
        };
        assert_eq!(write_block(&chat), "Ann :\":  Hello");
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string(), "2".to_string()],
        ];
        assert_eq!(
            write_block(&Block::new(BlockKind::Table, "").with_rows(rows)),
            "| a | b |\n|---|---|\n| 1 | 2 |"
        );
        assert_eq!(
            write_block(&Block::new(BlockKind::CalloutWarning, "Careful\nnow")),
            "> [!WARNING]\n> Careful\n> now"
        );
    }
}
