//! Domain types for parsed slide documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open key-value map attached to blocks and slides.
pub type Metadata = serde_json::Map<String, Value>;

/// Attribute tag values parsed from a trailing `{key=value}` tag.
pub type Attributes = BTreeMap<String, String>;

/// The kind of a parsed block. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    #[serde(rename = "heading-1")]
    Heading1,
    #[serde(rename = "heading-2")]
    Heading2,
    #[serde(rename = "heading-3")]
    Heading3,
    Code,
    Mermaid,
    Quote,
    CalloutTip,
    CalloutNote,
    CalloutWarning,
    Chat,
    BulletItem,
    NumberedItem,
    Table,
    Image,
    Chart,
    /// Slide boundary emitted by the document parser. Carries the slide
    /// configuration and the slide's source span, never renderable content.
    SlideSeparator,
    /// Thematic break inside slide content, drawn as a divider.
    HorizontalRule,
    Toc,
    SpeakerNote,
    /// `:: right ::` marker splitting a slide into two columns.
    ColumnBreak,
}

impl BlockKind {
    /// Heading kind for a markdown heading depth; depth 4+ collapses to 3.
    pub fn heading(depth: usize) -> Self {
        match depth {
            0 | 1 => BlockKind::Heading1,
            2 => BlockKind::Heading2,
            _ => BlockKind::Heading3,
        }
    }

    /// Heading level (1-3) for heading kinds.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockKind::Heading1 => Some(1),
            BlockKind::Heading2 => Some(2),
            BlockKind::Heading3 => Some(3),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level().is_some()
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::BulletItem | BlockKind::NumberedItem)
    }

    pub fn is_callout(&self) -> bool {
        matches!(
            self,
            BlockKind::CalloutTip | BlockKind::CalloutNote | BlockKind::CalloutWarning
        )
    }

    /// The name used in serialized output (`heading-1`, `bullet-item`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading1 => "heading-1",
            BlockKind::Heading2 => "heading-2",
            BlockKind::Heading3 => "heading-3",
            BlockKind::Code => "code",
            BlockKind::Mermaid => "mermaid",
            BlockKind::Quote => "quote",
            BlockKind::CalloutTip => "callout-tip",
            BlockKind::CalloutNote => "callout-note",
            BlockKind::CalloutWarning => "callout-warning",
            BlockKind::Chat => "chat",
            BlockKind::BulletItem => "bullet-item",
            BlockKind::NumberedItem => "numbered-item",
            BlockKind::Table => "table",
            BlockKind::Image => "image",
            BlockKind::Chart => "chart",
            BlockKind::SlideSeparator => "slide-separator",
            BlockKind::HorizontalRule => "horizontal-rule",
            BlockKind::Toc => "toc",
            BlockKind::SpeakerNote => "speaker-note",
            BlockKind::ColumnBreak => "column-break",
        }
    }
}

/// Horizontal placement of a chat bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAlignment {
    Left,
    Center,
    Right,
}

/// The atomic content unit produced by the parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,

    /// Plain text payload; raw inline markdown for text-bearing kinds.
    pub content: String,

    /// Table cells, header row first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_rows: Option<Vec<Vec<String>>>,

    /// Chat speaker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Chat bubble placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<ChatAlignment>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    /// Trailing `{key=value}` tag values.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,

    /// 0-based absolute line in the original document.
    pub source_line: usize,

    /// Absolute byte offset where the block starts.
    pub start_index: usize,

    /// Absolute byte offset where the block ends.
    pub end_index: usize,
}

impl Block {
    /// Create a block with no position information.
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            table_rows: None,
            role: None,
            alignment: None,
            metadata: Metadata::new(),
            attributes: Attributes::new(),
            source_line: 0,
            start_index: 0,
            end_index: 0,
        }
    }

    /// Set the absolute source position.
    pub fn at(mut self, source_line: usize, start_index: usize, end_index: usize) -> Self {
        self.source_line = source_line;
        self.start_index = start_index;
        self.end_index = end_index;
        self
    }

    /// Add a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Attach table rows.
    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.table_rows = Some(rows);
        self
    }

    /// Read a metadata entry as a string. Numbers and booleans are stringified.
    pub fn meta_str(&self, key: &str) -> Option<String> {
        meta_string(&self.metadata, key)
    }

    /// Nesting depth of a list item (0 for top level).
    pub fn list_level(&self) -> usize {
        self.metadata
            .get("level")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }
}

/// Read a metadata entry as a display string.
pub fn meta_string(meta: &Metadata, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read the first present key of several aliases (`background` / `bg`).
pub fn meta_string_any(meta: &Metadata, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| meta_string(meta, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_depth_collapses() {
        assert_eq!(BlockKind::heading(1), BlockKind::Heading1);
        assert_eq!(BlockKind::heading(2), BlockKind::Heading2);
        assert_eq!(BlockKind::heading(3), BlockKind::Heading3);
        assert_eq!(BlockKind::heading(6), BlockKind::Heading3);
    }

    #[test]
    fn test_block_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&BlockKind::Heading1).unwrap();
        assert_eq!(json, "\"heading-1\"");
        let json = serde_json::to_string(&BlockKind::CalloutTip).unwrap();
        assert_eq!(json, "\"callout-tip\"");
        assert_eq!(BlockKind::BulletItem.as_str(), "bullet-item");
    }

    #[test]
    fn test_block_serializes_camel_case() {
        let block = Block::new(BlockKind::Paragraph, "Hi").at(3, 10, 12);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "paragraph");
        assert_eq!(value["sourceLine"], 3);
        assert_eq!(value["startIndex"], 10);
        assert!(value.get("tableRows").is_none());
    }

    #[test]
    fn test_meta_string_stringifies_scalars() {
        let block = Block::new(BlockKind::Code, "")
            .with_meta("language", "rust")
            .with_meta("columns", 3)
            .with_meta("lineNumbers", true);
        assert_eq!(block.meta_str("language").as_deref(), Some("rust"));
        assert_eq!(block.meta_str("columns").as_deref(), Some("3"));
        assert_eq!(block.meta_str("lineNumbers").as_deref(), Some("true"));
        assert_eq!(block.meta_str("missing"), None);
    }
}
