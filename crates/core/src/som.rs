//! Slide Object Model.
//!
//! Groups the flat block stream into slides, assigns blocks to regions and
//! resolves layout and background. The model is derived: it is rebuilt from
//! the text on every change and never edited in place.

use crate::document::{self, ParsedDocument};
use crate::mesh::MeshConfig;
use crate::theme::Theme;
use crate::types::{meta_string, meta_string_any, Block, BlockKind, Metadata};
use serde::{Deserialize, Serialize};

/// Semantic region of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Header,
    Main,
    Column,
    Background,
    Footer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "type")]
    pub kind: RegionKind,
    pub blocks: Vec<Block>,
}

impl Region {
    fn new(kind: RegionKind, blocks: Vec<Block>) -> Self {
        Self { kind, blocks }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Color,
    Image,
    Mesh,
}

/// A resolved slide background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_config: Option<MeshConfig>,
}

impl Background {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::Color,
            color: Some(color.into()),
            image: None,
            mesh_config: None,
        }
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::Image,
            color: None,
            image: Some(src.into()),
            mesh_config: None,
        }
    }

    pub fn mesh(config: MeshConfig) -> Self {
        Self {
            kind: BackgroundKind::Mesh,
            color: None,
            image: None,
            mesh_config: Some(config),
        }
    }

    /// Classify a `background` value: `mesh*`, an image reference, or a colour.
    ///
    /// `meta` supplies the `mesh` key for mesh backgrounds.
    pub fn classify(value: &str, meta: &Metadata, default_seed: u32) -> Self {
        let value = value.trim();
        if value.to_ascii_lowercase().starts_with("mesh") {
            Self::mesh(MeshConfig::from_meta(meta, default_seed))
        } else if let Some(src) = image_reference(value) {
            Self::image(src)
        } else {
            Self::color(value)
        }
    }
}

/// The image source if `value` looks like an image rather than a colour.
fn image_reference(value: &str) -> Option<String> {
    if let Some(inner) = value.strip_prefix("url(").and_then(|v| v.strip_suffix(')')) {
        return Some(inner.trim().trim_matches(|c| c == '"' || c == '\'').to_string());
    }
    let lower = value.to_ascii_lowercase();
    let is_url = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:image/");
    let is_file = [".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".bmp"]
        .iter()
        .any(|ext| lower.ends_with(ext));
    (is_url || is_file).then(|| value.to_string())
}

/// One slide of the object model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideObject {
    pub id: String,
    pub index: usize,
    pub layout: String,
    /// The slide's separator metadata.
    pub config: Metadata,
    pub regions: Vec<Region>,
    /// Explicit slide background; `None` defers to the document or theme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub source_line: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl SlideObject {
    /// All content blocks in region order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.regions.iter().flat_map(|r| r.blocks.iter())
    }

    pub fn region(&self, kind: RegionKind) -> Option<&Region> {
        self.regions.iter().find(|r| r.kind == kind)
    }

    pub fn columns(&self) -> Vec<&Region> {
        self.regions
            .iter()
            .filter(|r| r.kind == RegionKind::Column)
            .collect()
    }

    /// Text of the first heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.blocks()
            .find(|b| b.kind.is_heading())
            .map(|b| b.content.as_str())
    }

    /// Grid column count from config (`columns`), default 2.
    pub fn grid_columns(&self) -> usize {
        meta_string(&self.config, "columns")
            .and_then(|c| c.trim().parse::<usize>().ok())
            .filter(|&c| c > 0)
            .unwrap_or(2)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks().next().is_none()
    }
}

/// Build slide objects from a flat block stream.
///
/// Slides start at each `SlideSeparator`. Blocks before the first separator
/// (a stream not produced by the document parser) form an implicit slide.
pub fn build_som(blocks: &[Block]) -> Vec<SlideObject> {
    let mut groups: Vec<(Option<&Block>, Vec<Block>)> = Vec::new();
    for block in blocks {
        if block.kind == BlockKind::SlideSeparator {
            groups.push((Some(block), Vec::new()));
            continue;
        }
        match groups.last_mut() {
            Some((_, content)) => content.push(block.clone()),
            None => groups.push((None, vec![block.clone()])),
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(index, (separator, content))| build_slide(index, separator, content))
        .collect()
}

fn build_slide(index: usize, separator: Option<&Block>, content: Vec<Block>) -> SlideObject {
    let config = separator.map(|s| s.metadata.clone()).unwrap_or_default();
    let layout = meta_string(&config, "layout")
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "default".to_string());

    let (source_line, start_index, end_index) = match separator {
        Some(sep) => (sep.source_line, sep.start_index, sep.end_index),
        None => (
            content.first().map_or(0, |b| b.source_line),
            content.first().map_or(0, |b| b.start_index),
            content.last().map_or(0, |b| b.end_index),
        ),
    };

    let background = slide_background(&config, index);
    let notes = meta_string(&config, "note").filter(|n| !n.trim().is_empty());

    SlideObject {
        id: format!("slide-{}", index),
        index,
        layout,
        regions: assign_regions(content),
        config,
        background,
        notes,
        source_line,
        start_index,
        end_index,
    }
}

/// Leading H1/H2 blocks form the header; a column break splits the rest
/// into two columns, otherwise it is one main region.
fn assign_regions(content: Vec<Block>) -> Vec<Region> {
    let header_len = content
        .iter()
        .take_while(|b| matches!(b.kind, BlockKind::Heading1 | BlockKind::Heading2))
        .count();
    let mut rest = content;
    let body = rest.split_off(header_len);
    let header = rest;

    let mut regions = Vec::new();
    if !header.is_empty() {
        regions.push(Region::new(RegionKind::Header, header));
    }

    match body.iter().position(|b| b.kind == BlockKind::ColumnBreak) {
        Some(split) => {
            let mut left = body;
            let right: Vec<Block> = left.split_off(split).into_iter().skip(1).collect();
            regions.push(Region::new(RegionKind::Column, left));
            regions.push(Region::new(RegionKind::Column, right));
        }
        None => regions.push(Region::new(RegionKind::Main, body)),
    }
    regions
}

/// `bgImage` beats `background`/`bg`; neither means no explicit background.
fn slide_background(config: &Metadata, index: usize) -> Option<Background> {
    if let Some(image) = meta_string(config, "bgImage").filter(|s| !s.trim().is_empty()) {
        return Some(Background::image(image.trim()));
    }
    let value = meta_string_any(config, &["background", "bg"])?;
    if value.trim().is_empty() {
        return None;
    }
    Some(Background::classify(&value, config, index as u32 + 1))
}

/// A parsed deck: document metadata plus its slides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub meta: Metadata,
    pub slides: Vec<SlideObject>,
}

impl Presentation {
    pub fn from_document(doc: &ParsedDocument) -> Self {
        Self {
            meta: doc.meta.clone(),
            slides: build_som(&doc.blocks),
        }
    }

    /// Parse markdown straight into slides.
    pub fn from_markdown(text: &str) -> Self {
        Self::from_document(&document::parse(text))
    }

    pub fn title(&self) -> Option<String> {
        meta_string(&self.meta, "title")
            .or_else(|| self.slides.iter().find_map(|s| s.title().map(str::to_string)))
    }

    pub fn author(&self) -> Option<String> {
        meta_string(&self.meta, "author")
    }

    /// The theme id named by the document, if any.
    pub fn theme_id(&self) -> Option<String> {
        meta_string(&self.meta, "theme")
    }

    /// Effective background: the slide's own, then the document's, then the theme's.
    pub fn background_for(&self, slide: &SlideObject, theme: &Theme) -> Background {
        if let Some(background) = &slide.background {
            return with_theme_mesh(background.clone(), theme);
        }
        let seed = slide.index as u32 + 1;
        if let Some(image) = meta_string(&self.meta, "bgImage").filter(|s| !s.trim().is_empty()) {
            return Background::image(image.trim());
        }
        if let Some(value) = meta_string_any(&self.meta, &["background", "bg"]) {
            if !value.trim().is_empty() {
                return with_theme_mesh(Background::classify(&value, &self.meta, seed), theme);
            }
        }
        with_theme_mesh(Background::classify(&theme.background, &Metadata::new(), seed), theme)
    }
}

fn with_theme_mesh(mut background: Background, theme: &Theme) -> Background {
    if let Some(config) = &background.mesh_config {
        background.mesh_config = Some(config.with_fallback_colors(&theme.mesh_colors));
    }
    background
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slides(text: &str) -> Vec<SlideObject> {
        Presentation::from_markdown(text).slides
    }

    #[test]
    fn test_header_and_main_regions() {
        let s = slides("# Title\n## Sub\n\nBody\n\n# Late heading\n");
        assert_eq!(s.len(), 1);
        let header = s[0].region(RegionKind::Header).unwrap();
        assert_eq!(header.blocks.len(), 2);
        let main = s[0].region(RegionKind::Main).unwrap();
        assert_eq!(main.blocks.len(), 2);
        assert_eq!(s[0].layout, "default");
        assert_eq!(s[0].id, "slide-0");
    }

    #[test]
    fn test_column_break_makes_two_columns() {
        let s = slides("---\nlayout: two-column\n---\n# Compare\n\nLeft\n\n:: right ::\n\nRight\n");
        let columns = s[0].columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].blocks[0].content, "Left");
        assert_eq!(columns[1].blocks[0].content, "Right");
        assert!(s[0].region(RegionKind::Main).is_none());
        assert_eq!(s[0].layout, "two-column");
    }

    #[test]
    fn test_background_precedence() {
        let text = "# A\n\n===\n\n---\nbg: red\nbgImage: hero.png\n---\n# B\n\n===\n\n---\nbackground: \"#222\"\n---\n# C\n";
        let s = slides(text);
        assert!(s[0].background.is_none());
        assert_eq!(s[1].background, Some(Background::image("hero.png")));
        assert_eq!(s[2].background, Some(Background::color("#222")));
    }

    #[test]
    fn test_mesh_background() {
        let text = "---\nbackground: mesh\nmesh:\n  colors: [\"#000\", \"#f0f\"]\n  seed: 12\n---\n# Mesh\n";
        let s = slides(text);
        let bg = s[0].background.clone().unwrap();
        assert_eq!(bg.kind, BackgroundKind::Mesh);
        let mesh = bg.mesh_config.unwrap();
        assert_eq!(mesh.seed, 12);
        assert_eq!(mesh.colors, vec!["#000", "#f0f"]);
    }

    #[test]
    fn test_classify_values() {
        let meta = Metadata::new();
        assert_eq!(Background::classify("mesh-ocean", &meta, 1).kind, BackgroundKind::Mesh);
        assert_eq!(
            Background::classify("url('a.jpg')", &meta, 1),
            Background::image("a.jpg")
        );
        assert_eq!(
            Background::classify("https://x.test/bg", &meta, 1).kind,
            BackgroundKind::Image
        );
        assert_eq!(Background::classify("#fff", &meta, 1), Background::color("#fff"));
    }

    #[test]
    fn test_background_fallback_chain() {
        let deck = Presentation::from_markdown(
            "---\nbackground: navy\n---\n# A\n\n===\n\n---\nbg: red\n---\nB\n",
        );
        let theme = Theme::default();
        // Slide 0 carries the global key through its merged config.
        assert_eq!(deck.background_for(&deck.slides[0], &theme), Background::color("navy"));
        assert_eq!(deck.background_for(&deck.slides[1], &theme), Background::color("red"));

        let plain = Presentation::from_markdown("# A\n");
        let dark = Theme::resolve("aurora");
        let bg = plain.background_for(&plain.slides[0], &dark);
        assert_eq!(bg.kind, BackgroundKind::Mesh);
        assert_eq!(bg.mesh_config.unwrap().colors, dark.mesh_colors);
    }

    #[test]
    fn test_slide_span_excludes_separator() {
        let text = "# A\n\n===\n\n---\nlayout: impact\n---\n# B\n";
        let s = slides(text);
        assert_eq!(&text[s[0].start_index..s[0].end_index], "# A");
        assert_eq!(
            &text[s[1].start_index..s[1].end_index],
            "---\nlayout: impact\n---\n# B"
        );
        assert_eq!(s[1].layout, "impact");
    }

    #[test]
    fn test_empty_slide_is_kept() {
        let s = slides("A\n\n===\n===\n\nB\n");
        assert_eq!(s.len(), 3);
        assert!(s[1].is_empty());
    }

    #[test]
    fn test_notes_and_grid_columns() {
        let s = slides("---\nlayout: grid\ncolumns: 3\n---\n- a\n\n<!-- note: remember -->\n");
        assert_eq!(s[0].notes.as_deref(), Some("remember"));
        assert_eq!(s[0].grid_columns(), 3);
    }

    #[test]
    fn test_blocks_without_separator_form_one_slide() {
        let blocks = crate::blocks::parse_blocks("# A\n\nText\n", 0, 0);
        let s = build_som(&blocks);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].title(), Some("A"));
        assert!(s[0].end_index >= 9);
    }
}
