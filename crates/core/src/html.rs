//! HTML preview renderer.
//!
//! Renders a [`Presentation`] as a self-contained HTML document with one
//! `<section>` per slide, using the same regions, list grouping and mesh
//! geometry as the PPTX export.

use crate::chart::{self, ChartType};
use crate::grouping::{group_blocks, RenderUnit};
use crate::inline::{parse_inline, InlineStyle};
use crate::mesh::MeshGenerator;
use crate::som::{Background, BackgroundKind, Presentation, Region, RegionKind, SlideObject};
use crate::theme::Theme;
use crate::types::{Block, BlockKind, ChatAlignment};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write as _;

/// Preview slide size in CSS pixels.
const SLIDE_WIDTH: f64 = 960.0;
const SLIDE_HEIGHT: f64 = 540.0;

/// Options for HTML rendering
#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// Render speaker notes under each slide
    pub show_notes: bool,
    /// Document title; defaults to the deck's own title
    pub title: Option<String>,
    /// Extra CSS appended after the built-in stylesheet
    pub custom_css: Option<String>,
}

impl HtmlOptions {
    pub fn with_notes(mut self, show_notes: bool) -> Self {
        self.show_notes = show_notes;
        self
    }

    pub fn with_custom_css(mut self, css: String) -> Self {
        self.custom_css = Some(css);
        self
    }
}

/// Render a deck to a complete HTML document.
pub fn render_html(deck: &Presentation, theme: &Theme, options: &HtmlOptions) -> String {
    let titles: Vec<(String, String)> = deck
        .slides
        .iter()
        .filter_map(|s| s.title().map(|t| (s.id.clone(), t.to_string())))
        .collect();

    let mut body = String::new();
    for slide in &deck.slides {
        let background = deck.background_for(slide, theme);
        render_slide(&mut body, slide, &background, &titles);
        if options.show_notes {
            if let Some(notes) = &slide.notes {
                let _ = writeln!(body, "<aside class=\"notes\">{}</aside>", text(notes));
            }
        }
    }

    let title = options
        .title
        .clone()
        .or_else(|| deck.title())
        .unwrap_or_else(|| "Slides".to_string());
    wrap_in_document(&body, &title, theme, options)
}

fn wrap_in_document(body: &str, title: &str, theme: &Theme, options: &HtmlOptions) -> String {
    let base_css = include_str!("../css/preview.css");
    let custom_css = options.custom_css.as_deref().unwrap_or("");
    let variables = format!(
        ":root {{ --background: {}; --text: {}; --heading: {}; --accent: {}; --muted: {}; --font: \"{}\"; --heading-font: \"{}\"; --code-font: \"{}\"; }}",
        css_value(&theme.background),
        css_value(&theme.text_color),
        css_value(&theme.heading_color),
        css_value(&theme.accent_color),
        css_value(&theme.muted_color),
        css_value(&theme.font),
        css_value(&theme.heading_font),
        css_value(&theme.code_font),
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="generator" content="slidemark">
  <title>{title}</title>
  <style>
{variables}
{base_css}
{custom_css}
  </style>
</head>
<body>
{body}
</body>
</html>"#,
        title = text(title),
    )
}

/// Strip characters that could end a CSS declaration.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"'))
        .collect()
}

fn render_slide(
    out: &mut String,
    slide: &SlideObject,
    background: &Background,
    titles: &[(String, String)],
) {
    let mut style = String::new();
    let mut mesh_svg = None;
    match background.kind {
        BackgroundKind::Color => {
            if let Some(color) = &background.color {
                let _ = write!(style, "background: {};", css_value(color));
            }
        }
        BackgroundKind::Image => {
            if let Some(image) = &background.image {
                let _ = write!(
                    style,
                    "background-image: url('{}');",
                    css_value(image).replace('\'', "%27")
                );
            }
        }
        BackgroundKind::Mesh => {
            if let Some(config) = &background.mesh_config {
                let layout = MeshGenerator::new(config.clone()).generate(SLIDE_WIDTH, SLIDE_HEIGHT);
                let _ = write!(style, "background: {};", css_value(&layout.base));
                mesh_svg = Some(layout.to_svg(&slide.id));
            }
        }
    }
    if slide.layout == "grid" {
        let _ = write!(style, "--grid-columns: {};", slide.grid_columns());
    }

    let _ = writeln!(
        out,
        "<section class=\"slide layout-{}\" id=\"{}\" data-source-line=\"{}\" style=\"{}\">",
        attr(&slide.layout),
        attr(&slide.id),
        slide.source_line,
        attr(&style)
    );
    if let Some(svg) = mesh_svg {
        let _ = writeln!(out, "<div class=\"mesh\">{}</div>", svg);
    }

    let columns: Vec<&Region> = slide.columns();
    for region in &slide.regions {
        match region.kind {
            RegionKind::Column => continue,
            RegionKind::Header => out.push_str("<header class=\"region region-header\">\n"),
            _ => {
                let _ = writeln!(
                    out,
                    "<div class=\"region region-{}\">",
                    region_name(region.kind)
                );
            }
        }
        render_blocks(out, &region.blocks, titles);
        out.push_str(if region.kind == RegionKind::Header {
            "</header>\n"
        } else {
            "</div>\n"
        });
    }
    if !columns.is_empty() {
        out.push_str("<div class=\"columns\">\n");
        for column in columns {
            out.push_str("<div class=\"region region-column\">\n");
            render_blocks(out, &column.blocks, titles);
            out.push_str("</div>\n");
        }
        out.push_str("</div>\n");
    }
    out.push_str("</section>\n");
}

fn region_name(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Header => "header",
        RegionKind::Main => "main",
        RegionKind::Column => "column",
        RegionKind::Background => "background",
        RegionKind::Footer => "footer",
    }
}

fn render_blocks(out: &mut String, blocks: &[Block], titles: &[(String, String)]) {
    for unit in group_blocks(blocks) {
        let start = unit.list_start();
        match unit {
            RenderUnit::Single(block) => render_block(out, block, titles),
            RenderUnit::List { ordered, items } => render_list(out, ordered, start, &items),
        }
    }
}

/// Nested lists follow each item's `level`.
fn render_list(out: &mut String, ordered: bool, start: u64, items: &[&Block]) {
    let mut open: Vec<&'static str> = Vec::new();
    let tag = |ordered: bool| if ordered { "ol" } else { "ul" };

    let first = tag(ordered);
    if ordered && start != 1 {
        let _ = write!(out, "<ol start=\"{}\">", start);
    } else {
        let _ = write!(out, "<{}>", first);
    }
    open.push(first);

    for item in items {
        let level = item.list_level();
        while open.len() <= level {
            let nested = tag(item.kind == BlockKind::NumberedItem);
            let _ = write!(out, "<{}>", nested);
            open.push(nested);
        }
        while open.len() > level + 1 {
            if let Some(closed) = open.pop() {
                let _ = write!(out, "</{}>", closed);
            }
        }
        let _ = write!(out, "<li>{}</li>", inline_html(&item.content));
    }
    while let Some(closed) = open.pop() {
        let _ = write!(out, "</{}>", closed);
    }
    out.push('\n');
}

fn style_attr(block: &Block) -> String {
    let mut style = String::new();
    if let Some(color) = block.attributes.get("color") {
        let _ = write!(style, "color: {};", css_value(color));
    }
    if let Some(size) = block.attributes.get("size") {
        let _ = write!(style, "font-size: {}em;", css_value(size));
    }
    if let Some(align) = block.attributes.get("align") {
        let _ = write!(style, "text-align: {};", css_value(align));
    }
    if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", attr(&style))
    }
}

fn render_block(out: &mut String, block: &Block, titles: &[(String, String)]) {
    match block.kind {
        BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 => {
            let level = block.kind.heading_level().unwrap_or(1);
            let _ = writeln!(
                out,
                "<h{level}{}>{}</h{level}>",
                style_attr(block),
                inline_html(&block.content)
            );
        }
        BlockKind::Paragraph => {
            let _ = writeln!(
                out,
                "<p{}>{}</p>",
                style_attr(block),
                inline_html(&block.content).replace('\n', "<br>")
            );
        }
        BlockKind::Code => {
            let language = block.meta_str("language").unwrap_or_default();
            let numbered = block
                .metadata
                .get("lineNumbers")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let code = if numbered {
                block
                    .content
                    .lines()
                    .enumerate()
                    .map(|(i, l)| format!("{:>3}  {}", i + 1, l))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                block.content.clone()
            };
            let _ = writeln!(
                out,
                "<pre class=\"code{}\"><code class=\"language-{}\">{}</code></pre>",
                if numbered { " line-numbers" } else { "" },
                attr(&language),
                text(&code)
            );
        }
        BlockKind::Mermaid => {
            let _ = writeln!(out, "<pre class=\"mermaid\">{}</pre>", text(&block.content));
        }
        BlockKind::Quote => {
            let _ = writeln!(
                out,
                "<blockquote>{}</blockquote>",
                inline_html(&block.content).replace('\n', "<br>")
            );
        }
        BlockKind::CalloutTip | BlockKind::CalloutNote | BlockKind::CalloutWarning => {
            let _ = writeln!(
                out,
                "<div class=\"callout {}\">{}</div>",
                block.kind.as_str(),
                inline_html(&block.content).replace('\n', "<br>")
            );
        }
        BlockKind::Chat => {
            let alignment = match block.alignment.unwrap_or(ChatAlignment::Left) {
                ChatAlignment::Left => "left",
                ChatAlignment::Center => "center",
                ChatAlignment::Right => "right",
            };
            let _ = writeln!(
                out,
                "<div class=\"chat chat-{}\"><span class=\"chat-role\">{}</span><span class=\"chat-bubble\">{}</span></div>",
                alignment,
                text(block.role.as_deref().unwrap_or("")),
                inline_html(&block.content)
            );
        }
        BlockKind::Table => {
            out.push_str(&table_html(block.table_rows.as_deref().unwrap_or(&[])));
        }
        BlockKind::Image => {
            let src = block.meta_str("src").unwrap_or_default();
            let mut style = String::new();
            if let Some(width) = block.attributes.get("width") {
                let _ = write!(style, "width: {};", css_value(width));
            }
            let _ = writeln!(
                out,
                "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
                attr(&src),
                attr(&block.content),
                attr(&style)
            );
        }
        BlockKind::Chart => {
            let rows = block.table_rows.as_deref().unwrap_or(&[]);
            let chart_type =
                ChartType::from_subtype(&block.meta_str("chartType").unwrap_or_default());
            let data = chart::transform(rows);
            let json = serde_json::to_string(&data).unwrap_or_else(|_| "{}".to_string());
            let _ = writeln!(
                out,
                "<figure class=\"chart chart-{}\" data-chart=\"{}\">{}<figcaption>{} chart</figcaption></figure>",
                attr(&format!("{:?}", chart_type).to_lowercase()),
                attr(&json),
                table_html(rows),
                text(&format!("{:?}", chart_type))
            );
        }
        BlockKind::HorizontalRule => out.push_str("<hr>\n"),
        BlockKind::Toc => {
            out.push_str("<nav class=\"toc\"><ol>");
            for (id, title) in titles {
                let _ = write!(
                    out,
                    "<li><a href=\"#{}\">{}</a></li>",
                    attr(id),
                    inline_html(title)
                );
            }
            out.push_str("</ol></nav>\n");
        }
        BlockKind::BulletItem | BlockKind::NumberedItem => {
            render_list(out, block.kind == BlockKind::NumberedItem, 1, &[block]);
        }
        BlockKind::ColumnBreak | BlockKind::SpeakerNote | BlockKind::SlideSeparator => {}
    }
}

fn table_html(rows: &[Vec<String>]) -> String {
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    let mut out = String::from("<table><thead><tr>");
    for cell in header {
        let _ = write!(out, "<th>{}</th>", inline_html(cell));
    }
    out.push_str("</tr></thead><tbody>");
    for row in body {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", inline_html(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>\n");
    out
}

/// Inline segments as escaped HTML.
pub fn inline_html(content: &str) -> String {
    let mut out = String::new();
    for segment in parse_inline(content) {
        let body = text(&segment.content);
        match segment.style {
            InlineStyle::Text => out.push_str(&body),
            InlineStyle::Bold => {
                let _ = write!(out, "<strong>{}</strong>", body);
            }
            InlineStyle::Italic => {
                let _ = write!(out, "<em>{}</em>", body);
            }
            InlineStyle::Underline => {
                let _ = write!(out, "<u>{}</u>", body);
            }
            InlineStyle::Code => {
                let _ = write!(out, "<code>{}</code>", body);
            }
            InlineStyle::Link => {
                let url = segment.url.unwrap_or_default();
                let _ = write!(out, "<a href=\"{}\">{}</a>", attr(&url), body);
            }
            InlineStyle::Highlight => {
                let _ = write!(out, "<mark class=\"highlight\">{}</mark>", body);
            }
            InlineStyle::Badge => {
                let _ = write!(out, "<span class=\"badge\">{}</span>", body);
            }
            InlineStyle::Muted => {
                let _ = write!(out, "<span class=\"muted\">{}</span>", body);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str, options: &HtmlOptions) -> String {
        render_html(&Presentation::from_markdown(text), &Theme::default(), options)
    }

    #[test]
    fn test_one_section_per_slide() {
        let html = render("# A\n\n===\n\n# B\n\n===\n", &HtmlOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<section class=\"slide").count(), 3);
        assert!(html.contains("<title>A</title>"));
    }

    #[test]
    fn test_inline_and_escaping() {
        let html = inline_html("**a** <b> [[hot]] [x](http://e.test?a=1&b=2)");
        assert!(html.contains("<strong>a</strong>"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("<mark class=\"highlight\">hot</mark>"));
        assert!(html.contains("href=\"http://e.test?a=1&amp;b=2\""));
    }

    #[test]
    fn test_lists_are_grouped_and_nested() {
        let html = render("- a\n- b\n  - c\n\n3. x\n4. y\n", &HtmlOptions::default());
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(html.contains("<ol start=\"3\"><li>x</li><li>y</li></ol>"));
    }

    #[test]
    fn test_notes_only_when_requested() {
        let text = "# A\n\n<!-- note: secret -->\n";
        assert!(!render(text, &HtmlOptions::default()).contains("secret"));
        let html = render(text, &HtmlOptions::default().with_notes(true));
        assert!(html.contains("<aside class=\"notes\">secret</aside>"));
    }

    #[test]
    fn test_mesh_and_columns() {
        let text = "---\nbackground: mesh\nmesh:\n  seed: 3\n---\n# T\n\nL\n\n:: right ::\n\nR\n";
        let html = render(text, &HtmlOptions::default());
        assert!(html.contains("<div class=\"mesh\"><svg"));
        assert!(html.contains("<div class=\"columns\">"));
        assert_eq!(html.matches("region-column").count(), 2);
    }

    #[test]
    fn test_chart_and_toc() {
        let text = "# Intro\n\n[TOC]\n\n===\n\n# Data\n\n::: chart-pie\n| k | v |\n|---|---|\n| a | 1 |\n:::\n";
        let html = render(text, &HtmlOptions::default());
        assert!(html.contains("<figure class=\"chart chart-pie\""));
        assert!(html.contains("<a href=\"#slide-1\">Data</a>"));
    }

    #[test]
    fn test_custom_css_appended() {
        let options = HtmlOptions::default().with_custom_css(".x { color: red; }".to_string());
        assert!(render("# A", &options).contains(".x { color: red; }"));
    }
}
